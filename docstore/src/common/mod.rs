pub mod constants;
pub mod sort_order;
pub mod util;
pub mod value;

pub use constants::*;
pub use sort_order::SortOrder;
pub use util::{atomic, Atomic};
pub use value::Value;
