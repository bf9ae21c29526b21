// document constants
pub const DOC_ID: &str = "_id";

// entity constants
pub const ENTITY_ID: &str = "id";

// directive constants
pub const DIRECTIVE_SUFFIX: char = '$';
pub const OPERATOR_PREFIX: char = '$';

pub const ID_DIRECTIVE: &str = "id$";
pub const MERGE_DIRECTIVE: &str = "merge$";
pub const NATIVE_DIRECTIVE: &str = "native$";
pub const SORT_DIRECTIVE: &str = "sort$";
pub const LIMIT_DIRECTIVE: &str = "limit$";
pub const SKIP_DIRECTIVE: &str = "skip$";
pub const FIELDS_DIRECTIVE: &str = "fields$";
pub const UPSERT_DIRECTIVE: &str = "upsert$";
pub const LOAD_DIRECTIVE: &str = "load$";
pub const ALL_DIRECTIVE: &str = "all$";

// operator constants
pub const IN_OPERATOR: &str = "$in";
pub const SET_OPERATOR: &str = "$set";
pub const SET_ON_INSERT_OPERATOR: &str = "$setOnInsert";

// id constants
pub const OBJECT_ID_HEX_LEN: usize = 24;
pub const OBJECT_ID_BYTE_LEN: usize = 12;
