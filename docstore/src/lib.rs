//! # Docstore - Entity-to-Document Translation Layer
//!
//! Docstore maps an abstract entity model onto a document database's
//! filter language, find options, and write operations. Entities carry a
//! portable string id; documents carry a database-native `_id`. The layer
//! converts between the two shapes at every boundary, normalizes abstract
//! queries into filter documents, and reconciles saves into create,
//! update, or race-tolerant upsert-by-key writes.
//!
//! ## Key Features
//!
//! - **Query normalization**: bare id shortcuts, literal terms, reserved
//!   `$`-suffixed directives, and a raw-native escape hatch, all folded
//!   into a filter document plus [`options::FindOptions`]
//! - **Identifier codec**: portable 24-hex-character id strings convert to
//!   native ids losslessly, everything else passes through untouched
//! - **Write reconciliation**: id-driven strategy selection with a bounded
//!   duplicate-key retry for concurrent upserts
//! - **Pluggable backends**: the [`collection::Collection`] trait is the
//!   storage boundary, with an in-memory implementation included
//! - **Clean API**: PIMPL pattern provides a stable, cheaply-cloneable
//!   store handle
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use docstore::entity::Entity;
//! use docstore::memory::MemoryProvider;
//! use docstore::query::Query;
//! use docstore::store::DocumentStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = DocumentStore::new(Arc::new(MemoryProvider::new()));
//!
//! // Create: no id yet, so save inserts and assigns one
//! let saved = store.save(&Entity::new("user").set("email", "alice@example.com"))?;
//! let id = saved.id().ok_or("missing id")?.to_string();
//!
//! // Load back by the bare id shortcut
//! let loaded = store.load(&Entity::new("user"), &Query::id(id))?;
//! assert!(loaded.is_some());
//!
//! // Query by terms with directives
//! let listed = store.list(
//!     &Entity::new("user"),
//!     &Query::new().term("email", "alice@example.com").limit(10),
//! )?;
//! assert_eq!(listed.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - The storage boundary traits
//! - [`common`] - Values, constants, and shared utilities
//! - [`config`] - Store configuration
//! - [`document`] - The document type and construction macros
//! - [`entity`] - The abstract entity and its materializer
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Query-to-filter normalization
//! - [`memory`] - In-memory backend
//! - [`object_id`] - The portable/native identifier codec
//! - [`options`] - Find options and their normalization
//! - [`query`] - The abstract query model
//! - [`store`] - The entity store facade

pub mod collection;
pub mod common;
pub mod config;
pub mod document;
pub mod entity;
pub mod errors;
pub mod filter;
pub mod memory;
pub mod object_id;
pub mod options;
pub mod query;
pub mod store;
pub(crate) mod write;

pub use collection::{Collection, CollectionProvider};
pub use common::{SortOrder, Value};
pub use config::StoreConfig;
pub use document::Document;
pub use entity::Entity;
pub use errors::{ErrorKind, StoreError, StoreResult};
pub use memory::{MemoryCollection, MemoryProvider};
pub use object_id::ObjectId;
pub use options::FindOptions;
pub use query::Query;
pub use store::DocumentStore;
