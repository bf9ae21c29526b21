use crate::document::Document;
use crate::errors::StoreResult;
use crate::options::FindOptions;
use std::sync::Arc;

/// The storage boundary this translation layer writes through.
///
/// A `Collection` is an opaque, externally-synchronized handle to one named
/// document collection. Implementations serialize conflicting writes
/// themselves; the only concurrency hazard handled above this trait is the
/// duplicate-insert race in upsert-by-key, which the write reconciler
/// resolves with a bounded retry.
///
/// Errors cross this boundary unmodified. A uniqueness violation on insert
/// must surface as [`crate::errors::ErrorKind::DuplicateKey`] so the
/// reconciler can recognize the retryable conflict class.
pub trait Collection: Send + Sync {
    /// Finds the first document matching the filter, honoring the options.
    /// No match is `Ok(None)`, never an error.
    fn find_one(&self, filter: &Document, options: &FindOptions) -> StoreResult<Option<Document>>;

    /// Finds every document matching the filter, honoring the options.
    fn find_many(&self, filter: &Document, options: &FindOptions) -> StoreResult<Vec<Document>>;

    /// Inserts a document, assigning a native `_id` if the document does
    /// not carry one. Returns the stored document including its `_id`.
    fn insert(&self, document: Document) -> StoreResult<Document>;

    /// Applies a partial field-set to the first matching document,
    /// preserving fields absent from `changes`. With `upsert` a missing
    /// target is created instead.
    fn update_merge(&self, filter: &Document, changes: &Document, upsert: bool) -> StoreResult<()>;

    /// Replaces the first matching document wholesale (identity excepted).
    /// With `upsert` a missing target is created instead.
    fn update_replace(&self, filter: &Document, document: &Document, upsert: bool)
        -> StoreResult<()>;

    /// Atomically updates the first matching document with an update
    /// specification (`$set`, and `$setOnInsert` applied only when the
    /// upsert inserts) and returns the post-operation document directly,
    /// avoiding a separate read-back round trip.
    fn find_one_and_update(
        &self,
        filter: &Document,
        spec: &Document,
        upsert: bool,
    ) -> StoreResult<Option<Document>>;

    /// Deletes the first matching document. No match is a no-op.
    fn delete_one(&self, filter: &Document) -> StoreResult<()>;

    /// Deletes every matching document. No match is a no-op.
    fn delete_many(&self, filter: &Document) -> StoreResult<()>;
}

/// Resolves collection handles by canonical name.
pub trait CollectionProvider: Send + Sync {
    /// Returns the collection with the given canonical name, creating it
    /// if the backend supports that.
    fn collection(&self, name: &str) -> StoreResult<Arc<dyn Collection>>;
}
