use crate::collection::{Collection, CollectionProvider};
use crate::common::{
    atomic, Atomic, SortOrder, Value, DOC_ID, IN_OPERATOR, SET_ON_INSERT_OPERATOR, SET_OPERATOR,
};
use crate::document::Document;
use crate::errors::{ErrorKind, StoreError, StoreResult};
use crate::object_id::{to_portable, ObjectId};
use crate::options::FindOptions;
use crate::query::is_operator_key;
use dashmap::DashMap;
use im::OrdMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// An in-memory [Collection] backend.
///
/// Documents are kept in a persistent ordered map keyed by the portable
/// form of their `_id`. Filter evaluation supports field equality, `$in`
/// membership clauses, and native id matching: the complete output
/// surface of the filter normalizer.
///
/// A unique index can be declared over a field set; inserts violating it
/// fail with [`ErrorKind::DuplicateKey`], the conflict class the write
/// reconciler retries. For exercising that retry, the collection can also
/// be told to fail its next upsert-insert attempts with a synthetic
/// duplicate-key error, simulating the window where a concurrent upsert
/// won the insert race.
#[derive(Clone)]
pub struct MemoryCollection {
    inner: Arc<MemoryCollectionInner>,
}

struct MemoryCollectionInner {
    documents: Atomic<OrdMap<String, Document>>,
    unique_fields: Option<Vec<String>>,
    forced_duplicate_failures: AtomicU32,
}

impl MemoryCollection {
    /// Creates an empty collection with no uniqueness constraints.
    pub fn new() -> MemoryCollection {
        MemoryCollection {
            inner: Arc::new(MemoryCollectionInner {
                documents: atomic(OrdMap::new()),
                unique_fields: None,
                forced_duplicate_failures: AtomicU32::new(0),
            }),
        }
    }

    /// Creates an empty collection with a unique index over the given
    /// fields.
    pub fn with_unique_index<I, T>(fields: I) -> MemoryCollection
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        MemoryCollection {
            inner: Arc::new(MemoryCollectionInner {
                documents: atomic(OrdMap::new()),
                unique_fields: Some(fields.into_iter().map(Into::into).collect()),
                forced_duplicate_failures: AtomicU32::new(0),
            }),
        }
    }

    /// Forces the next `count` upsert insert attempts to fail with a
    /// duplicate-key error, simulating a lost insert race.
    pub fn fail_upsert_inserts(&self, count: u32) {
        self.inner
            .forced_duplicate_failures
            .store(count, Ordering::SeqCst);
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.inner.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching_docs(&self, filter: &Document, options: &FindOptions) -> Vec<Document> {
        let documents = self.inner.documents.read();
        let matched: Vec<Document> = documents
            .values()
            .filter(|doc| matches(filter, doc))
            .cloned()
            .collect();
        apply_options(matched, options)
    }

    fn insert_locked(
        &self,
        documents: &mut OrdMap<String, Document>,
        mut document: Document,
    ) -> StoreResult<Document> {
        if document.get(DOC_ID).is_null() {
            document.put(DOC_ID, ObjectId::new());
        }
        let key = to_portable(&document.get(DOC_ID));

        if documents.contains_key(&key) {
            return Err(StoreError::new(
                &format!("duplicate key: _id {}", key),
                ErrorKind::DuplicateKey,
            ));
        }

        if let Some(unique_fields) = &self.inner.unique_fields {
            for existing in documents.values() {
                let collides = unique_fields
                    .iter()
                    .all(|field| existing.get(field) == document.get(field));
                if collides {
                    return Err(StoreError::new(
                        &format!("duplicate key: unique index on {:?}", unique_fields),
                        ErrorKind::DuplicateKey,
                    ));
                }
            }
        }

        *documents = documents.update(key, document.clone());
        Ok(document)
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        MemoryCollection::new()
    }
}

impl Collection for MemoryCollection {
    fn find_one(&self, filter: &Document, options: &FindOptions) -> StoreResult<Option<Document>> {
        Ok(self.matching_docs(filter, options).into_iter().next())
    }

    fn find_many(&self, filter: &Document, options: &FindOptions) -> StoreResult<Vec<Document>> {
        Ok(self.matching_docs(filter, options))
    }

    fn insert(&self, document: Document) -> StoreResult<Document> {
        let mut documents = self.inner.documents.write();
        self.insert_locked(&mut documents, document)
    }

    fn update_merge(&self, filter: &Document, changes: &Document, upsert: bool) -> StoreResult<()> {
        let mut documents = self.inner.documents.write();

        if let Some((key, existing)) = first_match(&documents, filter) {
            let mut updated = existing;
            updated.merge(changes);
            *documents = documents.update(key, updated);
            return Ok(());
        }

        if upsert {
            let mut fresh = seed_from_filter(filter);
            fresh.merge(changes);
            self.insert_locked(&mut documents, fresh)?;
        }
        Ok(())
    }

    fn update_replace(
        &self,
        filter: &Document,
        document: &Document,
        upsert: bool,
    ) -> StoreResult<()> {
        let mut documents = self.inner.documents.write();

        if let Some((key, existing)) = first_match(&documents, filter) {
            let mut replacement = document.clone();
            replacement.remove(DOC_ID);
            if let Some(id) = existing.id() {
                replacement.put(DOC_ID, *id);
            } else {
                replacement.put(DOC_ID, existing.get(DOC_ID));
            }
            *documents = documents.update(key, replacement);
            return Ok(());
        }

        if upsert {
            let mut fresh = seed_from_filter(filter);
            fresh.merge(document);
            self.insert_locked(&mut documents, fresh)?;
        }
        Ok(())
    }

    fn find_one_and_update(
        &self,
        filter: &Document,
        spec: &Document,
        upsert: bool,
    ) -> StoreResult<Option<Document>> {
        let set_doc = spec.get(SET_OPERATOR);
        let set_doc = set_doc.as_document().cloned().unwrap_or_default();
        let set_on_insert = spec.get(SET_ON_INSERT_OPERATOR);

        let mut documents = self.inner.documents.write();

        if let Some((key, existing)) = first_match(&documents, filter) {
            let mut updated = existing;
            updated.merge(&set_doc);
            *documents = documents.update(key, updated.clone());
            return Ok(Some(updated));
        }

        if !upsert {
            return Ok(None);
        }

        // simulated lost insert race
        let forced = &self.inner.forced_duplicate_failures;
        if forced.load(Ordering::SeqCst) > 0 {
            forced.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::new(
                "duplicate key: concurrent upsert inserted first",
                ErrorKind::DuplicateKey,
            ));
        }

        let mut fresh = seed_from_filter(filter);
        fresh.merge(&set_doc);
        if let Value::Document(on_insert) = set_on_insert {
            // $setOnInsert may carry _id, which merge refuses; set directly
            for (key, value) in on_insert.iter() {
                fresh.put(key.clone(), value.clone());
            }
        }
        let inserted = self.insert_locked(&mut documents, fresh)?;
        Ok(Some(inserted))
    }

    fn delete_one(&self, filter: &Document) -> StoreResult<()> {
        let mut documents = self.inner.documents.write();
        if let Some((key, _)) = first_match(&documents, filter) {
            *documents = documents.without(&key);
        }
        Ok(())
    }

    fn delete_many(&self, filter: &Document) -> StoreResult<()> {
        let mut documents = self.inner.documents.write();
        let keys: Vec<String> = documents
            .iter()
            .filter(|(_, doc)| matches(filter, doc))
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            *documents = documents.without(&key);
        }
        Ok(())
    }
}

fn first_match(documents: &OrdMap<String, Document>, filter: &Document) -> Option<(String, Document)> {
    documents
        .iter()
        .find(|(_, doc)| matches(filter, doc))
        .map(|(key, doc)| (key.clone(), doc.clone()))
}

/// Evaluates a normalized filter against a document: field equality and
/// `$in` membership. Unsupported top-level operator clauses are ignored.
fn matches(filter: &Document, document: &Document) -> bool {
    for (key, expected) in filter.iter() {
        if is_operator_key(key) {
            log::debug!("memory backend ignores top-level operator: {}", key);
            continue;
        }

        let actual = document.get(key);
        if let Some(clause) = expected.as_document() {
            if let Value::Array(members) = clause.get(IN_OPERATOR) {
                if !members.iter().any(|member| *member == actual) {
                    return false;
                }
                continue;
            }
        }
        if actual != *expected {
            return false;
        }
    }
    true
}

/// Seeds an upserted document from the equality terms of its match filter,
/// the way the target database derives the inserted document.
fn seed_from_filter(filter: &Document) -> Document {
    let mut seed = Document::new();
    for (key, value) in filter.iter() {
        if is_operator_key(key) || value.as_document().is_some() {
            continue;
        }
        seed.put(key.clone(), value.clone());
    }
    seed
}

fn apply_options(mut documents: Vec<Document>, options: &FindOptions) -> Vec<Document> {
    if let Some((field, order)) = options.sort_spec() {
        documents.sort_by(|a, b| {
            let ordering = a.get(field).cmp(&b.get(field));
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
    }

    if let Some(skip) = options.skip_value() {
        let skip = skip.max(0) as usize;
        documents = documents.into_iter().skip(skip).collect();
    }

    if let Some(limit) = options.limit_value() {
        documents.truncate(limit.max(0) as usize);
    }

    if let Some(fields) = options.projected_fields() {
        documents = documents
            .into_iter()
            .map(|doc| {
                let mut projected = Document::new();
                // identity always survives projection
                projected.put(DOC_ID, doc.get(DOC_ID));
                for field in fields {
                    if doc.contains_key(field) {
                        projected.put(field.clone(), doc.get(field));
                    }
                }
                projected
            })
            .collect();
    }

    documents
}

/// An in-memory [CollectionProvider] creating collections on demand.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    collections: Arc<DashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryProvider {
    pub fn new() -> MemoryProvider {
        MemoryProvider {
            collections: Arc::new(DashMap::new()),
        }
    }

    /// Pre-registers a configured collection (e.g. one carrying a unique
    /// index) under a canonical name.
    pub fn register(&self, name: impl Into<String>, collection: MemoryCollection) {
        self.collections.insert(name.into(), Arc::new(collection));
    }

    /// Returns the collection registered under the name, if any.
    pub fn get(&self, name: &str) -> Option<Arc<MemoryCollection>> {
        self.collections.get(name).map(|entry| entry.value().clone())
    }
}

impl CollectionProvider for MemoryProvider {
    fn collection(&self, name: &str) -> StoreResult<Arc<dyn Collection>> {
        let collection = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new()))
            .value()
            .clone();
        Ok(collection)
    }
}
