use crate::collection::{Collection, CollectionProvider};
use crate::common::DOC_ID;
use crate::config::StoreConfig;
use crate::document::Document;
use crate::entity::{to_entity, Entity};
use crate::errors::StoreResult;
use crate::filter::normalize_filter;
use crate::options::normalize_options;
use crate::query::Query;
use crate::write;
use std::sync::Arc;

/// The entity store facade.
///
/// Wraps a [CollectionProvider] and a [StoreConfig] and exposes the four
/// entity operations (save, load, list, remove), translating abstract
/// entities and queries into collection calls.
///
/// The handle is cheap to clone; all clones share the same provider and
/// configuration.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use docstore::{DocumentStore, Entity, MemoryProvider, Query};
///
/// let store = DocumentStore::new(Arc::new(MemoryProvider::new()));
/// let saved = store.save(&Entity::new("user").set("email", "a@b.c"))?;
/// let loaded = store.load(&saved, &Query::id(saved.id().unwrap()))?;
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<DocumentStoreInner>,
}

struct DocumentStoreInner {
    provider: Arc<dyn CollectionProvider>,
    config: StoreConfig,
}

impl DocumentStore {
    /// Creates a store over the provider with the default configuration.
    pub fn new(provider: Arc<dyn CollectionProvider>) -> DocumentStore {
        DocumentStore::with_config(provider, StoreConfig::new())
    }

    /// Creates a store over the provider with an explicit configuration.
    pub fn with_config(provider: Arc<dyn CollectionProvider>, config: StoreConfig) -> DocumentStore {
        DocumentStore {
            inner: Arc::new(DocumentStoreInner { provider, config }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    fn collection_for(&self, entity: &Entity) -> StoreResult<Arc<dyn Collection>> {
        self.inner.provider.collection(&entity.collection_name())
    }

    /// Persists an entity, selecting create, update, or upsert-by-key from
    /// the entity's id and directives. Returns the stored entity, which
    /// always carries a portable id.
    pub fn save(&self, entity: &Entity) -> StoreResult<Entity> {
        let collection = self.collection_for(entity)?;
        let config = &self.inner.config;

        match write::select_strategy(entity) {
            write::WriteStrategy::Create => {
                log::debug!("save/create: {}", entity.collection_name());
                write::create(collection.as_ref(), entity, config)
            }
            write::WriteStrategy::Update => {
                log::debug!("save/update: {}", entity.collection_name());
                write::update(collection.as_ref(), entity, config)
            }
            write::WriteStrategy::UpsertByKey(fields) => {
                log::debug!(
                    "save/upsert: {} by {:?}",
                    entity.collection_name(),
                    fields
                );
                write::upsert_by_key(collection.as_ref(), entity, config, &fields)
            }
        }
    }

    /// Loads the first entity matching the query. No match is `Ok(None)`,
    /// never an error.
    pub fn load(&self, template: &Entity, query: &Query) -> StoreResult<Option<Entity>> {
        let collection = self.collection_for(template)?;
        let filter = normalize_filter(query, &self.inner.config);
        let options = normalize_options(query);

        let raw = collection.find_one(&filter, &options)?;
        Ok(to_entity(raw, template))
    }

    /// Lists every entity matching the query, honoring its sort,
    /// pagination, and projection directives.
    pub fn list(&self, template: &Entity, query: &Query) -> StoreResult<Vec<Entity>> {
        let collection = self.collection_for(template)?;
        let filter = normalize_filter(query, &self.inner.config);
        let options = normalize_options(query);

        let raw = collection.find_many(&filter, &options)?;
        Ok(raw
            .into_iter()
            .filter_map(|doc| to_entity(Some(doc), template))
            .collect())
    }

    /// Removes entities matching the query.
    ///
    /// With the `all$` directive every match is deleted and nothing is
    /// returned. Otherwise exactly the first match is deleted, and the
    /// removed entity is returned unless the `load$` directive was set to
    /// false. No match is `Ok(None)`.
    pub fn remove(&self, template: &Entity, query: &Query) -> StoreResult<Option<Entity>> {
        let collection = self.collection_for(template)?;
        let filter = normalize_filter(query, &self.inner.config);

        if query.remove_all() {
            log::debug!("remove/all: {}", template.collection_name());
            collection.delete_many(&filter)?;
            return Ok(None);
        }

        let options = normalize_options(query);
        let Some(target) = collection.find_one(&filter, &options)? else {
            return Ok(None);
        };

        // delete precisely the found document, not the first filter match,
        // so a sorted remove takes the right victim
        let mut by_id = Document::new();
        by_id.put(DOC_ID, target.get(DOC_ID));
        collection.delete_one(&by_id)?;

        if query.remove_load() {
            Ok(to_entity(Some(target), template))
        } else {
            Ok(None)
        }
    }
}
