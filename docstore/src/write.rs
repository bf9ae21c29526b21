use crate::collection::Collection;
use crate::common::{Value, DOC_ID, SET_ON_INSERT_OPERATOR, SET_OPERATOR};
use crate::config::StoreConfig;
use crate::document::Document;
use crate::entity::{to_entity, Entity};
use crate::errors::{ErrorKind, StoreError, StoreResult};
use crate::object_id::to_native;

/// Upper bound on upsert-by-key attempts when racing concurrent inserts.
///
/// Two concurrent upserts against the same missing key can both conclude
/// the document is absent and both try to insert; the loser gets a
/// duplicate-key error. Retrying re-runs the match, which now finds the
/// winner's document and updates it instead. One retry resolves a single
/// race; the bound covers repeated collisions without spinning forever.
pub(crate) const MAX_UPSERT_ATTEMPTS: u32 = 3;

/// How a save call is reconciled against the collection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WriteStrategy {
    /// No id, no usable upsert key: insert a new document.
    Create,
    /// The entity carries an id: update that document, inserting it if it
    /// vanished.
    Update,
    /// No id, but the designated key fields are all present: atomically
    /// update-or-insert by that key.
    UpsertByKey(Vec<String>),
}

/// Selects the write strategy for an entity.
///
/// An existing id always wins. Otherwise the upsert directive applies only
/// when every named field is present in the entity data; a directive whose
/// fields are missing (or an empty field list) silently degrades to a
/// plain create.
pub(crate) fn select_strategy(entity: &Entity) -> WriteStrategy {
    if entity.id().is_some() {
        return WriteStrategy::Update;
    }

    if let Some(fields) = entity.upsert_fields() {
        let usable = !fields.is_empty()
            && fields.iter().all(|field| entity.data().contains_key(field));
        if usable {
            return WriteStrategy::UpsertByKey(fields.clone());
        }
    }

    WriteStrategy::Create
}

/// Produces the native id a create or upsert should assign, if any.
///
/// The entity's explicit id directive has priority; the configured
/// generation hook is consulted next. Either result runs through the
/// identifier codec. `None` leaves id assignment to the database.
pub(crate) fn ensure_id(entity: &Entity, config: &StoreConfig) -> Option<Value> {
    if let Some(explicit) = entity.explicit_id() {
        return Some(to_native(explicit.clone()));
    }
    if let Some(generate) = &config.generate_id {
        if let Some(generated) = generate(entity) {
            return Some(to_native(Value::String(generated)));
        }
    }
    None
}

/// Resolves the merge-vs-replace semantics for one save: the entity's
/// override wins, otherwise the configured default applies.
pub(crate) fn should_merge(entity: &Entity, config: &StoreConfig) -> bool {
    entity.merge_override().unwrap_or(config.merge_on_update)
}

/// Inserts a new document for the entity and materializes the stored
/// result.
pub(crate) fn create(
    collection: &dyn Collection,
    entity: &Entity,
    config: &StoreConfig,
) -> StoreResult<Entity> {
    let mut document = entity.data().clone();
    document.remove(DOC_ID);
    if let Some(id) = ensure_id(entity, config) {
        document.put(DOC_ID, id);
    }

    let stored = collection.insert(document)?;
    to_entity(Some(stored), entity).ok_or_else(|| {
        StoreError::new(
            "insert returned no document to materialize",
            ErrorKind::BackendError,
        )
    })
}

/// Updates the document identified by the entity's id, inserting it if it
/// no longer exists, then reads the stored state back.
pub(crate) fn update(
    collection: &dyn Collection,
    entity: &Entity,
    config: &StoreConfig,
) -> StoreResult<Entity> {
    let id = entity.id().ok_or_else(|| {
        StoreError::new("update requires an entity id", ErrorKind::InvalidOperation)
    })?;

    let mut filter = Document::new();
    filter.put(DOC_ID, to_native(Value::from(id)));

    let mut document = entity.data().clone();
    document.remove(DOC_ID);

    if should_merge(entity, config) {
        collection.update_merge(&filter, &document, true)?;
    } else {
        collection.update_replace(&filter, &document, true)?;
    }

    let stored = collection.find_one(&filter, &Default::default())?;
    to_entity(stored, entity).ok_or_else(|| {
        StoreError::new(
            &format!("document vanished after update: id {}", id),
            ErrorKind::BackendError,
        )
    })
}

/// Atomically updates-or-inserts the document matching the entity's
/// designated key fields, retrying lost insert races.
///
/// The filter is field equality over the key fields; the update spec sets
/// the whole entity data and, when an id was produced, assigns it only on
/// the insert path so an existing document keeps its identity. Only
/// duplicate-key errors are retried; every other failure surfaces
/// immediately.
pub(crate) fn upsert_by_key(
    collection: &dyn Collection,
    entity: &Entity,
    config: &StoreConfig,
    key_fields: &[String],
) -> StoreResult<Entity> {
    let mut filter = Document::new();
    for field in key_fields {
        filter.put(field.clone(), entity.get(field));
    }

    let mut changes = entity.data().clone();
    changes.remove(DOC_ID);

    let mut spec = Document::new();
    spec.put(SET_OPERATOR, changes);
    if let Some(id) = ensure_id(entity, config) {
        let mut on_insert = Document::new();
        on_insert.put(DOC_ID, id);
        spec.put(SET_ON_INSERT_OPERATOR, on_insert);
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match collection.find_one_and_update(&filter, &spec, true) {
            Ok(stored) => {
                return to_entity(stored, entity).ok_or_else(|| {
                    StoreError::new(
                        "upsert returned no document to materialize",
                        ErrorKind::BackendError,
                    )
                });
            }
            Err(error) if error.is_duplicate_key() && attempt < MAX_UPSERT_ATTEMPTS => {
                log::debug!(
                    "upsert lost an insert race (attempt {}/{}), retrying",
                    attempt,
                    MAX_UPSERT_ATTEMPTS
                );
            }
            Err(error) => return Err(error),
        }
    }
}
