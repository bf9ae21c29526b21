use crate::common::{Value, DOC_ID, ID_DIRECTIVE, MERGE_DIRECTIVE, UPSERT_DIRECTIVE};
use crate::document::Document;
use crate::object_id::to_portable;
use crate::query::is_directive_key;

/// An abstract entity: a named kind plus a data payload and an optional
/// portable id.
///
/// Before persistence an entity has no native id; after a successful save
/// it always carries a portable id string. The optional `base` namespace
/// and the `name` together derive the canonical collection name
/// (`base_name`, underscore-joined).
///
/// An entity can also carry per-call save directives:
/// - an explicit id to assign on create/upsert ([`Entity::with_explicit_id`]),
/// - a merge override flipping the configured update semantics
///   ([`Entity::with_merge`]),
/// - the upsert match fields ([`Entity::with_upsert`]).
///
/// These directives are ephemeral: they influence a single save call and
/// are never part of the persisted data, and entities returned from the
/// store never carry them.
///
/// # Examples
///
/// ```rust,ignore
/// use docstore::entity::Entity;
///
/// let user = Entity::new("user")
///     .set("email", "alice@example.com")
///     .set("score", 10);
/// let saved = store.save(&user)?;
/// assert!(saved.id().is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    base: Option<String>,
    name: String,
    id: Option<String>,
    data: Document,
    explicit_id: Option<Value>,
    merge: Option<bool>,
    upsert: Option<Vec<String>>,
}

impl Entity {
    /// Creates an empty entity of the given kind.
    pub fn new(name: impl Into<String>) -> Entity {
        Entity {
            base: None,
            name: name.into(),
            id: None,
            data: Document::new(),
            explicit_id: None,
            merge: None,
            upsert: None,
        }
    }

    /// Creates an empty entity of the given kind under a namespace.
    pub fn with_base(base: impl Into<String>, name: impl Into<String>) -> Entity {
        let mut entity = Entity::new(name);
        entity.base = Some(base.into());
        entity
    }

    /// Sets a data field.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Entity {
        self.data.put(key, value);
        self
    }

    /// Sets the portable id, marking the entity as existing.
    pub fn with_id(mut self, id: impl Into<String>) -> Entity {
        self.id = Some(id.into());
        self
    }

    /// Sets the explicit id directive consulted on create and upsert.
    pub fn with_explicit_id(mut self, id: impl Into<Value>) -> Entity {
        self.explicit_id = Some(id.into());
        self
    }

    /// Overrides the configured merge-vs-replace default for this save.
    pub fn with_merge(mut self, merge: bool) -> Entity {
        self.merge = Some(merge);
        self
    }

    /// Designates the upsert match fields for this save. Save switches to
    /// upsert-by-key only when every named field exists in the entity data.
    pub fn with_upsert<I, T>(mut self, fields: I) -> Entity
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.upsert = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the whole data payload.
    pub fn with_data(mut self, data: Document) -> Entity {
        self.data = data;
        self
    }

    /// Builds an entity of the given kind from a raw directive-laden data
    /// document.
    ///
    /// The reserved save directives are extracted: `id$` becomes the
    /// explicit id, `merge$` the merge override, `upsert$` the upsert
    /// match fields. Unrecognized directive keys are dropped; every other
    /// key is literal entity data.
    pub fn from_document(name: impl Into<String>, doc: &Document) -> Entity {
        let mut entity = Entity::new(name);

        for (key, value) in doc.iter() {
            if !is_directive_key(key) {
                entity.data.put(key.clone(), value.clone());
                continue;
            }

            match key.as_str() {
                ID_DIRECTIVE => entity.explicit_id = Some(value.clone()),
                MERGE_DIRECTIVE => entity.merge = value.as_bool(),
                UPSERT_DIRECTIVE => {
                    if let Some(fields) = value.as_array() {
                        entity.upsert = Some(
                            fields
                                .iter()
                                .filter_map(|v| v.as_str().map(str::to_string))
                                .collect(),
                        );
                    }
                }
                other => log::debug!("dropping unrecognized directive: {}", other),
            }
        }

        entity
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn data(&self) -> &Document {
        &self.data
    }

    pub fn get(&self, key: &str) -> Value {
        self.data.get(key)
    }

    pub(crate) fn explicit_id(&self) -> Option<&Value> {
        self.explicit_id.as_ref()
    }

    pub(crate) fn merge_override(&self) -> Option<bool> {
        self.merge
    }

    pub(crate) fn upsert_fields(&self) -> Option<&Vec<String>> {
        self.upsert.as_ref()
    }

    /// The canonical collection name: `base_name` when a namespace is set,
    /// otherwise just the kind name.
    pub fn collection_name(&self) -> String {
        match &self.base {
            Some(base) => format!("{}_{}", base, self.name),
            None => self.name.clone(),
        }
    }

    /// Creates a new entity of this entity's kind from materialized data,
    /// carrying no per-call directives.
    pub(crate) fn make(&self, id: Option<String>, data: Document) -> Entity {
        Entity {
            base: self.base.clone(),
            name: self.name.clone(),
            id,
            data,
            explicit_id: None,
            merge: None,
            upsert: None,
        }
    }
}

/// Converts a raw persisted document into the portable entity shape.
///
/// `None` input yields `None`. Otherwise the native `_id` field is
/// stripped, its portable string form becomes the entity id, and the
/// remaining data is carried over into a new entity of the template's
/// kind. The returned entity never aliases the raw document.
pub fn to_entity(raw: Option<Document>, template: &Entity) -> Option<Entity> {
    let raw = raw?;

    let mut data = raw;
    let id = data.remove(DOC_ID).map(|native| to_portable(&native));

    Some(template.make(id, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::object_id::ObjectId;

    #[test]
    fn test_collection_name_without_base() {
        let entity = Entity::new("user");
        assert_eq!(entity.collection_name(), "user");
    }

    #[test]
    fn test_collection_name_with_base() {
        let entity = Entity::with_base("sys", "user");
        assert_eq!(entity.collection_name(), "sys_user");
    }

    #[test]
    fn test_set_and_get() {
        let entity = Entity::new("user").set("email", "a@b.c").set("score", 10);
        assert_eq!(entity.get("email"), Value::from("a@b.c"));
        assert_eq!(entity.get("score"), Value::I32(10));
        assert!(entity.id().is_none());
    }

    #[test]
    fn test_to_entity_null_in_null_out() {
        let template = Entity::new("user");
        assert!(to_entity(None, &template).is_none());
    }

    #[test]
    fn test_to_entity_strips_native_id() {
        let id = ObjectId::new();
        let mut raw = doc! { email: "a@b.c" };
        raw.put(DOC_ID, id);

        let template = Entity::new("user");
        let entity = to_entity(Some(raw), &template).unwrap();

        assert_eq!(entity.id(), Some(id.to_hex().as_str()));
        assert!(!entity.data().contains_key(DOC_ID));
        assert_eq!(entity.get("email"), Value::from("a@b.c"));
    }

    #[test]
    fn test_to_entity_stringifies_non_native_ids() {
        let mut raw = doc! { email: "a@b.c" };
        raw.put(DOC_ID, "user-42");

        let template = Entity::new("user");
        let entity = to_entity(Some(raw), &template).unwrap();
        assert_eq!(entity.id(), Some("user-42"));
    }

    #[test]
    fn test_to_entity_does_not_alias_raw_document() {
        let mut raw = doc! { count: 1 };
        raw.put(DOC_ID, ObjectId::new());
        let snapshot = raw.clone();

        let template = Entity::new("counter");
        let entity = to_entity(Some(raw), &template).unwrap();

        // mutating the materialized entity's data never leaks anywhere
        let mut mutated = entity.data().clone();
        mutated.put("count", 2);
        assert_eq!(entity.get("count"), Value::I32(1));
        assert_eq!(snapshot.get("count"), Value::I32(1));
    }

    #[test]
    fn test_make_drops_per_call_directives() {
        let template = Entity::new("user")
            .with_explicit_id("abc")
            .with_merge(false)
            .with_upsert(["email"]);
        let made = template.make(Some("id1".to_string()), doc! { a: 1 });
        assert!(made.explicit_id().is_none());
        assert!(made.merge_override().is_none());
        assert!(made.upsert_fields().is_none());
        assert_eq!(made.id(), Some("id1"));
    }

    #[test]
    fn test_from_document_extracts_save_directives() {
        let raw = doc! {
            email: "a@b.c",
            "id$": "chosen",
            "merge$": false,
            "upsert$": ["email"],
            "bogus$": 1,
        };
        let entity = Entity::from_document("user", &raw);

        assert_eq!(entity.get("email"), Value::from("a@b.c"));
        assert_eq!(entity.explicit_id(), Some(&Value::from("chosen")));
        assert_eq!(entity.merge_override(), Some(false));
        assert_eq!(entity.upsert_fields(), Some(&vec!["email".to_string()]));
        assert!(!entity.data().contains_key("id$"));
        assert!(!entity.data().contains_key("bogus$"));
    }

    #[test]
    fn test_with_data_replaces_payload() {
        let entity = Entity::new("user").set("a", 1).with_data(doc! { b: 2 });
        assert_eq!(entity.get("a"), Value::Null);
        assert_eq!(entity.get("b"), Value::I32(2));
    }
}
