use crate::entity::Entity;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Injected hook producing a portable id for an entity about to be
/// created, when the caller did not supply one explicitly. Returning
/// `None` lets the database assign the id.
pub type IdGenerator = Arc<dyn Fn(&Entity) -> Option<String> + Send + Sync>;

/// Configuration for the translation layer.
///
/// Constructed with a builder, matching the per-plugin options of the
/// framework protocol:
///
/// ```rust,ignore
/// use docstore::config::StoreConfig;
///
/// let config = StoreConfig::new()
///     .merge_on_update(false)
///     .native_operator_passthrough(false)
///     .generate_id(|ent| Some(format!("{}-id", ent.name())));
/// ```
#[derive(Clone)]
pub struct StoreConfig {
    pub(crate) merge_on_update: bool,
    pub(crate) native_operator_passthrough: bool,
    pub(crate) generate_id: Option<IdGenerator>,
}

impl StoreConfig {
    /// Creates a configuration with the defaults: merge semantics on
    /// update, native operators passed through (with a warning).
    pub fn new() -> StoreConfig {
        StoreConfig {
            merge_on_update: true,
            native_operator_passthrough: true,
            generate_id: None,
        }
    }

    /// Sets the default update semantics: `true` (default) merges the
    /// written fields into the existing document, `false` replaces the
    /// whole document. Entities can override per call.
    pub fn merge_on_update(mut self, merge: bool) -> StoreConfig {
        self.merge_on_update = merge;
        self
    }

    /// Controls handling of operator-looking keys (leading `$`) in query
    /// terms. When `true` (default) they are retained in the filter with a
    /// deprecation warning; when `false` they are stripped.
    pub fn native_operator_passthrough(mut self, passthrough: bool) -> StoreConfig {
        self.native_operator_passthrough = passthrough;
        self
    }

    /// Installs the id-generation hook consulted on create and upsert when
    /// no explicit id directive is present.
    pub fn generate_id<F>(mut self, generator: F) -> StoreConfig
    where
        F: Fn(&Entity) -> Option<String> + Send + Sync + 'static,
    {
        self.generate_id = Some(Arc::new(generator));
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::new()
    }
}

impl Debug for StoreConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("merge_on_update", &self.merge_on_update)
            .field("native_operator_passthrough", &self.native_operator_passthrough)
            .field("generate_id", &self.generate_id.is_some())
            .finish()
    }
}
