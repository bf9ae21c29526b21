use crate::common::{
    Value, ALL_DIRECTIVE, DIRECTIVE_SUFFIX, FIELDS_DIRECTIVE, LIMIT_DIRECTIVE, LOAD_DIRECTIVE,
    NATIVE_DIRECTIVE, OPERATOR_PREFIX, SKIP_DIRECTIVE, SORT_DIRECTIVE, UPSERT_DIRECTIVE,
};
use crate::document::Document;
use crate::options::FindOptions;
use indexmap::IndexMap;

/// Returns true if the key is a directive: a meta-instruction to the
/// normalizers rather than a literal filter field. Directives are
/// recognized by the fixed `$` suffix marker.
pub fn is_directive_key(key: &str) -> bool {
    key.ends_with(DIRECTIVE_SUFFIX)
}

/// Returns true if the key looks like a database-native operator
/// (leading `$`), e.g. `$or` or `$in`.
pub fn is_operator_key(key: &str) -> bool {
    key.starts_with(OPERATOR_PREFIX)
}

/// The raw-native escape hatch carried by the `native$` directive.
///
/// A single value is used verbatim as the filter; a two-element pair
/// supplies the filter and the find options together, bypassing both
/// normalizers.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeQuery {
    /// Use this document verbatim as the filter; options stay empty.
    Filter(Document),
    /// First element is the filter, second element is the options.
    Pair(Document, FindOptions),
}

/// The reserved directives a query can carry alongside its literal filter
/// terms. Each is optional and independently applied by the normalizers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    /// `native$`: raw escape hatch, wins over everything else.
    pub native: Option<NativeQuery>,
    /// `sort$`: field to numeric direction indicator, insertion-ordered.
    /// Only the first declared field is ever honored.
    pub sort: Option<IndexMap<String, i64>>,
    /// `limit$`: maximum result count; negative values clamp to 0.
    pub limit: Option<i64>,
    /// `skip$`: results to skip; negative values clamp to 0.
    pub skip: Option<i64>,
    /// `fields$`: projection, field names to include, passed through
    /// verbatim.
    pub fields: Option<Vec<String>>,
    /// `upsert$`: field names forming the upsert match key on save.
    pub upsert: Option<Vec<String>>,
    /// `load$`: on remove, whether to return the removed entity
    /// (default true).
    pub load: Option<bool>,
    /// `all$`: on remove, whether to delete every match (default false).
    pub all: Option<bool>,
}

/// Literal filter terms plus directives.
///
/// Terms are kept insertion-ordered so the general normalization case
/// walks them in the order the caller declared them; predicate combination
/// is commutative in the target filter language, so ordering only matters
/// for reproducible logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTerms {
    pub(crate) terms: IndexMap<String, Value>,
    pub(crate) directives: Directives,
}

impl QueryTerms {
    pub fn terms(&self) -> &IndexMap<String, Value> {
        &self.terms
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }
}

/// An abstract entity query.
///
/// The bare forms mirror the framework's id shortcuts: a plain string is an
/// id lookup, a plain array an id-list lookup. Everything else is a term
/// map with optional directives.
///
/// # Examples
///
/// ```rust,ignore
/// use docstore::query::Query;
///
/// let by_id = Query::id("507f1f77bcf86cd799439011");
/// let by_terms = Query::new()
///     .term("status", "active")
///     .sort("email", 1)
///     .limit(20);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Bare id shortcut: the whole query is a single portable id.
    Id(String),
    /// Bare id-list shortcut: the whole query is a list of ids.
    Ids(Vec<Value>),
    /// Structured query: literal terms plus directives.
    Terms(QueryTerms),
}

impl Default for Query {
    fn default() -> Self {
        Query::new()
    }
}

impl Query {
    /// Creates an empty structured query.
    pub fn new() -> Query {
        Query::Terms(QueryTerms::default())
    }

    /// Creates a bare id query.
    pub fn id(id: impl Into<String>) -> Query {
        Query::Id(id.into())
    }

    /// Creates a bare id-list query.
    pub fn ids<I, T>(ids: I) -> Query
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Query::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Adds a literal filter term.
    pub fn term(self, key: impl Into<String>, value: impl Into<Value>) -> Query {
        let mut terms = self.into_terms();
        terms.terms.insert(key.into(), value.into());
        Query::Terms(terms)
    }

    /// Adds a sort directive field. Declaration order is preserved; only
    /// the first declared field is honored by the options normalizer.
    pub fn sort(self, field: impl Into<String>, direction: i64) -> Query {
        let mut terms = self.into_terms();
        terms
            .directives
            .sort
            .get_or_insert_with(IndexMap::new)
            .insert(field.into(), direction);
        Query::Terms(terms)
    }

    /// Sets the limit directive.
    pub fn limit(self, limit: i64) -> Query {
        let mut terms = self.into_terms();
        terms.directives.limit = Some(limit);
        Query::Terms(terms)
    }

    /// Sets the skip directive.
    pub fn skip(self, skip: i64) -> Query {
        let mut terms = self.into_terms();
        terms.directives.skip = Some(skip);
        Query::Terms(terms)
    }

    /// Sets the projection directive.
    pub fn fields<I, T>(self, fields: I) -> Query
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut terms = self.into_terms();
        terms.directives.fields = Some(fields.into_iter().map(Into::into).collect());
        Query::Terms(terms)
    }

    /// Sets the upsert match-field directive used by save.
    pub fn upsert<I, T>(self, fields: I) -> Query
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut terms = self.into_terms();
        terms.directives.upsert = Some(fields.into_iter().map(Into::into).collect());
        Query::Terms(terms)
    }

    /// Sets the load directive used by remove.
    pub fn load(self, load: bool) -> Query {
        let mut terms = self.into_terms();
        terms.directives.load = Some(load);
        Query::Terms(terms)
    }

    /// Sets the all directive used by remove.
    pub fn all(self, all: bool) -> Query {
        let mut terms = self.into_terms();
        terms.directives.all = Some(all);
        Query::Terms(terms)
    }

    /// Sets the raw-native filter escape.
    pub fn native(self, filter: Document) -> Query {
        let mut terms = self.into_terms();
        terms.directives.native = Some(NativeQuery::Filter(filter));
        Query::Terms(terms)
    }

    /// Sets the raw-native filter and options pair.
    pub fn native_with_options(self, filter: Document, options: FindOptions) -> Query {
        let mut terms = self.into_terms();
        terms.directives.native = Some(NativeQuery::Pair(filter, options));
        Query::Terms(terms)
    }

    /// Returns the directives of a structured query, or defaults for the
    /// bare shortcuts (which cannot carry directives).
    pub fn directives(&self) -> Directives {
        match self {
            Query::Terms(terms) => terms.directives.clone(),
            _ => Directives::default(),
        }
    }

    /// Whether remove should delete every match. Defaults to false.
    pub fn remove_all(&self) -> bool {
        self.directives().all.unwrap_or(false)
    }

    /// Whether remove should return the removed entity. Defaults to true.
    pub fn remove_load(&self) -> bool {
        self.directives().load.unwrap_or(true)
    }

    fn into_terms(self) -> QueryTerms {
        match self {
            Query::Terms(terms) => terms,
            // the bare shortcuts carry no terms or directives
            Query::Id(id) => {
                let mut terms = QueryTerms::default();
                terms.terms.insert("id".to_string(), Value::from(id));
                terms
            }
            Query::Ids(ids) => {
                let mut terms = QueryTerms::default();
                terms.terms.insert("id".to_string(), Value::Array(ids));
                terms
            }
        }
    }

    /// Parses a raw directive-laden document into a structured query.
    ///
    /// Keys carrying the `$` suffix marker are matched against the
    /// enumerated directive set; unrecognized directives are dropped.
    /// Every other key becomes a literal filter term. The sort directive's
    /// field order follows the document's key order.
    pub fn from_document(doc: &Document) -> Query {
        let mut terms = QueryTerms::default();

        for (key, value) in doc.iter() {
            if !is_directive_key(key) {
                terms.terms.insert(key.clone(), value.clone());
                continue;
            }

            match key.as_str() {
                NATIVE_DIRECTIVE => {
                    terms.directives.native = parse_native(value);
                }
                SORT_DIRECTIVE => {
                    if let Value::Document(sort_doc) = value {
                        let mut sort = IndexMap::new();
                        for (field, direction) in sort_doc.iter() {
                            if let Some(direction) = direction.as_i64() {
                                sort.insert(field.clone(), direction);
                            }
                        }
                        terms.directives.sort = Some(sort);
                    }
                }
                LIMIT_DIRECTIVE => {
                    terms.directives.limit = value.as_i64();
                }
                SKIP_DIRECTIVE => {
                    terms.directives.skip = value.as_i64();
                }
                FIELDS_DIRECTIVE => {
                    terms.directives.fields = parse_string_list(value);
                }
                UPSERT_DIRECTIVE => {
                    terms.directives.upsert = parse_string_list(value);
                }
                LOAD_DIRECTIVE => {
                    terms.directives.load = value.as_bool();
                }
                ALL_DIRECTIVE => {
                    terms.directives.all = value.as_bool();
                }
                other => {
                    log::debug!("dropping unrecognized directive: {}", other);
                }
            }
        }

        Query::Terms(terms)
    }
}

fn parse_native(value: &Value) -> Option<NativeQuery> {
    match value {
        Value::Document(filter) => Some(NativeQuery::Filter(filter.clone())),
        Value::Array(pair) => {
            let filter = pair.first().and_then(Value::as_document).cloned()?;
            let options = pair
                .get(1)
                .and_then(Value::as_document)
                .map(FindOptions::from_document)
                .unwrap_or_default();
            Some(NativeQuery::Pair(filter, options))
        }
        _ => None,
    }
}

fn parse_string_list(value: &Value) -> Option<Vec<String>> {
    let values = value.as_array()?;
    Some(
        values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_is_directive_key() {
        assert!(is_directive_key("sort$"));
        assert!(is_directive_key("anything$"));
        assert!(!is_directive_key("sort"));
        assert!(!is_directive_key("$or"));
    }

    #[test]
    fn test_is_operator_key() {
        assert!(is_operator_key("$or"));
        assert!(is_operator_key("$in"));
        assert!(!is_operator_key("fruits"));
        assert!(!is_operator_key("sort$"));
    }

    #[test]
    fn test_builder_terms_keep_insertion_order() {
        let query = Query::new().term("b", 1).term("a", 2);
        if let Query::Terms(terms) = &query {
            let keys: Vec<_> = terms.terms.keys().cloned().collect();
            assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
        } else {
            panic!("expected terms query");
        }
    }

    #[test]
    fn test_builder_sort_keeps_declaration_order() {
        let query = Query::new().sort("zeta", 1).sort("alpha", -1);
        let sort = query.directives().sort.unwrap();
        let first = sort.iter().next().unwrap();
        assert_eq!(first.0, "zeta");
    }

    #[test]
    fn test_bare_shortcut_defaults() {
        let query = Query::id("abc");
        assert!(!query.remove_all());
        assert!(query.remove_load());
    }

    #[test]
    fn test_remove_directives() {
        let query = Query::new().all(true).load(false);
        assert!(query.remove_all());
        assert!(!query.remove_load());
    }

    #[test]
    fn test_from_document_splits_terms_and_directives() {
        let raw = doc! {
            bar: 1,
            "limit$": 10,
            "skip$": 5,
            "fields$": ["email"],
            "load$": false,
        };
        let query = Query::from_document(&raw);
        let directives = query.directives();
        assert_eq!(directives.limit, Some(10));
        assert_eq!(directives.skip, Some(5));
        assert_eq!(directives.fields, Some(vec!["email".to_string()]));
        assert_eq!(directives.load, Some(false));

        if let Query::Terms(terms) = &query {
            assert_eq!(terms.terms.len(), 1);
            assert!(terms.terms.contains_key("bar"));
        } else {
            panic!("expected terms query");
        }
    }

    #[test]
    fn test_from_document_sort_keeps_declaration_order() {
        // "z" is declared first; alphabetical order must not win
        let raw = doc! { "sort$": { z: 1, a: -1 } };
        let query = Query::from_document(&raw);
        let sort = query.directives().sort.unwrap();
        let first = sort.iter().next().unwrap();
        assert_eq!(first.0, "z");
        assert_eq!(*first.1, 1);
    }

    #[test]
    fn test_from_document_terms_keep_declaration_order() {
        let raw = doc! { zeta: 1, alpha: 2 };
        let query = Query::from_document(&raw);
        if let Query::Terms(terms) = &query {
            let keys: Vec<_> = terms.terms.keys().cloned().collect();
            assert_eq!(keys, vec!["zeta".to_string(), "alpha".to_string()]);
        } else {
            panic!("expected terms query");
        }
    }

    #[test]
    fn test_from_document_drops_unknown_directives() {
        let raw = doc! { "foo$": "v", bar: 1 };
        let query = Query::from_document(&raw);
        if let Query::Terms(terms) = &query {
            assert_eq!(terms.terms.len(), 1);
            assert!(terms.terms.contains_key("bar"));
            assert!(!terms.terms.contains_key("foo$"));
        } else {
            panic!("expected terms query");
        }
    }

    #[test]
    fn test_from_document_parses_native_pair() {
        let raw = doc! {
            "native$": [{ status: "active" }, { limit: 3 }],
        };
        let query = Query::from_document(&raw);
        match query.directives().native {
            Some(NativeQuery::Pair(filter, options)) => {
                assert_eq!(filter, doc! { status: "active" });
                assert_eq!(options.limit, Some(3));
            }
            other => panic!("expected native pair, got {:?}", other),
        }
    }

    #[test]
    fn test_from_document_parses_native_single() {
        let raw = doc! { "native$": { status: "active" } };
        let query = Query::from_document(&raw);
        match query.directives().native {
            Some(NativeQuery::Filter(filter)) => {
                assert_eq!(filter, doc! { status: "active" });
            }
            other => panic!("expected native filter, got {:?}", other),
        }
    }

    #[test]
    fn test_from_document_parses_upsert_fields() {
        let raw = doc! { "upsert$": ["email", "org"] };
        let query = Query::from_document(&raw);
        assert_eq!(
            query.directives().upsert,
            Some(vec!["email".to_string(), "org".to_string()])
        );
    }
}
