use crate::common::{SortOrder, Value};
use crate::document::Document;
use crate::query::{NativeQuery, Query};

/// Options for controlling find operations: sort, pagination, and
/// projection.
///
/// This is the normalized, database-ready options document derived from a
/// query's directives. It supports method chaining for convenient
/// construction when used with the raw-native escape.
///
/// # Examples
///
/// ```rust,ignore
/// use docstore::options::FindOptions;
/// use docstore::common::SortOrder;
///
/// let options = FindOptions::new()
///     .order_by("age", SortOrder::Descending)
///     .skip(10)
///     .limit(20);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub(crate) sort: Option<(String, SortOrder)>,
    pub(crate) limit: Option<i64>,
    pub(crate) skip: Option<i64>,
    pub(crate) fields: Option<Vec<String>>,
}

impl FindOptions {
    /// Creates a new `FindOptions` with no sort, pagination, or projection.
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    /// Sets the sort field and order. Only one sort key is supported.
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> FindOptions {
        self.sort = Some((field.into(), order));
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: i64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: i64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    /// Sets the projection: field names to include in results.
    pub fn fields<I, T>(mut self, fields: I) -> FindOptions
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort_spec(&self) -> Option<&(String, SortOrder)> {
        self.sort.as_ref()
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn skip_value(&self) -> Option<i64> {
        self.skip
    }

    pub fn projected_fields(&self) -> Option<&Vec<String>> {
        self.fields.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.sort.is_none() && self.limit.is_none() && self.skip.is_none() && self.fields.is_none()
    }

    /// Parses a raw options document, as supplied by the second element of
    /// a `native$` pair. Recognized keys: `sort` (field → numeric
    /// direction, first field wins), `limit`, `skip`, `fields`.
    pub fn from_document(doc: &Document) -> FindOptions {
        let mut options = FindOptions::new();

        if let Value::Document(sort_doc) = doc.get("sort") {
            if let Some((field, direction)) = sort_doc.iter().next() {
                let indicator = direction.as_i64().unwrap_or(0);
                options.sort = Some((field.clone(), SortOrder::from_indicator(indicator)));
            }
        }
        if let Some(limit) = doc.get("limit").as_i64() {
            options.limit = Some(limit);
        }
        if let Some(skip) = doc.get("skip").as_i64() {
            options.skip = Some(skip);
        }
        if let Value::Array(fields) = doc.get("fields") {
            options.fields = Some(
                fields
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            );
        }

        options
    }
}

/// Extracts the sort/limit/skip/projection directives of a query into a
/// database-ready [FindOptions].
///
/// A `native$` pair short-circuits everything: its second element is the
/// options, verbatim. A single-value `native$` yields empty options. The
/// bare id shortcuts carry no directives and also yield empty options.
///
/// Otherwise the four directives are independently applied:
/// - sort: exactly the FIRST declared field is honored, descending when
///   its numeric indicator is negative, even if more fields were supplied;
/// - limit and skip: applied only when present, negative values clamped
///   to 0;
/// - fields: passed through verbatim.
pub fn normalize_options(query: &Query) -> FindOptions {
    let directives = match query {
        Query::Terms(terms) => terms.directives(),
        // bare shortcuts cannot carry directives
        _ => return FindOptions::new(),
    };

    match &directives.native {
        Some(NativeQuery::Pair(_, options)) => return options.clone(),
        Some(NativeQuery::Filter(_)) => return FindOptions::new(),
        None => {}
    }

    let mut options = FindOptions::new();

    if let Some(sort) = &directives.sort {
        if let Some((field, direction)) = sort.iter().next() {
            options.sort = Some((field.clone(), SortOrder::from_indicator(*direction)));
        }
    }

    if let Some(limit) = directives.limit {
        options.limit = Some(limit.max(0));
    }

    if let Some(skip) = directives.skip {
        options.skip = Some(skip.max(0));
    }

    if let Some(fields) = &directives.fields {
        options.fields = Some(fields.clone());
    }

    options
}
