use indexmap::IndexMap;

use crate::common::{Value, DOC_ID};
use crate::object_id::ObjectId;
use std::cmp::Ordering;
use std::fmt::{Debug, Display};

/// Represents a database document as an insertion-ordered map.
///
/// Documents are composed of key-value pairs. The key is always a [String]
/// and the value is a [Value]. Nested structure (operator clauses like
/// `{"$in": [...]}`, native filter documents) is expressed through
/// [Value::Document] rather than dotted-path keys.
///
/// The `_id` field is reserved for the database-native identifier and is
/// only ever written by the translation layer itself.
///
/// ## Field ordering
///
/// Fields iterate in declaration order, never alphabetically. Raw
/// directive documents depend on this: a sort directive honors exactly the
/// first declared field, so the order the caller wrote must survive
/// parsing. Equality is order-insensitive: two documents with the same
/// entries are equal however they were declared. A cloned document is
/// completely independent: callers never observe aliasing between a raw
/// document and an entity materialized from it.
#[derive(Clone, Eq, PartialEq, Default, serde::Deserialize, serde::Serialize)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    /// Checks if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of fields in this document.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates the specified [Value] with the specified key. If the key
    /// already exists, its value is replaced in place, keeping the field's
    /// original declaration position.
    pub fn put<T: Into<Value>>(&mut self, key: impl Into<String>, value: T) {
        self.data.insert(key.into(), value.into());
    }

    /// Returns the [Value] associated with the key, or [Value::Null] if the
    /// document contains no mapping for it.
    pub fn get(&self, key: &str) -> Value {
        self.data.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Returns true if the document contains the key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Removes the mapping for the key, returning the previous value if
    /// there was one. The declaration order of the remaining fields is
    /// preserved.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    /// Returns the database-native id of this document, if present.
    pub fn id(&self) -> Option<&ObjectId> {
        match self.data.get(DOC_ID) {
            Some(Value::Id(id)) => Some(id),
            _ => None,
        }
    }

    /// Returns all field names of this document, in declaration order.
    pub fn fields(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Iterates over the key-value pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Merges every field of `other` into this document, replacing
    /// existing values. The `_id` field of `other` is ignored; a document's
    /// identity never changes through a merge.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.iter() {
            if key == DOC_ID {
                continue;
            }
            self.put(key.clone(), value.clone());
        }
    }
}

impl PartialOrd for Document {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Document {
    /// Compares entries in key order, so documents that are equal under
    /// the order-insensitive `PartialEq` also compare `Equal` here.
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left: Vec<(&String, &Value)> = self.data.iter().collect();
        let mut right: Vec<(&String, &Value)> = other.data.iter().collect();
        left.sort_by(|a, b| a.0.cmp(b.0));
        right.sort_by(|a, b| a.0.cmp(b.0));
        left.cmp(&right)
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut doc = Document::new();
        for (key, value) in iter {
            doc.put(key, value);
        }
        doc
    }
}

/// Strips the surrounding quotes that `stringify!` leaves on string-literal
/// keys in the [`doc!`](crate::doc) macro.
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// Keys may be identifiers or string literals; values may be arbitrary
/// expressions (negative literals included), nested documents, or arrays.
/// Field declaration order is preserved.
///
/// # Examples
///
/// ```rust
/// use docstore::doc;
///
/// // Empty document
/// let empty = doc!{};
///
/// // Identifier or string-literal keys, nested documents and arrays
/// let filter = doc!{
///     score: 1,
///     fruits: ["apple", "orange"],
///     "nested": { flag: true },
///     "sort$": { age: -1 },
/// };
/// ```
#[macro_export]
macro_rules! doc {
    // match an empty document
    () => {
        $crate::document::Document::new()
    };

    // match a document wrapped in outer braces (backward compat)
    ({ $($tt:tt)* }) => {
        $crate::doc!($($tt)*)
    };

    // match a document with key value pairs
    ($($tt:tt)+) => {
        {
            let mut doc = $crate::document::Document::new();
            $crate::doc_fields!(doc, $($tt)+);
            doc
        }
    };
}

/// Field-list muncher for [`doc!`](crate::doc). One arm per value shape:
/// nested document, array, then a general expression arm that also covers
/// signed literals (which span two token trees and so cannot be matched as
/// a single `tt`).
#[doc(hidden)]
#[macro_export]
macro_rules! doc_fields {
    // nested document value
    ($doc:ident, $key:tt : { $($value:tt)* } $(, $($rest:tt)*)?) => {
        $doc.put(
            $crate::document::normalize(stringify!($key)),
            $crate::doc_value!({ $($value)* }),
        );
        $crate::doc_fields!($doc $(, $($rest)*)?);
    };

    // array value
    ($doc:ident, $key:tt : [ $($value:tt)* ] $(, $($rest:tt)*)?) => {
        $doc.put(
            $crate::document::normalize(stringify!($key)),
            $crate::doc_value!([ $($value)* ]),
        );
        $crate::doc_fields!($doc $(, $($rest)*)?);
    };

    // expression value (variable, function call, literal, negative literal)
    ($doc:ident, $key:tt : $value:expr $(, $($rest:tt)*)?) => {
        $doc.put(
            $crate::document::normalize(stringify!($key)),
            $crate::common::Value::from($value),
        );
        $crate::doc_fields!($doc $(, $($rest)*)?);
    };

    // end of input, trailing comma included
    ($doc:ident $(,)?) => {};
}

/// Helper macro to convert values for the [`doc!`](crate::doc) macro.
/// Handles nested documents, arrays, and expressions.
#[macro_export]
macro_rules! doc_value {
    // match a nested document
    ({ $($tt:tt)* }) => {
        $crate::common::Value::Document($crate::doc!{ $($tt)* })
    };

    // match an array of values
    ([ $($tt:tt)* ]) => {
        {
            #[allow(unused_mut)]
            let mut values: Vec<$crate::common::Value> = Vec::new();
            $crate::doc_elements!(values, $($tt)*);
            $crate::common::Value::Array(values)
        }
    };

    // match an expression (variable, function call, literal, etc.)
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}

/// Element-list muncher for [`doc_value!`](crate::doc_value) arrays, with
/// the same per-shape arms as [`doc_fields!`](crate::doc_fields).
#[doc(hidden)]
#[macro_export]
macro_rules! doc_elements {
    ($vec:ident, { $($value:tt)* } $(, $($rest:tt)*)?) => {
        $vec.push($crate::doc_value!({ $($value)* }));
        $crate::doc_elements!($vec $(, $($rest)*)?);
    };

    ($vec:ident, [ $($value:tt)* ] $(, $($rest:tt)*)?) => {
        $vec.push($crate::doc_value!([ $($value)* ]));
        $crate::doc_elements!($vec $(, $($rest)*)?);
    };

    ($vec:ident, $value:expr $(, $($rest:tt)*)?) => {
        $vec.push($crate::common::Value::from($value));
        $crate::doc_elements!($vec $(, $($rest)*)?);
    };

    ($vec:ident $(,)?) => {};
}
