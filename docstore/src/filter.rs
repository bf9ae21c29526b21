use crate::common::{Value, DOC_ID, ENTITY_ID, IN_OPERATOR};
use crate::config::StoreConfig;
use crate::document::Document;
use crate::object_id::to_native;
use crate::query::{is_directive_key, is_operator_key, NativeQuery, Query};
use crate::doc;

const OPERATOR_WARNING: &str = "Passing native operators directly via the query \
may be unsafe and is being deprecated. In future releases, \
support for this may be removed.";

/// Converts an abstract query into a database-ready filter document.
///
/// The rules apply in priority order, first match wins:
///
/// 1. A `native$` directive is used verbatim: the pair form contributes its
///    first element (the second is consumed by the options normalizer), the
///    single form is the filter itself.
/// 2. A bare string query becomes `{_id: <native id>}`.
/// 3. A bare array query becomes `{_id: {$in: [<native ids>]}}`.
/// 4. A literal `id` term builds the filter from that term ALONE: every
///    sibling term in the query is discarded. This is intentional,
///    compatibility-relevant behavior, not partial filtering: an id lookup
///    ignores all other constraints.
/// 5. Otherwise every non-directive term is copied into the filter, with
///    two twists:
///    operator-looking keys (leading `$`) are stripped when
///    [`StoreConfig::native_operator_passthrough`] is off, or retained with
///    a deprecation warning when it is on; and an array value under a
///    non-operator key becomes a set-membership `{$in: [...]}` clause.
pub fn normalize_filter(query: &Query, config: &StoreConfig) -> Document {
    let terms = match query {
        Query::Id(id) => {
            return doc! { "_id": (to_native(Value::from(id.as_str()))) };
        }
        Query::Ids(ids) => {
            return id_list_filter(ids);
        }
        Query::Terms(terms) => terms,
    };

    if let Some(native) = &terms.directives().native {
        return match native {
            NativeQuery::Filter(filter) => filter.clone(),
            NativeQuery::Pair(filter, _) => filter.clone(),
        };
    }

    if let Some(id_value) = terms.terms().get(ENTITY_ID) {
        // an id term wins outright; sibling terms are discarded by design
        return match id_value {
            Value::Array(ids) => id_list_filter(ids),
            other => doc! { "_id": (to_native(other.clone())) },
        };
    }

    let mut filter = Document::new();
    for (key, value) in terms.terms() {
        if is_directive_key(key) {
            continue;
        }
        if is_operator_key(key) {
            if !config.native_operator_passthrough {
                continue;
            }
            log::warn!("{}", OPERATOR_WARNING);
        }

        if value.is_array() && !is_operator_key(key) {
            let members = value.as_array().cloned().unwrap_or_default();
            let mut membership = Document::new();
            membership.put(IN_OPERATOR, Value::Array(members));
            filter.put(key.clone(), membership);
        } else {
            filter.put(key.clone(), value.clone());
        }
    }

    filter
}

fn id_list_filter(ids: &[Value]) -> Document {
    let natives: Vec<Value> = ids.iter().map(|id| to_native(id.clone())).collect();
    let mut membership = Document::new();
    membership.put(IN_OPERATOR, Value::Array(natives));
    let mut filter = Document::new();
    filter.put(DOC_ID, membership);
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_id::ObjectId;
    use crate::options::FindOptions;

    fn config() -> StoreConfig {
        StoreConfig::new()
    }

    fn native_of(s: &str) -> Value {
        to_native(Value::from(s))
    }

    #[test]
    fn test_bare_string_is_id_lookup() {
        let hex = ObjectId::new().to_hex();
        let filter = normalize_filter(&Query::id(hex.as_str()), &config());
        assert_eq!(filter.get("_id"), native_of(&hex));
        assert!(filter.get("_id").is_id());
        assert_eq!(filter.size(), 1);
    }

    #[test]
    fn test_bare_string_non_hex_id_passes_through() {
        let filter = normalize_filter(&Query::id("user-42"), &config());
        assert_eq!(filter.get("_id"), Value::from("user-42"));
    }

    #[test]
    fn test_bare_array_is_membership_lookup() {
        let filter = normalize_filter(&Query::ids(["a", "b"]), &config());
        let clause = filter.get("_id");
        let clause = clause.as_document().unwrap();
        assert_eq!(
            clause.get("$in"),
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_id_term_wins_and_discards_siblings() {
        let query = Query::new().term("id", "X").term("score", 99);
        let filter = normalize_filter(&query, &config());
        assert_eq!(filter.size(), 1);
        assert_eq!(filter.get("_id"), Value::from("X"));
        assert!(!filter.contains_key("score"));
    }

    #[test]
    fn test_id_term_array_becomes_membership() {
        let query = Query::new().term(
            "id",
            Value::Array(vec![Value::from("a"), Value::from("b")]),
        );
        let filter = normalize_filter(&query, &config());
        let clause = filter.get("_id");
        let clause = clause.as_document().unwrap();
        assert_eq!(
            clause.get("$in"),
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_id_term_converts_hex_ids_to_native() {
        let hex = ObjectId::new().to_hex();
        let query = Query::new().term(
            "id",
            Value::Array(vec![Value::from(hex.as_str()), Value::from("plain")]),
        );
        let filter = normalize_filter(&query, &config());
        let clause = filter.get("_id");
        let members = clause.as_document().unwrap().get("$in");
        let members = members.as_array().cloned().unwrap();
        assert!(members[0].is_id());
        assert_eq!(members[1], Value::from("plain"));
    }

    #[test]
    fn test_general_case_copies_terms_and_expands_arrays() {
        let query = Query::new()
            .term("score", 1)
            .term("fruits", Value::Array(vec![Value::from("x"), Value::from("y")]));
        let filter = normalize_filter(&query, &config());

        assert_eq!(filter.get("score"), Value::I32(1));
        let clause = filter.get("fruits");
        let clause = clause.as_document().unwrap();
        assert_eq!(
            clause.get("$in"),
            Value::Array(vec![Value::from("x"), Value::from("y")])
        );
    }

    #[test]
    fn test_directive_suffixed_term_never_becomes_a_filter_field() {
        let query = Query::new().term("foo$", "v").term("bar", 1);
        let filter = normalize_filter(&query, &config());
        assert_eq!(filter.size(), 1);
        assert_eq!(filter.get("bar"), Value::I32(1));
    }

    #[test]
    fn test_operator_key_stripped_when_passthrough_disabled() {
        let stripping = StoreConfig::new().native_operator_passthrough(false);
        let query = Query::new()
            .term("foo", "a")
            .term("$or", Value::Array(vec![]));
        let filter = normalize_filter(&query, &stripping);
        assert_eq!(filter.size(), 1);
        assert_eq!(filter.get("foo"), Value::from("a"));
    }

    #[test]
    fn test_operator_key_retained_when_passthrough_enabled() {
        let or_clause = Value::Array(vec![Value::Document(doc! { a: 1 })]);
        let query = Query::new().term("foo", "a").term("$or", or_clause.clone());
        let filter = normalize_filter(&query, &config());
        assert_eq!(filter.size(), 2);
        // operator keys are retained verbatim; no $in wrapping even for arrays
        assert_eq!(filter.get("$or"), or_clause);
    }

    #[test]
    fn test_native_single_is_filter_verbatim() {
        let raw = doc! { status: "active", "$where": "true" };
        let query = Query::new().term("ignored", 1).native(raw.clone());
        assert_eq!(normalize_filter(&query, &config()), raw);
    }

    #[test]
    fn test_native_pair_contributes_first_element() {
        let raw = doc! { status: "active" };
        let query = Query::new().native_with_options(raw.clone(), FindOptions::new().limit(3));
        assert_eq!(normalize_filter(&query, &config()), raw);
    }

    #[test]
    fn test_empty_query_yields_empty_filter() {
        let filter = normalize_filter(&Query::new(), &config());
        assert!(filter.is_empty());
    }
}
