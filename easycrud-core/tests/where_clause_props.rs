use easycrud_core::query::{select_rows, update, where_clause};
use easycrud_core::{Fields, GetOptions};
use proptest::prelude::*;
use serde_json::{json, Value};

// Strategy for column/value pairs with non-empty identifier-like names
fn arb_fields() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-z_][a-z0-9_]{0,15}", any::<i64>()), 1..12)
}

proptest! {
    /// Property: one `col = ?` fragment per key, AND-joined, params in key order
    #[test]
    fn prop_where_has_one_fragment_per_key(pairs in arb_fields()) {
        let fields: Fields = pairs.iter().map(|(c, v)| (c.clone(), *v)).collect();
        let mut params = Vec::new();
        let clause = where_clause(&fields, &mut params).unwrap();

        let expected: Vec<String> = pairs.iter().map(|(c, _)| format!("`{}` = ?", c)).collect();
        prop_assert_eq!(clause, format!(" WHERE {}", expected.join(" AND ")));

        let values: Vec<Value> = pairs.iter().map(|(_, v)| json!(v)).collect();
        prop_assert_eq!(params, values);
    }

    /// Property: no value is ever interpolated into the SQL text
    #[test]
    fn prop_values_never_inlined(text in "[A-Za-z0-9 ]{12,24}") {
        let fields = Fields::new().with("name", text.clone());
        let stmt = select_rows("people", &fields, &GetOptions::new()).unwrap();

        prop_assert!(!stmt.sql.contains(&text));
        prop_assert_eq!(stmt.params, vec![json!(text)]);
    }

    /// Property: update parameters are data values followed by filter values
    #[test]
    fn prop_update_param_order(filter in arb_fields(), data in arb_fields()) {
        let filter_fields: Fields = filter.iter().map(|(c, v)| (c.clone(), *v)).collect();
        let data_fields: Fields = data.iter().map(|(c, v)| (c.clone(), *v)).collect();
        let stmt = update("t", &filter_fields, &data_fields).unwrap();

        let expected: Vec<Value> = data
            .iter()
            .chain(filter.iter())
            .map(|(_, v)| json!(v))
            .collect();
        prop_assert_eq!(stmt.params, expected);
        prop_assert_eq!(stmt.sql.matches("= ?").count(), data.len() + filter.len());
    }

    /// Property: window is applied only when both page and page size are present
    #[test]
    fn prop_pagination_needs_both(page in proptest::option::of(1u32..1000), per in proptest::option::of(1u32..500)) {
        let options = GetOptions { page, page_per: per, ..GetOptions::default() };
        let stmt = select_rows("t", &Fields::new(), &options).unwrap();

        match (page, per) {
            (Some(p), Some(n)) => {
                let limit = format!(" LIMIT {}, {}", u64::from(p - 1) * u64::from(n), n);
                prop_assert!(stmt.sql.ends_with(&limit));
            }
            _ => prop_assert!(!stmt.sql.contains("LIMIT")),
        }
    }
}
