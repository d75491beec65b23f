use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::warn;

/// Columns copied verbatim (trimmed) from the consolidated CSV.
const STRING_FIELDS: &[&str] = &[
    "category",
    "created_at",
    "image_url",
    "name",
    "original_url",
    "product_id",
    "store_id",
];

/// Columns parsed as numbers; unparsable cells become 0 rather than
/// failing the row.
const NUMBER_FIELDS: &[&str] = &["price", "matched_products_count"];

/// Columns holding JSON lists; anything malformed becomes an empty list.
const LIST_FIELDS: &[&str] = &["price_history", "matched_products", "categoryNameVariations"];

/// Shape one CSV row into the document fields to merge upstream.
/// `last_updated` is stamped with the sync time, not copied from the CSV.
pub fn build_update(row: &HashMap<String, String>) -> Map<String, Value> {
    let cell = |name: &str| row.get(name).map(|s| s.trim()).unwrap_or("");

    let mut fields = Map::new();
    for name in STRING_FIELDS {
        fields.insert((*name).to_string(), Value::String(cell(name).to_string()));
    }
    for name in NUMBER_FIELDS {
        fields.insert((*name).to_string(), parse_number(name, cell(name)));
    }
    for name in LIST_FIELDS {
        fields.insert((*name).to_string(), parse_json_list(name, cell(name)));
    }
    fields.insert(
        "last_updated".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    fields
}

fn parse_number(name: &str, value: &str) -> Value {
    if value.is_empty() {
        return json!(0);
    }
    if let Ok(n) = value.parse::<i64>() {
        return json!(n);
    }
    match value.parse::<f64>() {
        Ok(n) => json!(n),
        Err(_) => {
            warn!("unparsable number in column {name}: {value:?}, using 0");
            json!(0)
        }
    }
}

fn parse_json_list(name: &str, value: &str) -> Value {
    if value.is_empty() {
        return json!([]);
    }
    match serde_json::from_str::<Value>(value) {
        Ok(Value::Array(items)) => Value::Array(items),
        Ok(_) => {
            warn!("column {name} is valid JSON but not a list, using []");
            json!([])
        }
        Err(_) => {
            warn!("malformed JSON in column {name}, using []");
            json!([])
        }
    }
}

/// Encode a plain JSON value in the typed wire format the documents API
/// expects (`stringValue`, `integerValue`, ...).
pub fn to_wire_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // integerValue travels as a string per the REST encoding
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_wire_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let mut fields = Map::new();
            for (k, v) in map {
                fields.insert(k.clone(), to_wire_value(v));
            }
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

pub fn to_wire_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), to_wire_value(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_update_copies_strings_trimmed() {
        let fields = build_update(&row(&[
            ("product_id", " P1 "),
            ("name", "Sugar 1kg"),
            ("store_id", "Metro"),
        ]));
        assert_eq!(fields["product_id"], json!("P1"));
        assert_eq!(fields["name"], json!("Sugar 1kg"));
        assert_eq!(fields["category"], json!(""));
    }

    #[test]
    fn test_numbers_fall_back_to_zero() {
        let fields = build_update(&row(&[
            ("price", "149.5"),
            ("matched_products_count", "not a number"),
        ]));
        assert_eq!(fields["price"], json!(149.5));
        assert_eq!(fields["matched_products_count"], json!(0));
    }

    #[test]
    fn test_lists_fall_back_to_empty() {
        let fields = build_update(&row(&[
            ("price_history", r#"[{"price": 120.0, "is_current": true}]"#),
            ("matched_products", "{broken"),
            ("categoryNameVariations", r#"{"not": "a list"}"#),
        ]));
        assert_eq!(fields["price_history"].as_array().unwrap().len(), 1);
        assert_eq!(fields["matched_products"], json!([]));
        assert_eq!(fields["categoryNameVariations"], json!([]));
    }

    #[test]
    fn test_last_updated_is_stamped() {
        let fields = build_update(&row(&[("last_updated", "2020-01-01T00:00:00Z")]));
        let stamped = fields["last_updated"].as_str().unwrap();
        assert_ne!(stamped, "2020-01-01T00:00:00Z");
        assert!(stamped.starts_with("20"));
    }

    #[test]
    fn test_wire_encoding() {
        assert_eq!(to_wire_value(&json!("x")), json!({"stringValue": "x"}));
        assert_eq!(to_wire_value(&json!(3)), json!({"integerValue": "3"}));
        assert_eq!(to_wire_value(&json!(1.5)), json!({"doubleValue": 1.5}));
        assert_eq!(to_wire_value(&json!(true)), json!({"booleanValue": true}));
        assert_eq!(
            to_wire_value(&json!([1, "a"])),
            json!({"arrayValue": {"values": [
                {"integerValue": "1"},
                {"stringValue": "a"}
            ]}})
        );
        assert_eq!(
            to_wire_value(&json!({"price": 2})),
            json!({"mapValue": {"fields": {"price": {"integerValue": "2"}}}})
        );
    }
}
