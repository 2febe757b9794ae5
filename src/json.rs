// ABOUTME: Conversion between Duso values and serde_json values
//
// Type mapping:
// - Duso object <-> JSON object (insertion order preserved both ways)
// - Duso array  <-> JSON array
// - Duso number <-> JSON number
// - Duso string <-> JSON string
// - Duso bool   <-> JSON boolean
// - Duso nil    <-> JSON null
//
// Functions cannot be encoded.

use crate::value::Value;
use indexmap::IndexMap;

/// Convert a Duso value to a serde_json value.
pub fn to_json(value: &Value) -> Result<serde_json::Value, String> {
    match value {
        Value::Nil => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => match serde_json::Number::from_f64(*n) {
            Some(num) => Ok(serde_json::Value::Number(num)),
            None => Err(format!("cannot convert number {} to JSON", n)),
        },
        Value::Str(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Array(items) => {
            let json_items: Result<Vec<_>, _> = items.borrow().iter().map(to_json).collect();
            Ok(serde_json::Value::Array(json_items?))
        }
        Value::Object(entries) => {
            let mut json_map = serde_json::Map::new();
            for (key, val) in entries.borrow().iter() {
                json_map.insert(key.clone(), to_json(val)?);
            }
            Ok(serde_json::Value::Object(json_map))
        }
        Value::Function(_) | Value::Native(_) => {
            Err("cannot convert function to JSON".to_string())
        }
    }
}

/// Convert a serde_json value to a Duso value.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(arr) => Value::array(arr.iter().map(from_json).collect()),
        serde_json::Value::Object(obj) => {
            let mut map = IndexMap::new();
            for (key, val) in obj {
                map.insert(key.clone(), from_json(val));
            }
            Value::object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn test_scalar_round_trip() {
        for value in [
            Value::Nil,
            Value::Bool(true),
            Value::Number(2.5),
            Value::Str("hi".to_string()),
        ] {
            let json = to_json(&value).unwrap();
            assert_eq!(from_json(&json), value);
        }
    }

    #[test]
    fn test_object_preserves_key_order() {
        let obj = Value::object(indexmap! {
            "z".to_string() => Value::Number(1.0),
            "a".to_string() => Value::Number(2.0),
        });
        let encoded = serde_json::to_string(&to_json(&obj).unwrap()).unwrap();
        assert_eq!(encoded, r#"{"z":1.0,"a":2.0}"#);
    }

    #[test]
    fn test_nested_structures() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"items": [1, "two", null], "ok": true}"#).unwrap();
        let value = from_json(&json);
        match value {
            Value::Object(entries) => {
                let entries = entries.borrow();
                assert!(matches!(entries.get("ok"), Some(Value::Bool(true))));
                match entries.get("items") {
                    Some(Value::Array(items)) => assert_eq!(items.borrow().len(), 3),
                    other => panic!("Expected array, got {:?}", other),
                }
            }
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_functions_are_not_encodable() {
        let func = Value::native("f", |_| Ok(Value::Nil));
        assert!(to_json(&func).is_err());
    }

    #[test]
    fn test_nan_is_not_encodable() {
        assert!(to_json(&Value::Number(f64::NAN)).is_err());
    }
}
