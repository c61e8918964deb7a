//! Helpers for reading Neovim replies out of msgpack values.

use rmpv::Value;

/// msgpack ext type used by Neovim for `Buffer` handles.
pub const EXT_BUFFER: i8 = 0;
/// msgpack ext type used by Neovim for `Window` handles.
pub const EXT_WINDOW: i8 = 1;
/// msgpack ext type used by Neovim for `Tabpage` handles.
pub const EXT_TABPAGE: i8 = 2;

/// Numeric id of a handle.
///
/// Neovim returns buffers, windows and tabpages as ext values whose payload
/// is a msgpack-encoded integer; plain integers are accepted too.
pub fn handle_id(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(_) => value.as_i64(),
        Value::Ext(_, payload) => rmpv::decode::read_value(&mut &payload[..])
            .ok()
            .and_then(|inner| inner.as_i64()),
        _ => None,
    }
}

/// Build an ext handle value.
pub fn ext_handle(kind: i8, id: i64) -> Value {
    let mut payload = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = rmpv::encode::write_value(&mut payload, &Value::from(id));
    Value::Ext(kind, payload)
}

/// Look up a string key in a msgpack map.
pub fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_map()?
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

/// Build a msgpack map from string keys.
pub fn map<I>(entries: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::from(k), v))
            .collect(),
    )
}

/// Convert a msgpack value into JSON.
///
/// Handles become their numeric id; binary data is rendered lossily as UTF-8.
pub fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Nil => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(i) => match (i.as_i64(), i.as_u64()) {
            (Some(n), _) => Json::from(n),
            (None, Some(n)) => Json::from(n),
            _ => Json::Null,
        },
        Value::F32(f) => Json::from(f64::from(*f)),
        Value::F64(f) => Json::from(*f),
        Value::String(s) => Json::String(s.as_str().map(str::to_string).unwrap_or_else(|| {
            String::from_utf8_lossy(s.as_bytes()).into_owned()
        })),
        Value::Binary(bytes) => Json::String(String::from_utf8_lossy(bytes).into_owned()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| {
                    let key = k.as_str().map(str::to_string).unwrap_or_else(|| k.to_string());
                    (key, to_json(v))
                })
                .collect(),
        ),
        Value::Ext(..) => handle_id(value).map(Json::from).unwrap_or(Json::Null),
    }
}

/// Human-readable text of a Neovim error response.
///
/// Errors arrive as `[type, message]`.
pub fn error_message(error: &Value) -> String {
    match error {
        Value::Array(items) => items
            .get(1)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        Value::String(s) => s.as_str().map(str::to_string).unwrap_or_default(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip() {
        let handle = ext_handle(EXT_WINDOW, 1001);
        assert!(matches!(handle, Value::Ext(EXT_WINDOW, _)));
        assert_eq!(handle_id(&handle), Some(1001));
        assert_eq!(handle_id(&Value::from(4)), Some(4));
        assert_eq!(handle_id(&Value::from("4")), None);
    }

    #[test]
    fn test_map_get() {
        let value = map([("mode", Value::from("n")), ("blocking", Value::Boolean(false))]);
        assert_eq!(map_get(&value, "mode").and_then(Value::as_str), Some("n"));
        assert_eq!(map_get(&value, "missing"), None);
        assert_eq!(map_get(&Value::Nil, "mode"), None);
    }

    #[test]
    fn test_to_json_layout() {
        let layout = Value::Array(vec![
            Value::from("row"),
            Value::Array(vec![
                Value::Array(vec![Value::from("leaf"), ext_handle(EXT_WINDOW, 1000)]),
                Value::Array(vec![Value::from("leaf"), Value::from(1001)]),
            ]),
        ]);
        assert_eq!(
            to_json(&layout),
            serde_json::json!(["row", [["leaf", 1000], ["leaf", 1001]]])
        );
        assert_eq!(
            to_json(&map([("ok", Value::Boolean(true))])),
            serde_json::json!({"ok": true})
        );
    }

    #[test]
    fn test_error_message() {
        let error = Value::Array(vec![
            Value::from(0),
            Value::from("Vim:E492: Not an editor command: foo"),
        ]);
        assert_eq!(error_message(&error), "Vim:E492: Not an editor command: foo");
        assert_eq!(error_message(&Value::from("plain")), "plain");
    }
}
