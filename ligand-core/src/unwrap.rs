use crate::value::{Mapping, Value};

/// Expands delimited compound keys into nested maps.
///
/// `{"author.name": "Ada", "author.born": 1815}` becomes
/// `{"author": {"name": "Ada", "born": 1815}}`. When a plain key and dotted
/// keys share a prefix the two maps are merged; on a scalar conflict the later
/// entry wins. Keys with an empty segment (`"a..b"`, `".a"`) are kept verbatim.
///
/// Only the top level is unwrapped. The mapper unwraps again at every nested
/// level it descends into.
pub fn unwrap(source: Mapping, delimiter: &str) -> Mapping {
    if delimiter.is_empty() {
        return source;
    }

    let mut out = Mapping::with_capacity(source.len());
    for (key, value) in source {
        if !key.contains(delimiter) || key.split(delimiter).any(str::is_empty) {
            insert(&mut out, key, value);
            continue;
        }

        let mut segments: Vec<&str> = key.split(delimiter).collect();
        let mut nested = value;
        while segments.len() > 1 {
            let Some(last) = segments.pop() else { break };
            let mut wrapper = Mapping::with_capacity(1);
            wrapper.insert(last.to_string(), nested);
            nested = Value::Map(wrapper);
        }
        insert(&mut out, segments[0].to_string(), nested);
    }
    out
}

fn insert(out: &mut Mapping, key: String, value: Value) {
    let Value::Map(incoming) = value else {
        out.insert(key, value);
        return;
    };
    if let Some(Value::Map(existing)) = out.get_mut(&key) {
        merge(existing, incoming);
        return;
    }
    out.insert(key, Value::Map(incoming));
}

fn merge(target: &mut Mapping, incoming: Mapping) {
    for (key, value) in incoming {
        insert(target, key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(json: serde_json::Value) -> Mapping {
        match serde_json::from_value(json).unwrap() {
            Value::Map(map) => map,
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn expands_dotted_keys() {
        let out = unwrap(mapping(json!({"a.b": 1, "a.c": 2, "d": 3})), ".");
        assert_eq!(out, mapping(json!({"a": {"b": 1, "c": 2}, "d": 3})));
    }

    #[test]
    fn expands_deep_paths() {
        let out = unwrap(mapping(json!({"a.b.c.d": "x"})), ".");
        assert_eq!(out, mapping(json!({"a": {"b": {"c": {"d": "x"}}}})));
    }

    /// Parses straight into `Mapping`, keeping the key order of `text`.
    fn ordered(text: &str) -> Mapping {
        match serde_json::from_str(text).unwrap() {
            Value::Map(map) => map,
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn merges_with_plain_map_in_either_order() {
        let first = unwrap(ordered(r#"{"a": {"x": 1}, "a.y": 2}"#), ".");
        let second = unwrap(ordered(r#"{"a.y": 2, "a": {"x": 1}}"#), ".");

        let expected = json_value(json!({"x": 1, "y": 2}));
        assert_eq!(first["a"], expected);
        assert_eq!(second["a"], expected);

        let keys = |out: &Mapping| -> Vec<String> { out["a"].as_map().unwrap().keys().cloned().collect() };
        assert_eq!(keys(&first), ["x", "y"]);
        assert_eq!(keys(&second), ["y", "x"]);
    }

    #[test]
    fn later_scalar_wins() {
        let out = unwrap(ordered(r#"{"a.b": 1, "a": 5}"#), ".");
        assert_eq!(out["a"], Value::Int(5));

        let out = unwrap(ordered(r#"{"a": 5, "a.b": 1}"#), ".");
        assert_eq!(out["a"], json_value(json!({"b": 1})));
    }

    #[test]
    fn keeps_keys_with_empty_segments() {
        let out = unwrap(mapping(json!({"a..b": 1, ".c": 2})), ".");
        assert_eq!(out, mapping(json!({"a..b": 1, ".c": 2})));
    }

    #[test]
    fn custom_and_empty_delimiters() {
        let out = unwrap(mapping(json!({"a/b": 1})), "/");
        assert_eq!(out, mapping(json!({"a": {"b": 1}})));

        let untouched = unwrap(mapping(json!({"a.b": 1})), "");
        assert_eq!(untouched, mapping(json!({"a.b": 1})));
    }

    fn json_value(json: serde_json::Value) -> Value {
        serde_json::from_value(json).unwrap()
    }
}
