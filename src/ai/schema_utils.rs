//! Reduces a schemars schema to the OpenAPI subset Gemini accepts as `responseSchema`.

use schemars::JsonSchema;
use schemars::schema_for;
use serde_json::{Map, Value, json};

/// Keywords Gemini rejects in strict mode.
const UNSUPPORTED_KEYS: &[&str] = &[
    "$schema",
    "$id",
    "$ref",
    "title",
    "default",
    "examples",
    "format",
    "additionalProperties",
    "definitions",
    "$defs",
];

const MAX_DEPTH: usize = 16;
const MAX_REF_HOPS: usize = 8;

/// Builds the response schema for `T`, returning it alongside its pretty-printed raw form
/// (the raw text goes into the prompt, the cleaned value into the request).
pub fn response_schema<T: JsonSchema>() -> serde_json::Result<(Value, String)> {
    let raw = serde_json::to_value(schema_for!(T))?;
    let raw_text = serde_json::to_string_pretty(&raw)?;
    Ok((clean_schema(raw), raw_text))
}

pub fn clean_schema(mut root: Value) -> Value {
    let definitions = root
        .get("definitions")
        .or_else(|| root.get("$defs"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Cleaner { definitions }.visit(&mut root, 0);
    root
}

struct Cleaner {
    definitions: Map<String, Value>,
}

impl Cleaner {
    fn visit(&self, node: &mut Value, depth: usize) {
        if depth > MAX_DEPTH {
            *node = json!({ "type": "object", "nullable": true });
            return;
        }

        self.inline_refs(node);

        // schemars emits `true` for "anything"; Gemini needs a typed node.
        if let Value::Bool(any) = node {
            *node = if *any {
                json!({ "type": "string", "nullable": true })
            } else {
                json!({ "not": {} })
            };
        }

        match node {
            Value::Object(map) => {
                for key in UNSUPPORTED_KEYS {
                    map.remove(*key);
                }
                collapse_type_array(map);

                if let Some(Value::Object(props)) = map.get_mut("properties") {
                    for prop in props.values_mut() {
                        self.visit(prop, depth + 1);
                    }
                }
                if let Some(items) = map.get_mut("items") {
                    self.visit(items, depth + 1);
                }
                for key in ["allOf", "anyOf", "oneOf"] {
                    if let Some(Value::Array(branches)) = map.get_mut(key) {
                        for branch in branches {
                            self.visit(branch, depth + 1);
                        }
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item, depth + 1);
                }
            }
            _ => {}
        }
    }

    fn inline_refs(&self, node: &mut Value) {
        for _ in 0..MAX_REF_HOPS {
            let Some(target) = node.get("$ref").and_then(Value::as_str) else {
                return;
            };
            let name = target.rsplit('/').next().unwrap_or_default();
            match self.definitions.get(name) {
                Some(def) => *node = def.clone(),
                None => {
                    *node = json!({ "type": "object", "description": "Unresolvable reference" });
                    return;
                }
            }
        }
    }
}

/// `["string", "null"]` becomes `"string"` plus `nullable`; other unions keep their first type.
fn collapse_type_array(map: &mut Map<String, Value>) {
    let Some(Value::Array(types)) = map.get("type") else {
        return;
    };
    let nullable = types.iter().any(|t| t == "null");
    let Some(primary) = types.iter().find(|t| *t != "null").cloned() else {
        return;
    };
    map.insert("type".into(), primary);
    if nullable {
        map.insert("nullable".into(), json!(true));
    }
}
