//! MCP tool descriptor -> LLM function-call descriptor translation.
//!
//! Servers advertise input schemas in several shapes: a canonical JSON-Schema
//! object, a list of parameter records, an object that carries its schema
//! under a `schema` key, or nothing at all. Translation is total; descriptors
//! whose final shape fails [`validate`] are dropped from the catalog and
//! logged.

use serde_json::{json, Map, Value};
use tracing::warn;

use dispatch_core::ToolSchema;

use crate::protocol::models::McpToolInfo;

/// The recognized raw-schema shapes.
enum RawSchema<'a> {
    /// A JSON-Schema object (possibly incomplete).
    Object(&'a Map<String, Value>),
    /// A list of `{name, type, description, required}` records.
    ParamList(&'a Vec<Value>),
    /// An object carrying its schema under a `schema` key.
    Emitter(&'a Map<String, Value>),
    /// No schema advertised.
    Absent,
    /// A shape we cannot classify; passed through so validation rejects it.
    Unclassifiable(&'a Value),
}

fn classify(raw: Option<&Value>) -> RawSchema<'_> {
    match raw {
        None | Some(Value::Null) => RawSchema::Absent,
        Some(Value::Object(map)) => {
            if map.contains_key("type") || map.contains_key("properties") {
                RawSchema::Object(map)
            } else if map.get("schema").map(Value::is_object).unwrap_or(false) {
                RawSchema::Emitter(map)
            } else {
                // Unstructured object: treat as a schema skeleton and fill in
                // permissive defaults.
                RawSchema::Object(map)
            }
        }
        Some(Value::Array(items)) => RawSchema::ParamList(items),
        Some(other) => RawSchema::Unclassifiable(other),
    }
}

/// Translate one MCP descriptor into the function-calling shape.
///
/// Never fails: unusable inputs yield either the permissive default (absent
/// schema) or a descriptor that [`validate`] will reject (foreign scalar
/// shapes).
pub fn translate(info: &McpToolInfo) -> ToolSchema {
    let parameters = match classify(info.input_schema.as_ref()) {
        RawSchema::Object(map) => object_schema(map.clone(), !is_structured(map)),
        RawSchema::Emitter(map) => match map.get("schema") {
            Some(Value::Object(inner)) => object_schema(inner.clone(), !is_structured(inner)),
            _ => permissive_default(),
        },
        RawSchema::ParamList(items) => schema_from_param_list(items),
        RawSchema::Absent => permissive_default(),
        RawSchema::Unclassifiable(value) => value.clone(),
    };

    ToolSchema::function(&info.name, &info.description, parameters)
}

fn is_structured(map: &Map<String, Value>) -> bool {
    map.contains_key("type") || map.contains_key("properties")
}

/// Fill the defaults on a pass-through object schema.
fn object_schema(mut map: Map<String, Value>, permissive: bool) -> Value {
    map.entry("type".to_string())
        .or_insert_with(|| json!("object"));

    if !map.get("properties").map(Value::is_object).unwrap_or(false) {
        map.insert("properties".to_string(), json!({}));
    }

    if !map.contains_key("required") {
        let keys: Vec<Value> = map
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().map(Value::String).collect())
            .unwrap_or_default();
        map.insert("required".to_string(), Value::Array(keys));
    }

    if permissive && !map.contains_key("additionalProperties") {
        map.insert("additionalProperties".to_string(), json!(true));
    }

    Value::Object(map)
}

fn schema_from_param_list(items: &[Value]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for item in items {
        let Some(record) = item.as_object() else {
            continue;
        };
        let Some(name) = record.get("name").and_then(Value::as_str) else {
            continue;
        };

        let mut property = Map::new();
        property.insert(
            "type".to_string(),
            record.get("type").cloned().unwrap_or_else(|| json!("string")),
        );
        if let Some(description) = record.get("description") {
            property.insert("description".to_string(), description.clone());
        }
        properties.insert(name.to_string(), Value::Object(property));

        // Required unless the record explicitly says otherwise.
        if record
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(true)
        {
            required.push(Value::String(name.to_string()));
        }
    }

    json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": Value::Array(required),
    })
}

fn permissive_default() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": [],
        "additionalProperties": true,
    })
}

/// Check the final descriptor shape before it is admitted to the catalog.
pub fn validate(schema: &ToolSchema) -> bool {
    schema.schema_type == "function"
        && !schema.function.name.is_empty()
        && schema
            .function
            .parameters
            .get("type")
            .and_then(Value::as_str)
            == Some("object")
        && schema
            .function
            .parameters
            .get("properties")
            .map(Value::is_object)
            .unwrap_or(false)
}

/// Translate a full tool listing, dropping descriptors that fail validation.
pub fn translate_catalog(infos: &[McpToolInfo]) -> Vec<ToolSchema> {
    infos
        .iter()
        .filter_map(|info| {
            let schema = translate(info);
            if validate(&schema) {
                Some(schema)
            } else {
                warn!(
                    "Schema conversion error: dropping tool '{}' with untranslatable schema",
                    info.name
                );
                None
            }
        })
        .collect()
}
