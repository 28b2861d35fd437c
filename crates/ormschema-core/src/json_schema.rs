//! JSON Schema output for generated schemas.
//!
//! Nested schemas and choice enumerations are emitted once under
//! `definitions` and referenced with `$ref`. Properties are keyed by alias.

use serde_json::{Map, Value as Json, json};

use crate::field::{DefaultValue, FieldType};
use crate::schema::SchemaType;
use crate::validate::{URL_MAX_LENGTH, URL_MIN_LENGTH};

const DEFINITIONS_REF: &str = "#/definitions/";

impl SchemaType {
    /// JSON Schema document describing this schema.
    #[must_use]
    pub fn json_schema(&self) -> Json {
        let mut definitions = Map::new();
        let mut root = object_schema(self, &mut definitions);
        if !definitions.is_empty() {
            root.insert("definitions".to_string(), Json::Object(definitions));
        }
        Json::Object(root)
    }
}

fn object_schema(schema: &SchemaType, definitions: &mut Map<String, Json>) -> Map<String, Json> {
    let mut out = Map::new();
    out.insert("title".to_string(), json!(schema.name()));

    if schema.is_custom_root() {
        if let Some(root) = schema.fields().first() {
            out.extend(type_schema(&root.ty, definitions, true));
        }
        return out;
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in schema.fields() {
        let key = field.output_name(true).to_string();
        let mut property = Map::new();
        property.insert("title".to_string(), json!(field.title()));
        if let Some(description) = &field.info.description {
            property.insert("description".to_string(), json!(description));
        }
        if let DefaultValue::Value(default) = &field.info.default {
            if !default.is_null() {
                property.insert("default".to_string(), default.to_json());
            }
        }
        property.extend(type_schema(&field.ty, definitions, true));
        if let Some(max_length) = field.info.max_length {
            property.insert("maxLength".to_string(), json!(max_length));
        }
        if field.is_required() {
            required.push(Json::String(key.clone()));
        }
        properties.insert(key, Json::Object(property));
    }

    out.insert("type".to_string(), json!("object"));
    out.insert("properties".to_string(), Json::Object(properties));
    if !required.is_empty() {
        out.insert("required".to_string(), Json::Array(required));
    }
    out
}

/// Schema keywords for one type. Referenced definitions are wrapped in
/// `allOf` at property level so siblings like `title` stay valid.
fn type_schema(ty: &FieldType, definitions: &mut Map<String, Json>, top_level: bool) -> Map<String, Json> {
    let simple = |kind: &str, format: Option<&str>| {
        let mut m = Map::new();
        m.insert("type".to_string(), json!(kind));
        if let Some(format) = format {
            m.insert("format".to_string(), json!(format));
        }
        m
    };

    match ty {
        FieldType::Str => simple("string", None),
        FieldType::Int => simple("integer", None),
        FieldType::Float | FieldType::Decimal => simple("number", None),
        FieldType::Bool => simple("boolean", None),
        FieldType::Bytes => simple("string", Some("binary")),
        FieldType::Date => simple("string", Some("date")),
        FieldType::DateTime => simple("string", Some("date-time")),
        FieldType::Time => simple("string", Some("time")),
        FieldType::Duration => simple("number", Some("time-delta")),
        FieldType::Uuid => simple("string", Some("uuid")),
        FieldType::Email => simple("string", Some("email")),
        FieldType::Url => {
            let mut m = simple("string", Some("uri"));
            m.insert("minLength".to_string(), json!(URL_MIN_LENGTH));
            m.insert("maxLength".to_string(), json!(URL_MAX_LENGTH));
            m
        }
        FieldType::IpAddr => simple("string", Some("ipvanyaddress")),
        FieldType::Json => simple("string", Some("json-string")),
        FieldType::Any => Map::new(),
        FieldType::Enum(choices) => {
            if !definitions.contains_key(choices.name()) {
                let values: Vec<Json> = choices.values().map(|v| v.to_json()).collect();
                definitions.insert(
                    choices.name().to_string(),
                    json!({
                        "title": choices.name(),
                        "description": "An enumeration.",
                        "enum": values,
                    }),
                );
            }
            reference(choices.name(), top_level)
        }
        FieldType::Schema(nested) => {
            if !definitions.contains_key(nested.name()) {
                // Placeholder first so cyclic schemas terminate.
                definitions.insert(nested.name().to_string(), Json::Null);
                let body = object_schema(nested, definitions);
                definitions.insert(nested.name().to_string(), Json::Object(body));
            }
            reference(nested.name(), top_level)
        }
        FieldType::PkRef(inner) | FieldType::Optional(inner) => type_schema(inner, definitions, top_level),
        FieldType::List(inner) => {
            let mut m = simple("array", None);
            m.insert(
                "items".to_string(),
                Json::Object(type_schema(inner, definitions, false)),
            );
            m
        }
    }
}

fn reference(name: &str, top_level: bool) -> Map<String, Json> {
    let target = json!({ "$ref": format!("{DEFINITIONS_REF}{name}") });
    let mut m = Map::new();
    if top_level {
        m.insert("allOf".to_string(), json!([target]));
    } else if let Json::Object(inner) = target {
        m = inner;
    }
    m
}
