//! JSON Schema rendering of binding schemas
//!
//! Records and enumerations are registered once under
//! `components.schemas` and referenced with `$ref` everywhere else.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::binding::{Constraints, Field, FieldType, RecordSchema};

const REF_PREFIX: &str = "#/components/schemas/";

/// Named schemas collected while rendering
#[derive(Debug, Default)]
pub struct Components {
    schemas: BTreeMap<String, Value>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Register a named schema and return a reference to it
    pub fn insert(&mut self, name: &str, schema: Value) -> Value {
        self.schemas.insert(name.to_string(), schema);
        reference(name)
    }

    /// Register a record and everything it refers to
    pub fn record(&mut self, schema: &RecordSchema) -> Value {
        if !self.contains(schema.name) {
            // Placeholder first so self-referencing records terminate
            self.schemas.insert(schema.name.to_string(), Value::Null);
            let rendered = object_schema(schema.name, &schema.fields, self);
            self.schemas.insert(schema.name.to_string(), rendered);
        }
        reference(schema.name)
    }

    /// Sorted by name
    pub fn into_value(self) -> Value {
        Value::Object(self.schemas.into_iter().collect())
    }
}

pub fn reference(name: &str) -> Value {
    json!({ "$ref": format!("{REF_PREFIX}{name}") })
}

/// `item_id` becomes `Item Id`
pub fn default_title(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Object schema with one property per field
pub fn object_schema(title: &str, fields: &[Field], components: &mut Components) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        properties.insert(field.name.to_string(), field_schema(field, components));
        if field.is_required() {
            required.push(Value::from(field.name));
        }
    }

    let mut schema = Map::new();
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("type".into(), json!("object"));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    schema.insert("title".into(), Value::from(title));
    Value::Object(schema)
}

/// Schema of a field: its type, constraints, title, description and default
pub fn field_schema(field: &Field, components: &mut Components) -> Value {
    let mut schema = into_map(constrained_schema(&field.ty, &field.constraints, components));

    let title = field
        .docs
        .title
        .map_or_else(|| default_title(field.name), ToString::to_string);
    schema.insert("title".into(), Value::from(title));
    if let Some(description) = field.docs.description {
        schema.insert("description".into(), Value::from(description));
    }
    if let Some(default) = &field.default {
        schema.insert("default".into(), default.clone());
    }
    Value::Object(schema)
}

/// Type schema with constraints applied to the non-null branch
fn constrained_schema(ty: &FieldType, constraints: &Constraints, components: &mut Components) -> Value {
    if let FieldType::Optional(inner) = ty {
        return json!({
            "anyOf": [constrained_schema(inner, constraints, components), {"type": "null"}]
        });
    }

    let mut schema = into_map(type_schema(ty, components));
    if let Some(gt) = constraints.gt {
        schema.insert("exclusiveMinimum".into(), gt.to_json());
    }
    if let Some(ge) = constraints.ge {
        schema.insert("minimum".into(), ge.to_json());
    }
    if let Some(lt) = constraints.lt {
        schema.insert("exclusiveMaximum".into(), lt.to_json());
    }
    if let Some(le) = constraints.le {
        schema.insert("maximum".into(), le.to_json());
    }
    if let Some(min) = constraints.min_length {
        schema.insert("minLength".into(), Value::from(min));
    }
    if let Some(max) = constraints.max_length {
        schema.insert("maxLength".into(), Value::from(max));
    }
    if let Some(pattern) = &constraints.pattern {
        schema.insert("pattern".into(), Value::from(pattern.as_str()));
    }
    Value::Object(schema)
}

/// Bare schema of a type
pub fn type_schema(ty: &FieldType, components: &mut Components) -> Value {
    match ty {
        FieldType::Str => json!({"type": "string"}),
        FieldType::Int => json!({"type": "integer"}),
        FieldType::Float => json!({"type": "number"}),
        FieldType::Bool => json!({"type": "boolean"}),
        FieldType::Url => json!({"type": "string", "format": "uri", "minLength": 1}),
        FieldType::Enum(schema) => components.insert(
            schema.name,
            json!({"type": "string", "enum": schema.values, "title": schema.name}),
        ),
        FieldType::List(item) => json!({"type": "array", "items": type_schema(item, components)}),
        FieldType::Set(item) => json!({
            "type": "array",
            "items": type_schema(item, components),
            "uniqueItems": true
        }),
        FieldType::Map(_, value) => json!({
            "type": "object",
            "additionalProperties": type_schema(value, components)
        }),
        FieldType::Record(schema) => components.record(schema),
        FieldType::Optional(inner) => {
            json!({"anyOf": [type_schema(inner, components), {"type": "null"}]})
        }
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("allOf".into(), Value::Array(vec![other]));
            map
        }
    }
}
