//! Data records accepted and returned by the endpoints
//!
//! Each record pairs a serde representation with the [`RecordSchema`] the
//! binder validates against. Field order is the serialization order.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::binding::{Constraints, EnumSchema, Field, FieldType, Model, RecordSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub price: f64,
    pub is_offer: Option<bool>,
}

impl Model for Item {
    fn schema() -> RecordSchema {
        RecordSchema::new(
            "Item",
            vec![
                Field::required("name", FieldType::Str),
                Field::required("price", FieldType::Float),
                Field::optional("is_offer", FieldType::Bool),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub full_name: Option<String>,
}

impl Model for User {
    fn schema() -> RecordSchema {
        RecordSchema::new(
            "User",
            vec![
                Field::required("username", FieldType::Str),
                Field::optional("full_name", FieldType::Str),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleItem {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub tags: IndexSet<String>,
    pub my_list: Vec<String>,
}

impl Model for SampleItem {
    fn schema() -> RecordSchema {
        RecordSchema::new(
            "SampleItem",
            vec![
                Field::required("name", FieldType::Str),
                Field::optional("description", FieldType::Str)
                    .title("The description of the item")
                    .constrained(Constraints::new().max_length(300)),
                Field::required("price", FieldType::Float)
                    .description("The price must be greater than zero")
                    .constrained(Constraints::new().gt(0.0)),
                Field::required("tags", FieldType::set(FieldType::Str)),
                Field::with_default("my_list", FieldType::list(FieldType::Str), json!([])),
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub name: String,
}

impl Model for Image {
    fn schema() -> RecordSchema {
        RecordSchema::new(
            "Image",
            vec![
                Field::required("url", FieldType::Url),
                Field::required("name", FieldType::Str),
            ],
        )
    }
}

/// Item with nested images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nested {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub tax: Option<f64>,
    pub tags: IndexSet<String>,
    pub image: Option<Vec<Image>>,
}

impl Model for Nested {
    fn schema() -> RecordSchema {
        RecordSchema::new(
            "Nested",
            vec![
                Field::required("name", FieldType::Str),
                Field::optional("description", FieldType::Str),
                Field::required("price", FieldType::Float),
                Field::optional("tax", FieldType::Float),
                Field::with_default("tags", FieldType::set(FieldType::Str), json!([])),
                Field::optional("image", FieldType::list(Image::field_type())),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelName {
    Alexnet,
    Resnet,
    Lenet,
}

impl ModelName {
    pub const SCHEMA: EnumSchema = EnumSchema {
        name: "ModelName",
        values: &["alexnet", "resnet", "lenet"],
    };

    pub const fn value(self) -> &'static str {
        match self {
            Self::Alexnet => "alexnet",
            Self::Resnet => "resnet",
            Self::Lenet => "lenet",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{validate, Loc, Source, ValidationErrors};
    use serde_json::Value;

    fn check<M: Model>(input: Value) -> Result<M, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let value = validate(
            &M::field_type(),
            &Constraints::default(),
            &input,
            &Loc::root(Source::Body),
            &mut errors,
        );
        match value {
            Some(value) if errors.is_empty() => Ok(serde_json::from_value(value).unwrap()),
            _ => Err(errors),
        }
    }

    #[test]
    fn test_schema_matches_serde_fields() {
        fn keys<M: Model>(sample: &M) -> (Vec<String>, Vec<&'static str>) {
            let value = serde_json::to_value(sample).unwrap();
            let serde_keys = value.as_object().unwrap().keys().cloned().collect();
            let schema_keys = M::schema().fields.iter().map(|f| f.name).collect();
            (serde_keys, schema_keys)
        }

        let nested = check::<Nested>(json!({"name": "n", "price": 1})).unwrap();
        let (serde_keys, schema_keys) = keys(&nested);
        assert_eq!(serde_keys, schema_keys);

        let item = check::<Item>(json!({"name": "n", "price": 1})).unwrap();
        let (serde_keys, schema_keys) = keys(&item);
        assert_eq!(serde_keys, schema_keys);

        let sample = check::<SampleItem>(json!({"name": "n", "price": 1, "tags": ["a"]})).unwrap();
        let (serde_keys, schema_keys) = keys(&sample);
        assert_eq!(serde_keys, schema_keys);

        let user = check::<User>(json!({"username": "u"})).unwrap();
        let (serde_keys, schema_keys) = keys(&user);
        assert_eq!(serde_keys, schema_keys);

        let image = check::<Image>(json!({"url": "http://example.com", "name": "i"})).unwrap();
        let (serde_keys, schema_keys) = keys(&image);
        assert_eq!(serde_keys, schema_keys);
    }

    #[test]
    fn test_sample_item_defaults() {
        let item = check::<SampleItem>(json!({"name": "Foo", "price": 35.4, "tags": []})).unwrap();
        assert!(item.my_list.is_empty());
        assert!(item.description.is_none());
    }

    #[test]
    fn test_sample_item_rejections() {
        let errors = check::<SampleItem>(json!({"name": "Foo", "price": 0, "tags": []})).unwrap_err();
        assert_eq!(errors.iter().next().unwrap().kind.code(), "greater_than");

        let errors = check::<SampleItem>(json!({"name": "Foo", "price": 1})).unwrap_err();
        assert_eq!(errors.iter().next().unwrap().kind.code(), "missing");

        let long = "x".repeat(301);
        let errors =
            check::<SampleItem>(json!({"name": "Foo", "price": 1, "tags": [], "description": long}))
                .unwrap_err();
        assert_eq!(errors.iter().next().unwrap().kind.code(), "string_too_long");
    }

    #[test]
    fn test_nested_images() {
        let nested = check::<Nested>(json!({
            "name": "Foo",
            "price": 1.0,
            "tags": ["a", "a", "b"],
            "image": [{"url": "https://example.com/a.png", "name": "a"}]
        }))
        .unwrap();
        assert_eq!(nested.tags.len(), 2);
        assert_eq!(nested.image.unwrap()[0].url, "https://example.com/a.png");

        let errors = check::<Nested>(json!({
            "name": "Foo",
            "price": 1.0,
            "image": [{"url": "not a url", "name": "a"}]
        }))
        .unwrap_err();
        let error = errors.iter().next().unwrap();
        assert_eq!(
            serde_json::to_value(&error.loc).unwrap(),
            json!(["body", "image", 0, "url"])
        );
    }

    #[test]
    fn test_model_name_values_match_serde() {
        for value in ModelName::SCHEMA.values {
            let parsed: ModelName = serde_json::from_value(json!(value)).unwrap();
            assert_eq!(parsed.value(), *value);
        }
    }
}
