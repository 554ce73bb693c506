//! Endpoint declarations
//!
//! Every endpoint pairs its declared parameters with a plain function that
//! receives the bound values. Handlers only run after binding succeeded.

use hyper::Method;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::ops::Range;

use super::models::{Image, Item, ModelName, Nested, SampleItem, User};
use crate::binding::{Bound, Constraints, ExtractError, Field, FieldType, Model, Param};
use crate::openapi::Example;
use crate::routing::RouteTable;

/// Handler body, invoked with the values produced by binding
pub type Handler = fn(Bound) -> Result<Value, HandlerError>;

/// Failure inside a handler after binding succeeded
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A routable operation: parameters, documentation and handler
pub struct Endpoint {
    pub operation_id: &'static str,
    pub summary: &'static str,
    pub params: Vec<Param>,
    /// Named request body examples for the documentation
    pub body_examples: Vec<Example>,
    pub handler: Handler,
}

impl Endpoint {
    pub fn new(operation_id: &'static str, summary: &'static str, handler: Handler) -> Self {
        Self {
            operation_id,
            summary,
            params: Vec::new(),
            body_examples: Vec::new(),
            handler,
        }
    }

    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn example(mut self, example: Example) -> Self {
        self.body_examples.push(example);
        self
    }
}

/// Build the table of every served endpoint
pub fn routes() -> RouteTable {
    let mut table = RouteTable::new();
    table
        .add(
            Method::GET,
            "/",
            Endpoint::new("read_root", "Read Root", read_root),
        )
        .add(
            Method::GET,
            "/path_parameter/validations/{item_id}",
            Endpoint::new("read_item_validated", "Read Item Validated", read_item_validated)
                .param(Param::path(
                    Field::required("item_id", FieldType::Int)
                        .title("The ID of the item to get")
                        .constrained(Constraints::new().ge(0.0).le(1000.0)),
                ))
                .param(Param::query(Field::required("q", FieldType::Str)))
                .param(Param::query(
                    Field::required("size", FieldType::Float)
                        .constrained(Constraints::new().gt(0.0).lt(10.5)),
                )),
        )
        .add(
            Method::PUT,
            "/items/{item_id}",
            Endpoint::new("update_item", "Update Item", update_item)
                .param(Param::path(Field::required("item_id", FieldType::Int)))
                .param(Param::body(Field::required("item", Item::field_type())))
                .param(Param::body(Field::required("user", User::field_type())))
                .param(Param::body(
                    Field::required("importance", FieldType::Int)
                        .constrained(Constraints::new().gt(0.0)),
                ))
                .param(Param::query(Field::optional("q", FieldType::Str))),
        )
        .add(
            Method::PUT,
            "/embed/{item_id}",
            Endpoint::new("embed_item", "Embed Item", embed_item)
                .param(Param::path(Field::required("item_id", FieldType::Int)))
                .param(Param::body(Field::required("item", Item::field_type())).embed())
                .param(Param::query(Field::optional("q", FieldType::Str))),
        )
        .add(
            Method::GET,
            "/models/{model_name}",
            Endpoint::new("get_model", "Get Model", get_model).param(Param::path(
                Field::required("model_name", FieldType::Enum(ModelName::SCHEMA)),
            )),
        )
        .add(
            Method::GET,
            "/items/",
            Endpoint::new("list_items", "List Items", list_items)
                .param(Param::query(Field::with_default("skip", FieldType::Int, json!(0))))
                .param(Param::query(Field::with_default("limit", FieldType::Int, json!(10)))),
        )
        .add(
            Method::GET,
            "/items/{item_id}",
            Endpoint::new("read_item", "Read Item", read_item)
                .param(Param::path(Field::required("item_id", FieldType::Str)))
                .param(Param::query(Field::optional("q", FieldType::Str)))
                .param(Param::query(Field::with_default(
                    "short",
                    FieldType::Bool,
                    json!(false),
                ))),
        )
        .add(
            Method::POST,
            "/request_body/",
            Endpoint::new("create_item", "Create Item", create_item)
                .param(Param::body(Field::required("item", SampleItem::field_type())))
                .param(Param::body(Field::required("user", User::field_type())))
                .param(Param::body(Field::required("importance", FieldType::Int)))
                .example(Example {
                    name: "normal",
                    summary: "A normal example",
                    description: Some("A **normal** item works correctly."),
                    value: json!({
                        "name": "Foo",
                        "description": "A very nice Item",
                        "price": 35.4,
                        "tax": 3.2,
                    }),
                })
                .example(Example {
                    name: "converted",
                    summary: "An example with converted data",
                    description: Some(
                        "Price `strings` can be converted to actual `numbers` automatically",
                    ),
                    value: json!({"name": "Bar", "price": "35.4"}),
                })
                .example(Example {
                    name: "invalid",
                    summary: "Invalid data is rejected with an error",
                    description: None,
                    value: json!({"name": "Baz", "price": "thirty five point four"}),
                }),
        )
        .add(
            Method::GET,
            "/queryparam/validation",
            Endpoint::new("read_items", "Read Items", read_items).param(
                Param::query(
                    Field::with_default("q", FieldType::list(FieldType::Str), json!([]))
                        .title("Query string")
                        .description(
                            "Query string for the items to search in the database that have a good match",
                        )
                        .deprecated(),
                )
                .alias("item-query"),
            ),
        )
        .add(
            Method::PUT,
            "/nested/model/{item_id}",
            Endpoint::new("update_nested", "Update Nested", update_nested)
                .param(Param::path(Field::required("item_id", FieldType::Int)))
                .param(Param::body(Field::required("item", Nested::field_type())))
                .param(Param::body(Field::required(
                    "image",
                    FieldType::list(Image::field_type()),
                )))
                .param(Param::body(Field::required(
                    "weights",
                    FieldType::map(FieldType::Int, FieldType::Float),
                ))),
        );
    table
}

/// Read-only lookup table served by `GET /items/`
const FAKE_ITEMS: [&str; 3] = ["Foo", "Bar", "Baz"];

const LONG_DESCRIPTION: &str = "This is an amazing item that has a long description";

#[allow(clippy::unnecessary_wraps, clippy::needless_pass_by_value)]
fn read_root(_: Bound) -> Result<Value, HandlerError> {
    Ok(json!({"Hello": "World"}))
}

fn read_item_validated(mut bound: Bound) -> Result<Value, HandlerError> {
    let item_id: i64 = bound.take("item_id")?;
    let q: String = bound.take("q")?;
    Ok(json!({"item_id": item_id, "q": q}))
}

fn update_item(mut bound: Bound) -> Result<Value, HandlerError> {
    let item_id: i64 = bound.take("item_id")?;
    let item: Item = bound.take("item")?;
    let user: User = bound.take("user")?;
    let importance: i64 = bound.take("importance")?;
    let q: Option<String> = bound.take("q")?;

    let mut results = json!({
        "item_id": item_id,
        "item": item,
        "user": user,
        "importance": importance,
    });
    insert_if_present(&mut results, "q", q.filter(|q| !q.is_empty()).map(Value::from));
    Ok(results)
}

fn embed_item(mut bound: Bound) -> Result<Value, HandlerError> {
    let item: Item = bound.take("item")?;
    Ok(serde_json::to_value(item)?)
}

fn get_model(mut bound: Bound) -> Result<Value, HandlerError> {
    let model_name: ModelName = bound.take("model_name")?;
    let message = match model_name {
        ModelName::Alexnet => "Deep Learning FTW!",
        ModelName::Lenet => "LeCNN all the images",
        ModelName::Resnet => "Have some residuals",
    };
    Ok(json!({"model_name": model_name.value(), "message": message}))
}

fn list_items(mut bound: Bound) -> Result<Value, HandlerError> {
    let skip: i64 = bound.take("skip")?;
    let limit: i64 = bound.take("limit")?;
    let items: Vec<Value> = FAKE_ITEMS[slice_range(FAKE_ITEMS.len(), skip, skip.saturating_add(limit))]
        .iter()
        .map(|name| json!({"item_name": name}))
        .collect();
    Ok(Value::Array(items))
}

fn read_item(mut bound: Bound) -> Result<Value, HandlerError> {
    let item_id: String = bound.take("item_id")?;
    let q: Option<String> = bound.take("q")?;
    let short: bool = bound.take("short")?;

    let mut item = json!({"item_id": item_id});
    insert_if_present(&mut item, "q", q.filter(|q| !q.is_empty()).map(Value::from));
    if !short {
        insert_if_present(&mut item, "description", Some(Value::from(LONG_DESCRIPTION)));
    }
    Ok(item)
}

fn create_item(mut bound: Bound) -> Result<Value, HandlerError> {
    let item: SampleItem = bound.take("item")?;
    Ok(serde_json::to_value(item)?)
}

fn read_items(mut bound: Bound) -> Result<Value, HandlerError> {
    let q: Vec<String> = bound.take("q")?;
    let mut results = json!({"items": [{"item_id": "Foo"}, {"item_id": "Bar"}]});
    insert_if_present(&mut results, "q", (!q.is_empty()).then(|| json!(q)));
    Ok(results)
}

fn update_nested(mut bound: Bound) -> Result<Value, HandlerError> {
    let _item: Nested = bound.take("item")?;
    let _images: Vec<Image> = bound.take("image")?;
    let weights: IndexMap<i64, f64> = bound.take("weights")?;
    Ok(serde_json::to_value(weights)?)
}

fn insert_if_present(target: &mut Value, key: &str, value: Option<Value>) {
    if let (Value::Object(map), Some(value)) = (target, value) {
        map.insert(key.to_string(), value);
    }
}

/// Sequence slice `[start:stop]` over `len` elements
///
/// Negative bounds count from the end; out-of-range bounds clamp.
fn slice_range(len: usize, start: i64, stop: i64) -> Range<usize> {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let clamp = |index: i64| {
        let index = if index < 0 { index.saturating_add(len_i) } else { index };
        usize::try_from(index.clamp(0, len_i)).unwrap_or(len)
    };
    let (start, stop) = (clamp(start), clamp(stop));
    start..stop.max(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{bind, RawRequest};
    use crate::routing::Lookup;

    fn call(method: Method, path: &str, query: Option<&str>, body: &[u8]) -> Value {
        let table = routes();
        let Lookup::Found { route, path_params } = table.lookup(&method, path) else {
            panic!("no route for {method} {path}");
        };
        let raw = RawRequest::new(path_params, query, body);
        let bound = bind(&route.endpoint.params, &raw).unwrap();
        (route.endpoint.handler)(bound).unwrap()
    }

    #[test]
    fn test_slice_range() {
        assert_eq!(slice_range(3, 0, 10), 0..3);
        assert_eq!(slice_range(3, 1, 2), 1..2);
        assert_eq!(slice_range(3, -1, 9), 2..3);
        assert_eq!(slice_range(3, 0, -1), 0..2);
        assert_eq!(slice_range(3, 2, 1), 2..2);
        assert_eq!(slice_range(3, 7, 20), 3..3);
        assert_eq!(slice_range(3, -10, 1), 0..1);
    }

    #[test]
    fn test_list_items_slices() {
        let value = call(Method::GET, "/items/", Some("skip=1&limit=1"), b"");
        assert_eq!(value, json!([{"item_name": "Bar"}]));

        let value = call(Method::GET, "/items/", None, b"");
        assert_eq!(value.as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_model_messages() {
        let expected = [
            ("alexnet", "Deep Learning FTW!"),
            ("lenet", "LeCNN all the images"),
            ("resnet", "Have some residuals"),
        ];
        for (name, message) in expected {
            let value = call(Method::GET, &format!("/models/{name}"), None, b"");
            assert_eq!(value, json!({"model_name": name, "message": message}));
        }
    }

    #[test]
    fn test_read_item_short_and_long() {
        let value = call(Method::GET, "/items/abc", Some("short=true"), b"");
        assert_eq!(value, json!({"item_id": "abc"}));

        let value = call(Method::GET, "/items/abc", Some("q=x"), b"");
        assert_eq!(
            value,
            json!({"item_id": "abc", "q": "x", "description": LONG_DESCRIPTION})
        );
    }

    #[test]
    fn test_update_item_nests_bodies() {
        let body = br#"{
            "item": {"name": "Foo", "price": 3},
            "user": {"username": "dave"},
            "importance": 5
        }"#;
        let value = call(Method::PUT, "/items/3", Some("q="), body);
        assert_eq!(
            value,
            json!({
                "item_id": 3,
                "item": {"name": "Foo", "price": 3.0, "is_offer": null},
                "user": {"username": "dave", "full_name": null},
                "importance": 5
            })
        );
    }

    #[test]
    fn test_update_nested_returns_weights() {
        let body = br#"{
            "item": {"name": "Foo", "price": 1},
            "image": [],
            "weights": {"1": 0.5, "02": "2"}
        }"#;
        let value = call(Method::PUT, "/nested/model/1", None, body);
        assert_eq!(value, json!({"1": 0.5, "2": 2.0}));
    }

    #[test]
    fn test_read_items_echoes_aliases() {
        let value = call(
            Method::GET,
            "/queryparam/validation",
            Some("item-query=foo&item-query=bar"),
            b"",
        );
        assert_eq!(value["q"], json!(["foo", "bar"]));

        let value = call(Method::GET, "/queryparam/validation", None, b"");
        assert!(value.get("q").is_none());
    }
}
