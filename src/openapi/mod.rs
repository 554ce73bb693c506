//! OpenAPI document module
//!
//! Renders the route table as an OpenAPI 3.1 document:
//! - one operation per route, grouped by path template
//! - path and query parameters with their schema and documentation
//! - request bodies, embedded bodies as generated `Body_<operation>` records
//! - named request body examples
//! - the shared validation error response

mod schema;

pub use schema::{default_title, field_schema, type_schema, Components};

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::binding::{body_is_embedded, Param, Source};
use crate::config::DocsConfig;
use crate::handler::Endpoint;
use crate::routing::RouteTable;

/// Named example value shown for a request body
#[derive(Debug, Clone, Serialize)]
pub struct Example {
    #[serde(skip)]
    pub name: &'static str,
    pub summary: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub value: Value,
}

/// Build the OpenAPI document for every route in the table
pub fn build_document(routes: &RouteTable, docs: &DocsConfig) -> Value {
    let mut components = Components::new();
    let mut paths = Map::new();
    let mut validates = false;

    for route in routes.routes() {
        let endpoint = &route.endpoint;
        validates |= !endpoint.params.is_empty();
        let operation = operation(endpoint, &mut components);
        if let Value::Object(item) = paths
            .entry(route.template.as_str())
            .or_insert_with(|| Value::Object(Map::new()))
        {
            item.insert(route.method.as_str().to_ascii_lowercase(), operation);
        }
    }

    if validates {
        components.insert("ValidationError", validation_error_schema());
        components.insert("HTTPValidationError", http_validation_error_schema());
    }

    let mut document = json!({
        "openapi": "3.1.0",
        "info": {"title": docs.title, "version": docs.version},
        "paths": paths,
    });
    if !components.is_empty() {
        document["components"] = json!({"schemas": components.into_value()});
    }
    document
}

fn operation(endpoint: &Endpoint, components: &mut Components) -> Value {
    let mut operation = Map::new();
    operation.insert("summary".into(), Value::from(endpoint.summary));
    operation.insert("operationId".into(), Value::from(endpoint.operation_id));

    let parameters: Vec<Value> = endpoint
        .params
        .iter()
        .filter(|p| p.source != Source::Body)
        .map(|p| parameter(p, components))
        .collect();
    if !parameters.is_empty() {
        operation.insert("parameters".into(), Value::Array(parameters));
    }

    if let Some(body) = request_body(endpoint, components) {
        operation.insert("requestBody".into(), body);
    }

    let mut responses = Map::new();
    responses.insert(
        "200".into(),
        json!({
            "description": "Successful Response",
            "content": {"application/json": {"schema": {}}}
        }),
    );
    if !endpoint.params.is_empty() {
        responses.insert(
            "422".into(),
            json!({
                "description": "Validation Error",
                "content": {"application/json": {"schema": schema::reference("HTTPValidationError")}}
            }),
        );
    }
    operation.insert("responses".into(), Value::Object(responses));
    Value::Object(operation)
}

fn parameter(param: &Param, components: &mut Components) -> Value {
    let field = &param.field;
    let mut schema = field_schema(field, components);
    if let Value::Object(map) = &mut schema {
        // Parameters carry their description outside the schema
        map.remove("description");
        if field.docs.title.is_none() {
            map.insert("title".into(), Value::from(default_title(param.wire_name())));
        }
    }

    let mut parameter = Map::new();
    parameter.insert("name".into(), Value::from(param.wire_name()));
    parameter.insert("in".into(), Value::from(param.source.as_str()));
    parameter.insert(
        "required".into(),
        Value::Bool(param.source == Source::Path || field.is_required()),
    );
    if let Some(description) = field.docs.description {
        parameter.insert("description".into(), Value::from(description));
    }
    if field.docs.deprecated {
        parameter.insert("deprecated".into(), Value::Bool(true));
    }
    parameter.insert("schema".into(), schema);
    Value::Object(parameter)
}

fn request_body(endpoint: &Endpoint, components: &mut Components) -> Option<Value> {
    let body: Vec<&Param> = endpoint
        .params
        .iter()
        .filter(|p| p.source == Source::Body)
        .collect();
    let first = body.first()?;

    let (schema, required) = if body_is_embedded(&endpoint.params) {
        let name = format!("Body_{}", endpoint.operation_id);
        let fields: Vec<_> = body.iter().map(|p| p.field.clone()).collect();
        let rendered = schema::object_schema(&name, &fields, components);
        let required = fields.iter().any(crate::binding::Field::is_required);
        (components.insert(&name, rendered), required)
    } else {
        (field_schema(&first.field, components), first.field.is_required())
    };

    let mut media = Map::new();
    media.insert("schema".into(), schema);
    if !endpoint.body_examples.is_empty() {
        let examples: Map<String, Value> = endpoint
            .body_examples
            .iter()
            .map(|e| (e.name.to_string(), serde_json::to_value(e).unwrap_or(Value::Null)))
            .collect();
        media.insert("examples".into(), Value::Object(examples));
    }

    Some(json!({
        "content": {"application/json": media},
        "required": required,
    }))
}

fn validation_error_schema() -> Value {
    json!({
        "properties": {
            "loc": {
                "items": {"anyOf": [{"type": "string"}, {"type": "integer"}]},
                "type": "array",
                "title": "Location"
            },
            "msg": {"type": "string", "title": "Message"},
            "type": {"type": "string", "title": "Error Type"}
        },
        "type": "object",
        "required": ["loc", "msg", "type"],
        "title": "ValidationError"
    })
}

fn http_validation_error_schema() -> Value {
    json!({
        "properties": {
            "detail": {
                "items": schema::reference("ValidationError"),
                "type": "array",
                "title": "Detail"
            }
        },
        "type": "object",
        "title": "HTTPValidationError"
    })
}

/// HTML page loading Swagger UI against the document at `openapi_path`
pub fn docs_page(title: &str, openapi_path: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<link type="text/css" rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
<title>{title} - Swagger UI</title>
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script>
const ui = SwaggerUIBundle({{
    url: '{openapi_path}',
    dom_id: '#swagger-ui',
    layout: 'BaseLayout',
    deepLinking: true,
    showExtensions: true,
    showCommonExtensions: true,
    presets: [SwaggerUIBundle.presets.apis, SwaggerUIBundle.SwaggerUIStandalonePreset],
}})
</script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::routes;

    fn document() -> Value {
        build_document(&routes(), &DocsConfig::default())
    }

    #[test]
    fn test_document_header() {
        let doc = document();
        assert_eq!(doc["openapi"], "3.1.0");
        assert_eq!(doc["info"]["title"], DocsConfig::default().title);
    }

    #[test]
    fn test_paths_grouped_by_template() {
        let doc = document();
        let item = &doc["paths"]["/items/{item_id}"];
        assert_eq!(item["get"]["operationId"], "read_item");
        assert_eq!(item["put"]["operationId"], "update_item");
        assert!(doc["paths"]["/"]["get"]["responses"].get("422").is_none());
    }

    #[test]
    fn test_path_parameter_documentation() {
        let doc = document();
        let params = &doc["paths"]["/path_parameter/validations/{item_id}"]["get"]["parameters"];
        assert_eq!(
            params[0],
            json!({
                "name": "item_id",
                "in": "path",
                "required": true,
                "schema": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": 1000,
                    "title": "The ID of the item to get"
                }
            })
        );
    }

    #[test]
    fn test_alias_parameter() {
        let doc = document();
        let param = &doc["paths"]["/queryparam/validation"]["get"]["parameters"][0];
        assert_eq!(param["name"], "item-query");
        assert_eq!(param["in"], "query");
        assert_eq!(param["required"], false);
        assert_eq!(param["deprecated"], true);
        assert_eq!(param["schema"]["title"], "Query string");
        assert_eq!(param["schema"]["default"], json!([]));
        assert!(param["description"].as_str().is_some());
    }

    #[test]
    fn test_enum_parameter_refers_to_component() {
        let doc = document();
        let param = &doc["paths"]["/models/{model_name}"]["get"]["parameters"][0];
        assert_eq!(param["schema"]["$ref"], "#/components/schemas/ModelName");
        assert_eq!(
            doc["components"]["schemas"]["ModelName"]["enum"],
            json!(["alexnet", "resnet", "lenet"])
        );
    }

    #[test]
    fn test_body_component_and_examples() {
        let doc = document();
        let body = &doc["paths"]["/request_body/"]["post"]["requestBody"];
        assert_eq!(body["required"], true);
        let media = &body["content"]["application/json"];
        assert_eq!(media["schema"]["$ref"], "#/components/schemas/Body_create_item");

        let names: Vec<&String> = media["examples"].as_object().unwrap().keys().collect();
        assert_eq!(names, ["normal", "converted", "invalid"]);
        assert_eq!(media["examples"]["converted"]["value"]["price"], "35.4");
        assert_eq!(
            media["examples"]["converted"]["description"],
            "Price `strings` can be converted to actual `numbers` automatically"
        );
        assert_eq!(
            media["examples"]["normal"]["description"],
            "A **normal** item works correctly."
        );
        assert!(media["examples"]["invalid"].get("description").is_none());

        let component = &doc["components"]["schemas"]["Body_create_item"];
        assert_eq!(component["required"], json!(["item", "user", "importance"]));
        assert_eq!(
            component["properties"]["item"]["$ref"],
            "#/components/schemas/SampleItem"
        );
    }

    #[test]
    fn test_embedded_single_body() {
        let doc = document();
        let media = &doc["paths"]["/embed/{item_id}"]["put"]["requestBody"]["content"]["application/json"];
        assert_eq!(media["schema"]["$ref"], "#/components/schemas/Body_embed_item");
        assert!(doc["components"]["schemas"]["HTTPValidationError"].is_object());
    }

    #[test]
    fn test_docs_page_points_at_document() {
        let page = docs_page("reqbind", "/openapi.json");
        assert!(page.contains("url: '/openapi.json'"));
        assert!(page.contains("<title>reqbind - Swagger UI</title>"));
    }
}
