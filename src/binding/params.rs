//! Parameter binding
//!
//! Turns the raw pieces of a request (path captures, query pairs, body
//! bytes) into the named, validated values an endpoint declared.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::coerce::validate;
use super::error::{ErrorKind, Loc, Source, ValidationError, ValidationErrors};
use super::schema::Field;

/// A declared endpoint parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub field: Field,
    pub source: Source,
    /// Wire name when it differs from the field name
    pub alias: Option<&'static str>,
    /// Read a lone body parameter from under its own name
    pub embed: bool,
}

impl Param {
    pub const fn path(field: Field) -> Self {
        Self::new(field, Source::Path)
    }

    pub const fn query(field: Field) -> Self {
        Self::new(field, Source::Query)
    }

    pub const fn body(field: Field) -> Self {
        Self::new(field, Source::Body)
    }

    const fn new(field: Field, source: Source) -> Self {
        Self {
            field,
            source,
            alias: None,
            embed: false,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    #[must_use]
    pub fn embed(mut self) -> Self {
        self.embed = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.field.name
    }

    pub fn wire_name(&self) -> &'static str {
        self.alias.unwrap_or(self.field.name)
    }
}

/// Whether body parameters are read from under their own names
///
/// True when several body parameters coexist or the single one asks for it.
pub fn body_is_embedded(params: &[Param]) -> bool {
    let mut body = params.iter().filter(|p| p.source == Source::Body);
    match (body.next(), body.next()) {
        (Some(only), None) => only.embed,
        (Some(_), Some(_)) => true,
        (None, _) => false,
    }
}

/// Unvalidated request data handed to [`bind`]
#[derive(Debug, Default)]
pub struct RawRequest<'a> {
    pub path_params: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: &'a [u8],
}

impl<'a> RawRequest<'a> {
    pub fn new(path_params: Vec<(String, String)>, query: Option<&str>, body: &'a [u8]) -> Self {
        Self {
            path_params,
            query: parse_query(query),
            body,
        }
    }
}

/// Decode a query string into ordered pairs, keeping repeated keys
pub fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

/// Values produced by a successful binding, keyed by parameter name
#[derive(Debug, Default)]
pub struct Bound {
    values: IndexMap<&'static str, Value>,
}

/// A bound value could not be handed to the handler in the requested type
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("parameter `{0}` was not bound")]
    Unbound(String),
    #[error("parameter `{name}` does not fit the handler type: {reason}")]
    Mismatch {
        name: String,
        #[source]
        reason: serde_json::Error,
    },
}

impl Bound {
    /// Remove a value and deserialize it into the handler's type
    pub fn take<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, ExtractError> {
        let value = self
            .values
            .shift_remove(name)
            .ok_or_else(|| ExtractError::Unbound(name.to_string()))?;
        serde_json::from_value(value).map_err(|reason| ExtractError::Mismatch {
            name: name.to_string(),
            reason,
        })
    }

    fn insert(&mut self, name: &'static str, value: Value) {
        self.values.insert(name, value);
    }
}

/// Bind every declared parameter or report every violation
///
/// Path parameters are checked first, then query, then body. A body that
/// is not valid JSON short-circuits with a single `json_invalid` error.
pub fn bind(params: &[Param], raw: &RawRequest<'_>) -> Result<Bound, ValidationErrors> {
    let has_body = params.iter().any(|p| p.source == Source::Body);
    let body = if has_body {
        parse_body(raw.body).map_err(ValidationErrors::from)?
    } else {
        None
    };

    let mut ordered: Vec<&Param> = params.iter().collect();
    ordered.sort_by_key(|p| p.source);

    let embedded = body_is_embedded(params);
    let mut errors = ValidationErrors::default();
    let mut bound = Bound::default();

    for param in ordered {
        let (raw_value, loc) = match param.source {
            Source::Path => (
                raw.path_params
                    .iter()
                    .find(|(name, _)| name == param.wire_name())
                    .map(|(_, value)| Value::String(value.clone())),
                Loc::root(Source::Path).key(param.wire_name()),
            ),
            Source::Query => (
                query_value(param, &raw.query),
                Loc::root(Source::Query).key(param.wire_name()),
            ),
            Source::Body if embedded => (
                body.as_ref()
                    .and_then(Value::as_object)
                    .and_then(|fields| fields.get(param.wire_name()))
                    .cloned(),
                Loc::root(Source::Body).key(param.wire_name()),
            ),
            Source::Body => (body.clone(), Loc::root(Source::Body)),
        };

        let value = match (raw_value, &param.field.default) {
            (Some(raw_value), _) => validate(
                &param.field.ty,
                &param.field.constraints,
                &raw_value,
                &loc,
                &mut errors,
            ),
            (None, Some(default)) => Some(default.clone()),
            (None, None) => {
                let input = missing_input(param, embedded, body.as_ref());
                errors.push(ValidationError::missing(loc, input));
                None
            }
        };

        if let Some(value) = value {
            bound.insert(param.name(), value);
        }
    }

    if errors.is_empty() {
        Ok(bound)
    } else {
        Err(errors)
    }
}

/// Raw query value: every entry for sequences, the last one otherwise
fn query_value(param: &Param, query: &[(String, String)]) -> Option<Value> {
    let entries = query
        .iter()
        .filter(|(key, _)| key == param.wire_name())
        .map(|(_, value)| Value::String(value.clone()));

    if param.field.ty.is_sequence() {
        let items: Vec<Value> = entries.collect();
        (!items.is_empty()).then_some(Value::Array(items))
    } else {
        entries.last()
    }
}

/// Input reported for a missing parameter: the enclosing body object if any
fn missing_input(param: &Param, embedded: bool, body: Option<&Value>) -> Value {
    match (param.source, embedded, body) {
        (Source::Body, true, Some(body @ Value::Object(_))) => body.clone(),
        _ => Value::Null,
    }
}

/// Parse the request body as JSON; an empty body is absent
fn parse_body(bytes: &[u8]) -> Result<Option<Value>, ValidationError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some).map_err(|e| {
        let offset = byte_offset(bytes, e.line(), e.column());
        ValidationError::new(
            ErrorKind::JsonInvalid {
                error: e.to_string(),
            },
            Loc::root(Source::Body).index(offset),
            Value::Object(Map::new()),
        )
    })
}

/// Convert serde_json's 1-based line/column into a byte offset
fn byte_offset(bytes: &[u8], line: usize, column: usize) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(line - 2)
            .map_or(bytes.len(), |(i, _)| i + 1)
    };
    (line_start + column.saturating_sub(1)).min(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::schema::{Constraints, FieldType, RecordSchema};
    use serde_json::json;

    fn item_type() -> FieldType {
        FieldType::record(RecordSchema::new(
            "Item",
            vec![
                Field::required("name", FieldType::Str),
                Field::required("price", FieldType::Float),
            ],
        ))
    }

    fn codes(errors: &ValidationErrors) -> Vec<(&'static str, Value)> {
        errors
            .iter()
            .map(|e| (e.kind.code(), serde_json::to_value(&e.loc).unwrap()))
            .collect()
    }

    #[test]
    fn test_path_and_query_coercion() {
        let params = vec![
            Param::path(Field::required("item_id", FieldType::Int)),
            Param::query(Field::optional("q", FieldType::Str)),
            Param::query(Field::with_default("short", FieldType::Bool, json!(false))),
        ];
        let raw = RawRequest::new(
            vec![("item_id".to_string(), "5".to_string())],
            Some("short=yes&q=hello%20world"),
            b"",
        );
        let mut bound = bind(&params, &raw).unwrap();
        assert_eq!(bound.take::<i64>("item_id").unwrap(), 5);
        assert_eq!(bound.take::<Option<String>>("q").unwrap().as_deref(), Some("hello world"));
        assert!(bound.take::<bool>("short").unwrap());
    }

    #[test]
    fn test_errors_are_aggregated_in_source_order() {
        let params = vec![
            Param::query(Field::required("q", FieldType::Str)),
            Param::query(
                Field::required("size", FieldType::Float).constrained(Constraints::new().gt(0.0)),
            ),
            Param::path(
                Field::required("item_id", FieldType::Int)
                    .constrained(Constraints::new().ge(0.0).le(1000.0)),
            ),
        ];
        let raw = RawRequest::new(
            vec![("item_id".to_string(), "2000".to_string())],
            Some("size=0"),
            b"",
        );
        let errors = bind(&params, &raw).unwrap_err();
        assert_eq!(
            codes(&errors),
            vec![
                ("less_than_equal", json!(["path", "item_id"])),
                ("missing", json!(["query", "q"])),
                ("greater_than", json!(["query", "size"])),
            ]
        );
    }

    #[test]
    fn test_repeated_query_entries_collect() {
        let params = vec![Param::query(Field::with_default(
            "q",
            FieldType::list(FieldType::Str),
            json!([]),
        ))
        .alias("item-query")];

        let raw = RawRequest::new(vec![], Some("item-query=foo&item-query=bar&q=ignored"), b"");
        let mut bound = bind(&params, &raw).unwrap();
        assert_eq!(bound.take::<Vec<String>>("q").unwrap(), vec!["foo", "bar"]);

        let raw = RawRequest::new(vec![], None, b"");
        let mut bound = bind(&params, &raw).unwrap();
        assert!(bound.take::<Vec<String>>("q").unwrap().is_empty());
    }

    #[test]
    fn test_scalar_query_takes_last_entry() {
        let params = vec![Param::query(Field::required("limit", FieldType::Int))];
        let raw = RawRequest::new(vec![], Some("limit=1&limit=2"), b"");
        assert_eq!(bind(&params, &raw).unwrap().take::<i64>("limit").unwrap(), 2);
    }

    #[test]
    fn test_single_body_reads_whole_document() {
        let params = vec![Param::body(Field::required("item", item_type()))];
        let raw = RawRequest::new(vec![], None, br#"{"name": "Foo", "price": "1.5"}"#);
        let mut bound = bind(&params, &raw).unwrap();
        assert_eq!(
            bound.take::<Value>("item").unwrap(),
            json!({"name": "Foo", "price": 1.5})
        );

        let raw = RawRequest::new(vec![], None, br#"{"name": "Foo"}"#);
        let errors = bind(&params, &raw).unwrap_err();
        assert_eq!(codes(&errors), vec![("missing", json!(["body", "price"]))]);
    }

    #[test]
    fn test_embedded_body_reads_named_field() {
        let params = vec![Param::body(Field::required("item", item_type())).embed()];
        let raw = RawRequest::new(vec![], None, br#"{"item": {"name": "Foo", "price": 2}}"#);
        assert!(bind(&params, &raw).is_ok());

        let raw = RawRequest::new(vec![], None, br#"{"name": "Foo", "price": 2}"#);
        let errors = bind(&params, &raw).unwrap_err();
        assert_eq!(codes(&errors), vec![("missing", json!(["body", "item"]))]);
    }

    #[test]
    fn test_embedded_body_not_an_object() {
        let params = vec![Param::body(Field::required("item", item_type())).embed()];
        let raw = RawRequest::new(vec![], None, b"[1, 2]");
        let errors = bind(&params, &raw).unwrap_err();
        assert_eq!(codes(&errors), vec![("missing", json!(["body", "item"]))]);
        assert_eq!(errors.iter().next().map(|e| &e.input), Some(&Value::Null));
    }

    #[test]
    fn test_multiple_body_params_are_nested() {
        let params = vec![
            Param::body(Field::required("item", item_type())),
            Param::body(
                Field::required("importance", FieldType::Int)
                    .constrained(Constraints::new().gt(0.0)),
            ),
        ];
        let raw = RawRequest::new(
            vec![],
            None,
            br#"{"item": {"name": "Foo", "price": 2}, "importance": 0}"#,
        );
        let errors = bind(&params, &raw).unwrap_err();
        assert_eq!(codes(&errors), vec![("greater_than", json!(["body", "importance"]))]);
    }

    #[test]
    fn test_missing_body() {
        let params = vec![Param::body(Field::required("item", item_type()))];
        let raw = RawRequest::new(vec![], None, b"  ");
        let errors = bind(&params, &raw).unwrap_err();
        assert_eq!(codes(&errors), vec![("missing", json!(["body"]))]);
    }

    #[test]
    fn test_invalid_json_short_circuits() {
        let params = vec![
            Param::query(Field::required("q", FieldType::Str)),
            Param::body(Field::required("item", item_type())),
        ];
        let raw = RawRequest::new(vec![], None, b"{\"name\": }");
        let errors = bind(&params, &raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.kind.code(), "json_invalid");
        let loc = serde_json::to_value(&error.loc).unwrap();
        assert_eq!(loc[0], "body");
        assert!(loc[1].is_u64());
        assert_eq!(error.input, json!({}));
    }

    #[test]
    fn test_byte_offset() {
        assert_eq!(byte_offset(b"abc", 1, 2), 1);
        assert_eq!(byte_offset(b"ab\ncd", 2, 2), 4);
        assert_eq!(byte_offset(b"ab\ncd", 2, 0), 3);
    }

    #[test]
    fn test_take_type_mismatch() {
        let params = vec![Param::query(Field::required("q", FieldType::Str))];
        let raw = RawRequest::new(vec![], Some("q=x"), b"");
        let mut bound = bind(&params, &raw).unwrap();
        assert!(matches!(bound.take::<i64>("q"), Err(ExtractError::Mismatch { .. })));
        assert!(matches!(bound.take::<String>("q"), Err(ExtractError::Unbound(_))));
    }
}
