//! Lax coercion and constraint checks
//!
//! Path and query values reach this module as JSON strings, body values as
//! whatever JSON the client sent. Both go through [`validate`], which walks
//! the declared type, converts what it can (`"5"` becomes `5` for an
//! integer) and records every failure instead of stopping at the first.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::error::{ErrorKind, Loc, ValidationError, ValidationErrors};
use super::schema::{Constraints, FieldType, RecordSchema};

/// Validate `input` against `ty` and `constraints`
///
/// Returns the coerced value, or `None` after pushing at least one error.
pub fn validate(
    ty: &FieldType,
    constraints: &Constraints,
    input: &Value,
    loc: &Loc,
    errors: &mut ValidationErrors,
) -> Option<Value> {
    let result = match ty {
        FieldType::Optional(inner) => {
            if input.is_null() {
                return Some(Value::Null);
            }
            return validate(inner, constraints, input, loc, errors);
        }
        FieldType::Str => match input {
            Value::String(text) => check_text(text, constraints).map(|()| input.clone()),
            _ => Err(ErrorKind::StringType),
        },
        FieldType::Int => coerce_int(input).and_then(|n| {
            #[allow(clippy::cast_precision_loss)]
            let as_float = n as f64;
            check_number(as_float, constraints)?;
            Ok(Value::from(n))
        }),
        FieldType::Float => coerce_float(input).and_then(|n| {
            check_number(n, constraints)?;
            Ok(Value::from(n))
        }),
        FieldType::Bool => coerce_bool(input).map(Value::Bool),
        FieldType::Url => coerce_url(input).map(Value::String),
        FieldType::Enum(schema) => match input.as_str() {
            Some(text) if schema.contains(text) => Ok(input.clone()),
            _ => Err(ErrorKind::Enum {
                expected: schema.expected(),
            }),
        },
        FieldType::List(item) => match input {
            Value::Array(items) => {
                return validate_items(item, items, loc, errors).map(Value::Array);
            }
            _ => Err(ErrorKind::ListType),
        },
        FieldType::Set(item) => match input {
            Value::Array(items) => {
                return validate_items(item, items, loc, errors).map(dedup_in_order);
            }
            _ => Err(ErrorKind::SetType),
        },
        FieldType::Map(key, value) => match input {
            Value::Object(entries) => {
                return validate_map(key, value, entries, loc, errors).map(Value::Object);
            }
            _ => Err(ErrorKind::DictType),
        },
        FieldType::Record(schema) => match input {
            Value::Object(fields) => {
                return validate_record(schema, fields, loc, errors).map(Value::Object);
            }
            _ => Err(ErrorKind::ModelAttributesType),
        },
    };

    match result {
        Ok(value) => Some(value),
        Err(kind) => {
            errors.push(ValidationError::new(kind, loc.clone(), input.clone()));
            None
        }
    }
}

/// Validate an object against a record schema, in declaration order
///
/// Unknown keys are dropped; absent fields take their default.
pub fn validate_record(
    schema: &RecordSchema,
    fields: &Map<String, Value>,
    loc: &Loc,
    errors: &mut ValidationErrors,
) -> Option<Map<String, Value>> {
    let mut record = Map::with_capacity(schema.fields.len());
    let mut ok = true;

    for field in &schema.fields {
        let field_loc = loc.key(field.name);
        let value = match (fields.get(field.name), &field.default) {
            (Some(raw), _) => validate(&field.ty, &field.constraints, raw, &field_loc, errors),
            (None, Some(default)) => Some(default.clone()),
            (None, None) => {
                errors.push(ValidationError::missing(
                    field_loc,
                    Value::Object(fields.clone()),
                ));
                None
            }
        };
        match value {
            Some(value) => {
                record.insert(field.name.to_string(), value);
            }
            None => ok = false,
        }
    }

    ok.then_some(record)
}

fn validate_items(
    item: &FieldType,
    items: &[Value],
    loc: &Loc,
    errors: &mut ValidationErrors,
) -> Option<Vec<Value>> {
    let none = Constraints::default();
    let mut values = Vec::with_capacity(items.len());
    let mut ok = true;
    for (index, raw) in items.iter().enumerate() {
        match validate(item, &none, raw, &loc.index(index), errors) {
            Some(value) => values.push(value),
            None => ok = false,
        }
    }
    ok.then_some(values)
}

fn validate_map(
    key: &FieldType,
    value: &FieldType,
    entries: &Map<String, Value>,
    loc: &Loc,
    errors: &mut ValidationErrors,
) -> Option<Map<String, Value>> {
    let none = Constraints::default();
    let mut map = Map::with_capacity(entries.len());
    let mut ok = true;
    for (raw_key, raw_value) in entries {
        let entry_loc = loc.key(raw_key.as_str());
        let key_loc = entry_loc.key("[key]");
        let key = validate(key, &none, &Value::String(raw_key.clone()), &key_loc, errors);
        let value = validate(value, &none, raw_value, &entry_loc, errors);
        match (key, value) {
            (Some(key), Some(value)) => {
                map.insert(render_key(&key), value);
            }
            _ => ok = false,
        }
    }
    ok.then_some(map)
}

/// Drop repeated set members, first occurrence wins
///
/// Members are keyed on their compact JSON text; records are already
/// rebuilt in declaration order, so equal records render identically.
fn dedup_in_order(values: Vec<Value>) -> Value {
    let mut unique: IndexMap<String, Value> = IndexMap::with_capacity(values.len());
    for value in values {
        unique.entry(value.to_string()).or_insert(value);
    }
    Value::Array(unique.into_values().collect())
}

/// Canonical text form of a coerced mapping key
fn render_key(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn coerce_int(input: &Value) -> Result<i64, ErrorKind> {
    match input {
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                return Ok(n);
            }
            match number.as_f64() {
                Some(f) if f.fract() != 0.0 => Err(ErrorKind::IntFromFloat),
                Some(f) => float_to_int(f).ok_or(ErrorKind::IntType),
                None => Err(ErrorKind::IntType),
            }
        }
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(float_to_int))
                .ok_or(ErrorKind::IntParsing)
        }
        _ => Err(ErrorKind::IntType),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_int(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

fn coerce_float(input: &Value) -> Result<f64, ErrorKind> {
    match input {
        Value::Number(number) => number.as_f64().ok_or(ErrorKind::FloatType),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or(ErrorKind::FloatParsing),
        _ => Err(ErrorKind::FloatType),
    }
}

fn coerce_bool(input: &Value) -> Result<bool, ErrorKind> {
    match input {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(ErrorKind::BoolParsing),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "0" | "off" | "f" | "false" | "n" | "no" => Ok(false),
            "1" | "on" | "t" | "true" | "y" | "yes" => Ok(true),
            _ => Err(ErrorKind::BoolParsing),
        },
        _ => Err(ErrorKind::BoolType),
    }
}

fn coerce_url(input: &Value) -> Result<String, ErrorKind> {
    let Value::String(text) = input else {
        return Err(ErrorKind::UrlParsing {
            error: "input is not a string".to_string(),
        });
    };
    if text.is_empty() {
        return Err(ErrorKind::UrlParsing {
            error: "input is empty".to_string(),
        });
    }
    let parsed = url::Url::parse(text).map_err(|e| ErrorKind::UrlParsing {
        error: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ErrorKind::UrlScheme);
    }
    if !parsed.host_str().is_some_and(|host| !host.is_empty()) {
        return Err(ErrorKind::UrlParsing {
            error: "empty host".to_string(),
        });
    }
    Ok(parsed.into())
}

fn check_number(value: f64, constraints: &Constraints) -> Result<(), ErrorKind> {
    if let Some(gt) = constraints.gt {
        if value <= gt.0 {
            return Err(ErrorKind::GreaterThan { gt });
        }
    }
    if let Some(ge) = constraints.ge {
        if value < ge.0 {
            return Err(ErrorKind::GreaterThanEqual { ge });
        }
    }
    if let Some(lt) = constraints.lt {
        if value >= lt.0 {
            return Err(ErrorKind::LessThan { lt });
        }
    }
    if let Some(le) = constraints.le {
        if value > le.0 {
            return Err(ErrorKind::LessThanEqual { le });
        }
    }
    Ok(())
}

fn check_text(text: &str, constraints: &Constraints) -> Result<(), ErrorKind> {
    let length = text.chars().count();
    if let Some(min_length) = constraints.min_length {
        if length < min_length {
            return Err(ErrorKind::StringTooShort { min_length });
        }
    }
    if let Some(max_length) = constraints.max_length {
        if length > max_length {
            return Err(ErrorKind::StringTooLong { max_length });
        }
    }
    if let Some(pattern) = &constraints.pattern {
        if !pattern.is_match(text) {
            return Err(ErrorKind::StringPatternMismatch {
                pattern: pattern.as_str().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::error::Source;
    use crate::binding::schema::{EnumSchema, Field};
    use serde_json::json;

    fn run(ty: &FieldType, constraints: &Constraints, input: Value) -> Result<Value, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let loc = Loc::root(Source::Body);
        match validate(ty, constraints, &input, &loc, &mut errors) {
            Some(value) if errors.is_empty() => Ok(value),
            _ => Err(errors),
        }
    }

    fn first_code(result: Result<Value, ValidationErrors>) -> &'static str {
        let errors = result.expect_err("expected a validation failure");
        errors.iter().next().map(|e| e.kind.code()).unwrap_or_default()
    }

    #[test]
    fn test_int_from_text() {
        let none = Constraints::default();
        assert_eq!(run(&FieldType::Int, &none, json!("5")).unwrap(), json!(5));
        assert_eq!(run(&FieldType::Int, &none, json!(" 42 ")).unwrap(), json!(42));
        assert_eq!(run(&FieldType::Int, &none, json!("7.0")).unwrap(), json!(7));
        assert_eq!(run(&FieldType::Int, &none, json!(3.0)).unwrap(), json!(3));
        assert_eq!(first_code(run(&FieldType::Int, &none, json!("abc"))), "int_parsing");
        assert_eq!(first_code(run(&FieldType::Int, &none, json!("5.5"))), "int_parsing");
        assert_eq!(first_code(run(&FieldType::Int, &none, json!(5.5))), "int_from_float");
        assert_eq!(first_code(run(&FieldType::Int, &none, json!(true))), "int_type");
    }

    #[test]
    fn test_numeric_bounds() {
        let bounds = Constraints::new().ge(0.0).le(1000.0);
        assert!(run(&FieldType::Int, &bounds, json!("0")).is_ok());
        assert!(run(&FieldType::Int, &bounds, json!("1000")).is_ok());
        assert_eq!(first_code(run(&FieldType::Int, &bounds, json!("-1"))), "greater_than_equal");
        assert_eq!(first_code(run(&FieldType::Int, &bounds, json!("1001"))), "less_than_equal");

        let open = Constraints::new().gt(0.0).lt(10.5);
        assert!(run(&FieldType::Float, &open, json!("10.4")).is_ok());
        assert_eq!(first_code(run(&FieldType::Float, &open, json!("0"))), "greater_than");
        assert_eq!(first_code(run(&FieldType::Float, &open, json!("10.5"))), "less_than");
    }

    #[test]
    fn test_float_rejects_non_finite() {
        let none = Constraints::default();
        assert_eq!(run(&FieldType::Float, &none, json!("35.4")).unwrap(), json!(35.4));
        assert_eq!(first_code(run(&FieldType::Float, &none, json!("nan"))), "float_parsing");
        assert_eq!(
            first_code(run(&FieldType::Float, &none, json!("thirty five point four"))),
            "float_parsing"
        );
        assert_eq!(first_code(run(&FieldType::Float, &none, json!(null))), "float_type");
    }

    #[test]
    fn test_bool_words() {
        let none = Constraints::default();
        for word in ["true", "1", "Yes", "on", "t", "y"] {
            assert_eq!(run(&FieldType::Bool, &none, json!(word)).unwrap(), json!(true));
        }
        for word in ["false", "0", "NO", "off", "f", "n"] {
            assert_eq!(run(&FieldType::Bool, &none, json!(word)).unwrap(), json!(false));
        }
        assert_eq!(first_code(run(&FieldType::Bool, &none, json!("maybe"))), "bool_parsing");
    }

    #[test]
    fn test_text_constraints() {
        let limits = Constraints::new().min_length(3).max_length(5);
        assert!(run(&FieldType::Str, &limits, json!("abcd")).is_ok());
        assert_eq!(first_code(run(&FieldType::Str, &limits, json!("ab"))), "string_too_short");
        assert_eq!(first_code(run(&FieldType::Str, &limits, json!("abcdef"))), "string_too_long");
        assert_eq!(first_code(run(&FieldType::Str, &limits, json!(12))), "string_type");

        let pattern = Constraints::new().pattern("^fixedquery$").unwrap();
        assert!(run(&FieldType::Str, &pattern, json!("fixedquery")).is_ok());
        assert_eq!(
            first_code(run(&FieldType::Str, &pattern, json!("other"))),
            "string_pattern_mismatch"
        );
    }

    #[test]
    fn test_enum_membership() {
        let ty = FieldType::Enum(EnumSchema {
            name: "ModelName",
            values: &["alexnet", "resnet", "lenet"],
        });
        let none = Constraints::default();
        assert_eq!(run(&ty, &none, json!("resnet")).unwrap(), json!("resnet"));
        let errors = run(&ty, &none, json!("vgg")).unwrap_err();
        let error = errors.iter().next().unwrap();
        assert_eq!(error.kind.to_string(), "Input should be 'alexnet', 'resnet' or 'lenet'");
    }

    #[test]
    fn test_url_normalized() {
        let none = Constraints::default();
        assert_eq!(
            run(&FieldType::Url, &none, json!("http://example.com")).unwrap(),
            json!("http://example.com/")
        );
        assert_eq!(first_code(run(&FieldType::Url, &none, json!("example.com"))), "url_parsing");
        assert_eq!(first_code(run(&FieldType::Url, &none, json!("ftp://example.com"))), "url_scheme");
    }

    #[test]
    fn test_set_deduplicates() {
        let ty = FieldType::set(FieldType::Str);
        let none = Constraints::default();
        assert_eq!(run(&ty, &none, json!(["a", "b", "a"])).unwrap(), json!(["a", "b"]));
        assert_eq!(first_code(run(&ty, &none, json!("a"))), "set_type");
    }

    #[test]
    fn test_large_set_keeps_first_occurrences() {
        let ty = FieldType::set(FieldType::Str);
        let none = Constraints::default();
        let mut tags: Vec<Value> = (0..100_000).map(|i| json!(format!("tag-{i}"))).collect();
        tags.push(json!("tag-0"));
        tags.push(json!("tag-99999"));

        let bound = run(&ty, &none, Value::Array(tags)).unwrap();
        let bound = bound.as_array().unwrap();
        assert_eq!(bound.len(), 100_000);
        assert_eq!(bound[0], json!("tag-0"));
        assert_eq!(bound[99_999], json!("tag-99999"));
    }

    #[test]
    fn test_set_dedups_after_coercion() {
        let ty = FieldType::set(FieldType::Int);
        let none = Constraints::default();
        assert_eq!(run(&ty, &none, json!([2, "1", 1, "2.0"])).unwrap(), json!([2, 1]));
    }

    #[test]
    fn test_map_keys_coerced() {
        let ty = FieldType::map(FieldType::Int, FieldType::Float);
        let none = Constraints::default();
        assert_eq!(
            run(&ty, &none, json!({"01": 1, "2": 0.5})).unwrap(),
            json!({"1": 1.0, "2": 0.5})
        );
        let errors = run(&ty, &none, json!({"x": 1.0})).unwrap_err();
        let error = errors.iter().next().unwrap();
        assert_eq!(error.kind.code(), "int_parsing");
        assert_eq!(serde_json::to_value(&error.loc).unwrap(), json!(["body", "x", "[key]"]));
    }

    #[test]
    fn test_record_collects_every_error() {
        let schema = RecordSchema::new(
            "Sample",
            vec![
                Field::required("name", FieldType::Str),
                Field::required("price", FieldType::Float).constrained(Constraints::new().gt(0.0)),
                Field::with_default("my_list", FieldType::list(FieldType::Str), json!([])),
            ],
        );
        let ty = FieldType::record(schema);
        let none = Constraints::default();

        let errors = run(&ty, &none, json!({"price": -1})).unwrap_err();
        let codes: Vec<&str> = errors.iter().map(|e| e.kind.code()).collect();
        assert_eq!(codes, vec!["missing", "greater_than"]);

        let value = run(&ty, &none, json!({"price": "2", "name": "x", "extra": 1})).unwrap();
        assert_eq!(value, json!({"name": "x", "price": 2.0, "my_list": []}));
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "price", "my_list"]);
    }

    #[test]
    fn test_list_error_loc_has_index() {
        let ty = FieldType::list(FieldType::Int);
        let errors = run(&ty, &Constraints::default(), json!([1, "x", 3])).unwrap_err();
        let error = errors.iter().next().unwrap();
        assert_eq!(serde_json::to_value(&error.loc).unwrap(), json!(["body", 1]));
        assert_eq!(error.input, json!("x"));
    }
}
