//! Declarative schema types
//!
//! A schema describes what a parameter or record field must look like:
//! its semantic type, its default (absence of one makes it required),
//! the constraints checked after coercion, and documentation metadata.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Semantic type of a bound value
#[derive(Debug, Clone)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    /// Absolute `http`/`https` URL
    Url,
    Enum(EnumSchema),
    List(Box<FieldType>),
    /// Like `List`, deduplicated
    Set(Box<FieldType>),
    /// Object with keys coerced to the key type
    Map(Box<FieldType>, Box<FieldType>),
    Record(Arc<RecordSchema>),
    /// Accepts `null` in addition to the inner type
    Optional(Box<FieldType>),
}

impl FieldType {
    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    pub fn set(item: Self) -> Self {
        Self::Set(Box::new(item))
    }

    pub fn map(key: Self, value: Self) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn record(schema: RecordSchema) -> Self {
        Self::Record(Arc::new(schema))
    }

    /// Whether values of this type arrive as repeated query entries
    pub fn is_sequence(&self) -> bool {
        match self {
            Self::List(_) | Self::Set(_) => true,
            Self::Optional(inner) => inner.is_sequence(),
            _ => false,
        }
    }
}

/// Closed enumeration over string values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumSchema {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

impl EnumSchema {
    pub fn contains(&self, value: &str) -> bool {
        self.values.contains(&value)
    }

    /// Human readable list of members, e.g. `'a', 'b' or 'c'`
    pub fn expected(&self) -> String {
        let quoted: Vec<String> = self.values.iter().map(|v| format!("'{v}'")).collect();
        match quoted.split_last() {
            None => String::new(),
            Some((last, [])) => last.clone(),
            Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
        }
    }
}

/// Numeric bound shared by integer and float constraints
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Limit(pub f64);

impl Limit {
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_json(self) -> Value {
        if self.is_integral() {
            Value::from(self.0 as i64)
        } else {
            Value::from(self.0)
        }
    }

    fn is_integral(self) -> bool {
        self.0.is_finite() && self.0.fract() == 0.0 && self.0.abs() < 1e15
    }
}

impl fmt::Display for Limit {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Compiled regular expression, searched anywhere in the text
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

/// Constraints checked after a value has been coerced to its type
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub gt: Option<Limit>,
    pub ge: Option<Limit>,
    pub lt: Option<Limit>,
    pub le: Option<Limit>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn gt(mut self, bound: f64) -> Self {
        self.gt = Some(Limit(bound));
        self
    }

    #[must_use]
    pub fn ge(mut self, bound: f64) -> Self {
        self.ge = Some(Limit(bound));
        self
    }

    #[must_use]
    pub fn lt(mut self, bound: f64) -> Self {
        self.lt = Some(Limit(bound));
        self
    }

    #[must_use]
    pub fn le(mut self, bound: f64) -> Self {
        self.le = Some(Limit(bound));
        self
    }

    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, source: &str) -> Result<Self, regex::Error> {
        self.pattern = Some(Pattern::new(source)?);
        Ok(self)
    }
}

/// Documentation metadata, never consulted while binding
#[derive(Debug, Clone, Default)]
pub struct Docs {
    pub title: Option<&'static str>,
    pub description: Option<&'static str>,
    pub deprecated: bool,
}

/// A named, typed slot in a record or parameter list
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    /// `None` makes the field required
    pub default: Option<Value>,
    pub constraints: Constraints,
    pub docs: Docs,
}

impl Field {
    /// Field without a default
    pub fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            default: None,
            constraints: Constraints::default(),
            docs: Docs::default(),
        }
    }

    /// Nullable field defaulting to `null`
    pub fn optional(name: &'static str, ty: FieldType) -> Self {
        Self::with_default(name, FieldType::optional(ty), Value::Null)
    }

    pub fn with_default(name: &'static str, ty: FieldType, default: Value) -> Self {
        Self {
            default: Some(default),
            ..Self::required(name, ty)
        }
    }

    #[must_use]
    pub fn constrained(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    #[must_use]
    pub fn title(mut self, title: &'static str) -> Self {
        self.docs.title = Some(title);
        self
    }

    #[must_use]
    pub fn description(mut self, description: &'static str) -> Self {
        self.docs.description = Some(description);
        self
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.docs.deprecated = true;
        self
    }

    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Ordered set of fields making up a structured record
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: Vec<Field>,
}

impl RecordSchema {
    pub const fn new(name: &'static str, fields: Vec<Field>) -> Self {
        Self { name, fields }
    }
}

/// A record type whose wire shape is described by a [`RecordSchema`]
///
/// The serde representation must list the same fields in the same order
/// so that handlers can deserialize bound values and serialize results.
pub trait Model: Serialize + DeserializeOwned {
    fn schema() -> RecordSchema;

    fn field_type() -> FieldType {
        FieldType::record(Self::schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_expected() {
        let schema = EnumSchema {
            name: "ModelName",
            values: &["alexnet", "resnet", "lenet"],
        };
        assert_eq!(schema.expected(), "'alexnet', 'resnet' or 'lenet'");
        assert!(schema.contains("lenet"));
        assert!(!schema.contains("LeNet"));

        let single = EnumSchema {
            name: "One",
            values: &["only"],
        };
        assert_eq!(single.expected(), "'only'");
    }

    #[test]
    fn test_limit_display() {
        assert_eq!(Limit(0.0).to_string(), "0");
        assert_eq!(Limit(1000.0).to_string(), "1000");
        assert_eq!(Limit(10.5).to_string(), "10.5");
        assert_eq!(Limit(0.0).to_json(), serde_json::json!(0));
        assert_eq!(Limit(10.5).to_json(), serde_json::json!(10.5));
    }

    #[test]
    fn test_field_defaults() {
        let required = Field::required("q", FieldType::Str);
        assert!(required.is_required());

        let optional = Field::optional("q", FieldType::Str);
        assert!(!optional.is_required());
        assert_eq!(optional.default, Some(Value::Null));
        assert!(matches!(optional.ty, FieldType::Optional(_)));
    }

    #[test]
    fn test_is_sequence() {
        assert!(FieldType::list(FieldType::Str).is_sequence());
        assert!(FieldType::optional(FieldType::set(FieldType::Int)).is_sequence());
        assert!(!FieldType::Str.is_sequence());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Constraints::new().pattern("^fixedquery$").is_ok());
        assert!(Constraints::new().pattern("(").is_err());
    }
}
