//! Validation errors
//!
//! Every failed check produces one [`ValidationError`] addressed by its
//! location (`["query", "size"]`, `["body", "item", "price"]`, ...).
//! Errors are aggregated into [`ValidationErrors`] and rendered as the
//! `detail` list of a 422 response.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use super::schema::Limit;

/// Where a parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Path,
    Query,
    Body,
}

impl Source {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of an error location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocSegment {
    Key(String),
    Index(usize),
}

/// Path from the request source down to the offending value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Loc(Vec<LocSegment>);

impl Loc {
    pub fn root(source: Source) -> Self {
        Self(vec![LocSegment::Key(source.as_str().to_string())])
    }

    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(LocSegment::Key(key.into()));
        Self(segments)
    }

    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(LocSegment::Index(index));
        Self(segments)
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                LocSegment::Key(key) => f.write_str(key)?,
                LocSegment::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

/// The violated rule; `Display` renders the client-facing message
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("Field required")]
    Missing,
    #[error("Input should be a valid integer, unable to parse string as an integer")]
    IntParsing,
    #[error("Input should be a valid integer")]
    IntType,
    #[error("Input should be a valid integer, got a number with a fractional part")]
    IntFromFloat,
    #[error("Input should be a valid number, unable to parse string as a number")]
    FloatParsing,
    #[error("Input should be a valid number")]
    FloatType,
    #[error("Input should be a valid boolean, unable to interpret input")]
    BoolParsing,
    #[error("Input should be a valid boolean")]
    BoolType,
    #[error("Input should be a valid string")]
    StringType,
    #[error("Input should be {expected}")]
    Enum { expected: String },
    #[error("Input should be a valid URL, {error}")]
    UrlParsing { error: String },
    #[error("URL scheme should be 'http' or 'https'")]
    UrlScheme,
    #[error("Input should be a valid list")]
    ListType,
    #[error("Input should be a valid set")]
    SetType,
    #[error("Input should be a valid dictionary")]
    DictType,
    #[error("Input should be a valid dictionary or object to extract fields from")]
    ModelAttributesType,
    #[error("Input should be greater than {gt}")]
    GreaterThan { gt: Limit },
    #[error("Input should be greater than or equal to {ge}")]
    GreaterThanEqual { ge: Limit },
    #[error("Input should be less than {lt}")]
    LessThan { lt: Limit },
    #[error("Input should be less than or equal to {le}")]
    LessThanEqual { le: Limit },
    #[error("String should have at least {}", characters(.min_length))]
    StringTooShort { min_length: usize },
    #[error("String should have at most {}", characters(.max_length))]
    StringTooLong { max_length: usize },
    #[error("String should match pattern '{pattern}'")]
    StringPatternMismatch { pattern: String },
    #[error("JSON decode error")]
    JsonInvalid { error: String },
}

fn characters(count: &usize) -> String {
    if *count == 1 {
        "1 character".to_string()
    } else {
        format!("{count} characters")
    }
}

impl ErrorKind {
    /// Stable identifier rendered as the `type` field
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::IntParsing => "int_parsing",
            Self::IntType => "int_type",
            Self::IntFromFloat => "int_from_float",
            Self::FloatParsing => "float_parsing",
            Self::FloatType => "float_type",
            Self::BoolParsing => "bool_parsing",
            Self::BoolType => "bool_type",
            Self::StringType => "string_type",
            Self::Enum { .. } => "enum",
            Self::UrlParsing { .. } => "url_parsing",
            Self::UrlScheme => "url_scheme",
            Self::ListType => "list_type",
            Self::SetType => "set_type",
            Self::DictType => "dict_type",
            Self::ModelAttributesType => "model_attributes_type",
            Self::GreaterThan { .. } => "greater_than",
            Self::GreaterThanEqual { .. } => "greater_than_equal",
            Self::LessThan { .. } => "less_than",
            Self::LessThanEqual { .. } => "less_than_equal",
            Self::StringTooShort { .. } => "string_too_short",
            Self::StringTooLong { .. } => "string_too_long",
            Self::StringPatternMismatch { .. } => "string_pattern_mismatch",
            Self::JsonInvalid { .. } => "json_invalid",
        }
    }

    /// The violated bound, if the rule has one
    pub fn ctx(&self) -> Option<Value> {
        let ctx = match self {
            Self::Enum { expected } => serde_json::json!({ "expected": expected }),
            Self::UrlParsing { error } | Self::JsonInvalid { error } => {
                serde_json::json!({ "error": error })
            }
            Self::UrlScheme => serde_json::json!({ "expected_schemes": "'http' or 'https'" }),
            Self::GreaterThan { gt } => serde_json::json!({ "gt": gt.to_json() }),
            Self::GreaterThanEqual { ge } => serde_json::json!({ "ge": ge.to_json() }),
            Self::LessThan { lt } => serde_json::json!({ "lt": lt.to_json() }),
            Self::LessThanEqual { le } => serde_json::json!({ "le": le.to_json() }),
            Self::StringTooShort { min_length } => serde_json::json!({ "min_length": min_length }),
            Self::StringTooLong { max_length } => serde_json::json!({ "max_length": max_length }),
            Self::StringPatternMismatch { pattern } => serde_json::json!({ "pattern": pattern }),
            _ => return None,
        };
        Some(ctx)
    }
}

/// A single failed check
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{loc}: {kind}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub loc: Loc,
    /// The offending raw value, `null` when it was missing
    pub input: Value,
}

impl ValidationError {
    pub const fn new(kind: ErrorKind, loc: Loc, input: Value) -> Self {
        Self { kind, loc, input }
    }

    pub const fn missing(loc: Loc, input: Value) -> Self {
        Self::new(ErrorKind::Missing, loc, input)
    }
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ctx = self.kind.ctx();
        let mut map = serializer.serialize_map(Some(if ctx.is_some() { 5 } else { 4 }))?;
        map.serialize_entry("type", self.kind.code())?;
        map.serialize_entry("loc", &self.loc)?;
        map.serialize_entry("msg", &self.kind.to_string())?;
        map.serialize_entry("input", &self.input)?;
        if let Some(ctx) = ctx {
            map.serialize_entry("ctx", &ctx)?;
        }
        map.end()
    }
}

/// All failures collected while binding one request
#[derive(Debug, Clone, Default, PartialEq, thiserror::Error)]
#[error("{} validation error(s)", .0.len())]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Response body of a failed binding
    pub fn to_detail(&self) -> Value {
        serde_json::json!({ "detail": self.0 })
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
