//! Request binding module
//!
//! Declarative parameter schemas and the generic binder built on them:
//! - Schema types (field types, constraints, records, enumerations)
//! - Lax coercion of path/query text and JSON bodies
//! - Aggregated, field-addressed validation errors

mod coerce;
mod error;
mod params;
mod schema;

pub use coerce::{validate, validate_record};
pub use error::{ErrorKind, Loc, LocSegment, Source, ValidationError, ValidationErrors};
pub use params::{
    bind, body_is_embedded, parse_query, Bound, ExtractError, Param, RawRequest,
};
pub use schema::{
    Constraints, Docs, EnumSchema, Field, FieldType, Limit, Model, Pattern, RecordSchema,
};
