//! reqbind
//!
//! A small HTTP/1.1 server whose endpoints declare their parameters as
//! schemas. Requests are bound and validated before any handler runs:
//! - path, query and JSON body parameters with lax coercion
//! - numeric, length and pattern constraints
//! - closed enumerations, URLs, nested records, lists, sets and maps
//! - aggregated `422` error reports
//! - an OpenAPI 3.1 document and Swagger UI page

pub mod binding;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod openapi;
pub mod routing;
pub mod server;

pub use error::StartupError;
