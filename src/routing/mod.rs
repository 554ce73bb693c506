//! Routing module
//!
//! Provides the dispatch table for the application:
//! - Path templates with `{name}` captures
//! - (method, template) lookup in declaration order
//! - Method-not-allowed and trailing-slash redirect outcomes

mod matcher;
mod table;

pub use matcher::{toggle_trailing_slash, PathTemplate};
pub use table::{Lookup, Route, RouteTable};
