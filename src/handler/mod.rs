//! Request handler module
//!
//! Responsible for request routing dispatch and the endpoint definitions.

pub mod endpoints;
pub mod models;
pub mod router;

// Re-export main entry points
pub use endpoints::{routes, Endpoint, Handler, HandlerError};
pub use router::{dispatch, handle_request};
