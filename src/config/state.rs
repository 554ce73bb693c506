// Application state module
// Holds the configuration, the route table and the pre-rendered API document

use hyper::body::Bytes;
use std::sync::atomic::AtomicBool;

use super::types::Config;
use crate::error::StartupError;
use crate::handler;
use crate::openapi;
use crate::routing::RouteTable;

/// Application state shared by every connection
pub struct AppState {
    pub config: Config,
    pub routes: RouteTable,
    /// Encoded OpenAPI document, rendered once at startup
    pub openapi: Bytes,

    // Cached config values for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, StartupError> {
        let routes = handler::routes();
        let document = openapi::build_document(&routes, &config.docs);
        let openapi = Bytes::from(serde_json::to_vec(&document).map_err(StartupError::Document)?);

        Ok(Self {
            config: config.clone(),
            routes,
            openapi,
            cached_access_log: AtomicBool::new(config.logging.access_log),
        })
    }
}
