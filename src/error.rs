//! Startup error type
//!
//! Everything that can stop the server before it accepts connections.

use std::io;
use std::net::{AddrParseError, SocketAddr};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid listen address '{addr}'")]
    Address {
        addr: String,
        #[source]
        source: AddrParseError,
    },
    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to open log files")]
    Log(#[source] io::Error),
    #[error("failed to build runtime")]
    Runtime(#[source] io::Error),
    #[error("failed to encode API document")]
    Document(#[source] serde_json::Error),
}
