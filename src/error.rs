//! Crate error type
//!
//! Only setup and transport failures are errors. Request-level failures are
//! expressed as HTTP responses (405, 404) or as requests that never complete.

use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("failed to open log files: {0}")]
    Logger(#[source] std::io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
