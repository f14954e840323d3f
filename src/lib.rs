//! http-facade - vendor-neutral HTTP client facade
//!
//! Callers configure timeouts, TLS, connection pooling and request filters
//! once, against [`HttpClientConfig`], and the call is dispatched to one of a
//! closed set of interchangeable engines.
//!
//! # Architecture
//!
//! - [`HttpClientConfig`] is an immutable snapshot produced by a mutable builder
//! - [`tls`] turns declarative [`TlsConfig`] settings into a ready [`TlsContext`]
//! - [`engine::HttpEngine`] is the contract every backend implements
//! - [`HttpClient`] freezes the configuration and owns the selected engine
//!
//! # Examples
//!
//! ```no_run
//! use http_facade::{EngineKind, HttpClient, HttpClientConfig, TlsConfig};
//! use std::time::Duration;
//!
//! let config = HttpClientConfig::builder()
//!     .engine(EngineKind::Pooled)
//!     .connect_timeout(Duration::from_secs(2))
//!     .timeout(Duration::from_secs(10))
//!     .tls_config(TlsConfig::new().with_trust_store("ca.p12", "changeit"))
//!     .build();
//!
//! let client = HttpClient::new(config).unwrap();
//! let response = client.get("https://localhost:8443/health").unwrap();
//! assert_eq!(response.status_code(), 200);
//! ```

pub mod client;
pub mod config;
pub mod engine;
pub mod filter;
pub mod message;
pub mod tls;

pub use client::HttpClient;
pub use config::{
    ConnectionPoolTuning, EngineKind, EngineTuning, HttpClientConfig, HttpClientConfigBuilder,
    PooledTuning,
};
pub use filter::{FilterChain, FilterKind, RequestFilter};
pub use message::{HeaderMap, HttpRequest, HttpRequestBuilder, HttpResponse, Method};
pub use tls::{TlsConfig, TlsContext, TlsContextError};

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS context error: {0}")]
    Tls(#[from] TlsContextError),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Map an I/O error, folding socket timeouts into [`Error::Timeout`]
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Error::Timeout,
            std::io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
            _ => Error::Io(err),
        }
    }
}

/// Maximum number of headers accepted in a response
pub const MAX_HEADERS: usize = 64;

/// Maximum length of a status, header or chunk-size line
pub const MAX_LINE_LEN: usize = 8192;

/// Maximum response body size accepted by the in-crate engines
pub const MAX_BODY_LEN: usize = 64 * 1024 * 1024;

/// Maximum number of interim `1xx` responses skipped before the final one
pub const MAX_INTERIM_RESPONSES: usize = 8;

/// CRLF line ending
pub const CRLF: &str = "\r\n";
