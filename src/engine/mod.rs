//! HTTP engines
//!
//! Every backend implements [`HttpEngine`]. The set of engines is closed and
//! mirrors [`EngineKind`]:
//!
//! - [`SimpleEngine`]: one connection per call, `Connection: close`
//! - [`PooledEngine`]: keep-alive connections reused through an idle pool
//!
//! Both build their [`TlsContext`] once, at construction, from the
//! configuration's [`TlsConfig`] or from platform defaults when none is set.
//! A construction error means no engine exists.
//!
//! # Examples
//!
//! ```no_run
//! use http_facade::engine::{HttpEngine, SimpleEngine};
//! use http_facade::{HttpClientConfig, HttpRequest};
//! use std::sync::Arc;
//!
//! let engine = SimpleEngine::new(Arc::new(HttpClientConfig::default())).unwrap();
//! let response = engine.execute(HttpRequest::get("http://127.0.0.1:8080/").unwrap()).unwrap();
//! println!("{}", response.status_code());
//! ```

pub mod pool;
pub mod pooled;
pub mod simple;
pub mod transport;
pub mod wire;

pub use pool::ConnectionPool;
pub use pooled::PooledEngine;
pub use simple::SimpleEngine;
pub use transport::{Connection, Connector, Stream, Target};

use crate::config::{EngineKind, HttpClientConfig};
use crate::message::{HttpRequest, HttpResponse};
use crate::tls::{TlsConfig, TlsContext};
use crate::Result;

/// Contract implemented by every engine
///
/// An engine is built from a frozen [`HttpClientConfig`], honours its
/// timeouts, TLS settings and filters, and may be shared between threads.
pub trait HttpEngine: Send + Sync {
    /// Which [`EngineKind`] this engine implements
    fn kind(&self) -> EngineKind;

    /// The configuration the engine was built from
    fn config(&self) -> &HttpClientConfig;

    /// TLS context used for `https` targets
    fn tls_context(&self) -> &TlsContext;

    /// Run the filter chain, send `request` and return the response
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Build the connector shared by both engines
pub(crate) fn connector(config: &HttpClientConfig) -> Result<Connector> {
    let tls = match config.tls_config() {
        Some(tls) => TlsContext::from_config(tls)?,
        None => TlsContext::from_config(&TlsConfig::default())?,
    };
    Ok(Connector::new(tls, config.connect_timeout(), config.timeout()))
}

/// One request/response exchange over `conn`
///
/// Returns the response and whether the connection may be reused.
pub(crate) fn exchange(
    conn: &mut Connection,
    request: &HttpRequest,
    target: &Target,
    keep_alive: bool,
) -> Result<(HttpResponse, bool)> {
    wire::write_request(conn.get_mut(), request, target, keep_alive)?;
    let (response, reusable) = wire::read_response(conn, request.method())?;

    tracing::debug!(
        method = %request.method(),
        url = %request.url(),
        status = response.status_code(),
        reusable,
        "exchange complete"
    );

    Ok((response, keep_alive && reusable))
}
