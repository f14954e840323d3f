//! The caller-facing client
//!
//! [`HttpClient`] freezes an [`HttpClientConfig`] and owns the engine it
//! selects. After construction neither the configuration nor the filter
//! list can change.

use crate::config::{EngineKind, HttpClientConfig};
use crate::engine::{HttpEngine, PooledEngine, SimpleEngine};
use crate::message::{HttpRequest, HttpResponse, Method};
use crate::Result;
use bytes::Bytes;
use std::sync::Arc;

/// Engine used when the configuration does not name one
pub const DEFAULT_ENGINE: EngineKind = EngineKind::Pooled;

/// HTTP client bound to one engine
///
/// `Send + Sync`; share it behind an [`Arc`] to issue calls from many
/// threads.
pub struct HttpClient {
    config: Arc<HttpClientConfig>,
    engine: Box<dyn HttpEngine>,
}

impl HttpClient {
    /// Freeze `config` and build the engine it selects
    ///
    /// Fails when the TLS settings cannot be turned into a context.
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let config = Arc::new(config);
        let kind = config.engine().unwrap_or(DEFAULT_ENGINE);

        let engine: Box<dyn HttpEngine> = match kind {
            EngineKind::Simple => Box::new(SimpleEngine::new(Arc::clone(&config))?),
            EngineKind::Pooled => Box::new(PooledEngine::new(Arc::clone(&config))?),
        };

        tracing::debug!(engine = %kind, "HTTP client created");
        Ok(HttpClient { config, engine })
    }

    /// Wrap an engine built elsewhere; its configuration becomes the client's
    pub fn from_engine<E: HttpEngine + 'static>(engine: E) -> Self {
        let config = Arc::new(engine.config().clone());
        HttpClient {
            config,
            engine: Box::new(engine),
        }
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn engine(&self) -> &dyn HttpEngine {
        self.engine.as_ref()
    }

    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.engine.execute(request)
    }

    pub fn get(&self, url: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::get(url)?)
    }

    pub fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<HttpResponse> {
        self.send(HttpRequest::builder(Method::Post, url).body(body).build()?)
    }

    pub fn put(&self, url: &str, body: impl Into<Bytes>) -> Result<HttpResponse> {
        self.send(HttpRequest::builder(Method::Put, url).body(body).build()?)
    }

    pub fn delete(&self, url: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::builder(Method::Delete, url).build()?)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("engine", &self.engine.kind())
            .field("config", &self.config)
            .finish()
    }
}
