//! Keep-alive engine backed by [`ConnectionPool`]

use super::{connector, exchange, Connection, ConnectionPool, Connector, HttpEngine, Target};
use crate::config::{EngineKind, EngineTuning, HttpClientConfig, PooledTuning};
use crate::message::{HttpRequest, HttpResponse};
use crate::tls::TlsContext;
use crate::{Error, Result};
use std::io;
use std::sync::Arc;

/// Reuses idle connections per target
///
/// Reads its [`PooledTuning`] from the configuration when the tuning block
/// is addressed to [`EngineKind::Pooled`], otherwise uses the defaults.
pub struct PooledEngine {
    config: Arc<HttpClientConfig>,
    connector: Connector,
    pool: ConnectionPool,
    retry_on_connection_failure: bool,
}

impl PooledEngine {
    pub fn new(config: Arc<HttpClientConfig>) -> Result<Self> {
        let tuning = match config.tuning_for(EngineKind::Pooled) {
            Some(EngineTuning::Pooled(tuning)) => tuning.clone(),
            None => PooledTuning::default(),
        };
        let pool_tuning = tuning.connection_pool.unwrap_or_default();
        let connector = connector(&config)?;

        tracing::debug!(
            trust = %connector.tls_context().trust_kind(),
            max_idle = pool_tuning.max_idle_connections,
            keep_alive = ?pool_tuning.keep_alive,
            retry = tuning.retry_on_connection_failure,
            "pooled engine ready"
        );

        Ok(PooledEngine {
            config,
            connector,
            pool: ConnectionPool::new(pool_tuning),
            retry_on_connection_failure: tuning.retry_on_connection_failure,
        })
    }

    pub fn retries_on_connection_failure(&self) -> bool {
        self.retry_on_connection_failure
    }

    /// Idle connections currently held
    pub fn idle_connections(&self) -> usize {
        self.pool.idle_count()
    }

    fn connect(&self, target: &Target) -> Result<Connection> {
        match self.connector.connect(target) {
            Err(Error::Connect { addr, source }) if self.retry_on_connection_failure => {
                tracing::debug!(%addr, error = %source, "connect failed, retrying");
                self.connector.connect(target)
            }
            other => other,
        }
    }

    fn send(&self, request: &HttpRequest, target: &Target) -> Result<HttpResponse> {
        let keep_alive = self.pool.is_enabled();

        if let Some(mut conn) = self.pool.checkout(target) {
            match exchange(&mut conn, request, target, keep_alive) {
                Ok((response, reusable)) => {
                    if reusable {
                        self.pool.checkin(target.clone(), conn);
                    }
                    return Ok(response);
                }
                Err(e) if is_stale(&e) && self.retry_on_connection_failure => {
                    tracing::debug!(error = %e, "pooled connection is stale, reconnecting");
                }
                Err(e) => return Err(e),
            }
        }

        let mut conn = self.connect(target)?;
        let (response, reusable) = exchange(&mut conn, request, target, keep_alive)?;
        if reusable {
            self.pool.checkin(target.clone(), conn);
        }
        Ok(response)
    }
}

impl HttpEngine for PooledEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Pooled
    }

    fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn tls_context(&self) -> &TlsContext {
        self.connector.tls_context()
    }

    fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let filters = self.config.filter_chain();
        filters.before_send(&mut request);

        let target = Target::from_url(request.url())?;
        let response = self.send(&request, &target)?;

        filters.after_receive(&request, &response);
        Ok(response)
    }
}

impl std::fmt::Debug for PooledEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledEngine")
            .field("connector", &self.connector)
            .field("idle_connections", &self.pool.idle_count())
            .field("retry_on_connection_failure", &self.retry_on_connection_failure)
            .finish()
    }
}

/// Failure that means the server dropped an idle connection
fn is_stale(err: &Error) -> bool {
    match err {
        Error::ConnectionClosed => true,
        Error::Io(e) => matches!(
            e.kind(),
            io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}
