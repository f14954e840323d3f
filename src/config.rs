//! Client configuration
//!
//! [`HttpClientConfig`] is a snapshot produced by [`HttpClientConfigBuilder`].
//! The builder is mutable and reusable; `build()` copies its state, so later
//! setter calls never reach a configuration that was already built.
//!
//! Unset fields stay unset. An absent timeout means "engine default", an
//! absent engine is resolved by [`HttpClient`](crate::HttpClient), and an
//! absent TLS config means plaintext or the engine's default TLS.

use crate::filter::{FilterChain, RequestFilter};
use crate::tls::TlsConfig;
use std::fmt;
use std::time::Duration;

/// HTTP engine selection
///
/// A closed set: every variant has an implementation in [`crate::engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// One connection per call, closed after the response
    Simple,
    /// Keep-alive connections reused through an idle pool
    Pooled,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Simple => "simple",
            EngineKind::Pooled => "pooled",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-specific tuning
///
/// Each variant is addressed to exactly one engine. Engines ignore blocks
/// that are not addressed to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineTuning {
    Pooled(PooledTuning),
}

impl EngineTuning {
    /// The engine this block is addressed to
    pub fn engine(&self) -> EngineKind {
        match self {
            EngineTuning::Pooled(_) => EngineKind::Pooled,
        }
    }
}

/// Tuning for [`EngineKind::Pooled`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledTuning {
    /// Retry once on a fresh connection when connecting fails or a pooled
    /// connection turns out to be dead
    pub retry_on_connection_failure: bool,
    pub connection_pool: Option<ConnectionPoolTuning>,
}

impl Default for PooledTuning {
    fn default() -> Self {
        PooledTuning {
            retry_on_connection_failure: true,
            connection_pool: None,
        }
    }
}

/// Idle connection pool limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPoolTuning {
    /// Idle connections kept across all hosts; 0 disables reuse
    pub max_idle_connections: usize,
    /// How long an idle connection may wait before it is discarded
    pub keep_alive: Duration,
}

impl ConnectionPoolTuning {
    pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 5;
    pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(5 * 60);

    pub fn new(max_idle_connections: usize, keep_alive: Duration) -> Self {
        ConnectionPoolTuning {
            max_idle_connections,
            keep_alive,
        }
    }
}

impl Default for ConnectionPoolTuning {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_IDLE_CONNECTIONS, Self::DEFAULT_KEEP_ALIVE)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Default)]
pub struct HttpClientConfig {
    engine: Option<EngineKind>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    request_filters: FilterChain,
    tls_config: Option<TlsConfig>,
    engine_tuning: Option<EngineTuning>,
}

impl HttpClientConfig {
    /// Create a new configuration builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::new()
    }

    pub fn engine(&self) -> Option<EngineKind> {
        self.engine
    }

    /// Read/write timeout applied to each socket operation of a call
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Filters in execution order
    pub fn request_filters(&self) -> &[RequestFilter] {
        self.request_filters.as_slice()
    }

    pub fn filter_chain(&self) -> &FilterChain {
        &self.request_filters
    }

    /// Append a filter to this configuration's own list
    ///
    /// The list is not shared with the builder that produced this
    /// configuration. Once the configuration is handed to an
    /// [`HttpClient`](crate::HttpClient) it can no longer be changed.
    pub fn add_request_filter(&mut self, filter: RequestFilter) -> &[RequestFilter] {
        self.request_filters.push(filter);
        self.request_filters.as_slice()
    }

    pub fn tls_config(&self) -> Option<&TlsConfig> {
        self.tls_config.as_ref()
    }

    pub fn engine_tuning(&self) -> Option<&EngineTuning> {
        self.engine_tuning.as_ref()
    }

    /// Tuning block, only if it is addressed to `engine`
    pub fn tuning_for(&self, engine: EngineKind) -> Option<&EngineTuning> {
        self.engine_tuning
            .as_ref()
            .filter(|tuning| tuning.engine() == engine)
    }
}

impl fmt::Display for HttpClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HttpClientConfig {{")?;
        match self.engine {
            Some(engine) => writeln!(f, "  engine={}", engine)?,
            None => writeln!(f, "  engine=<default>")?,
        }
        if let Some(timeout) = self.timeout {
            writeln!(f, "  timeout={:?}", timeout)?;
        }
        if let Some(connect_timeout) = self.connect_timeout {
            writeln!(f, "  connect_timeout={:?}", connect_timeout)?;
        }
        if !self.request_filters.is_empty() {
            let names: Vec<&str> = self.request_filters.iter().map(|f| f.name()).collect();
            writeln!(f, "  request_filters=[{}]", names.join(", "))?;
        }
        if let Some(tls) = &self.tls_config {
            writeln!(f, "  tls_config={:?}", tls)?;
        }
        if let Some(tuning) = &self.engine_tuning {
            writeln!(f, "  engine_tuning={:?}", tuning)?;
        }
        write!(f, "}}")
    }
}

/// Builder for [`HttpClientConfig`]
///
/// Not meant to be shared between threads while a build sequence is in
/// progress; clone it instead.
#[derive(Debug, Clone, Default)]
pub struct HttpClientConfigBuilder {
    engine: Option<EngineKind>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    request_filters: Vec<RequestFilter>,
    tls_config: Option<TlsConfig>,
    engine_tuning: Option<EngineTuning>,
}

impl HttpClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Replace the whole filter list
    pub fn request_filters(mut self, filters: Vec<RequestFilter>) -> Self {
        self.request_filters = filters;
        self
    }

    /// Append one filter after those already set
    pub fn add_request_filter(mut self, filter: RequestFilter) -> Self {
        self.request_filters.push(filter);
        self
    }

    pub fn tls_config(mut self, tls_config: TlsConfig) -> Self {
        self.tls_config = Some(tls_config);
        self
    }

    pub fn engine_tuning(mut self, tuning: EngineTuning) -> Self {
        self.engine_tuning = Some(tuning);
        self
    }

    /// Snapshot the builder into an immutable configuration
    pub fn build(&self) -> HttpClientConfig {
        HttpClientConfig {
            engine: self.engine,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            request_filters: self.request_filters.iter().cloned().collect(),
            tls_config: self.tls_config.clone(),
            engine_tuning: self.engine_tuning.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(config: &HttpClientConfig) -> Vec<&str> {
        config.request_filters().iter().map(|f| f.name()).collect()
    }

    #[test]
    fn test_unset_fields_are_absent() {
        let config = HttpClientConfig::builder().build();

        assert_eq!(config.engine(), None);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.connect_timeout(), None);
        assert!(config.request_filters().is_empty());
        assert!(config.tls_config().is_none());
        assert!(config.engine_tuning().is_none());
    }

    #[test]
    fn test_last_set_value_wins() {
        let config = HttpClientConfig::builder()
            .engine(EngineKind::Simple)
            .timeout(Duration::from_secs(1))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_millis(500))
            .engine(EngineKind::Pooled)
            .tls_config(TlsConfig::new().with_verify_disabled(true))
            .build();

        assert_eq!(config.engine(), Some(EngineKind::Pooled));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.connect_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(config.tls_config(), Some(&TlsConfig::new().with_verify_disabled(true)));
    }

    #[test]
    fn test_filter_append_order() {
        let config = HttpClientConfig::builder()
            .add_request_filter(RequestFilter::observe_request("f1", |_| {}))
            .add_request_filter(RequestFilter::observe_request("f2", |_| {}))
            .build();

        assert_eq!(names(&config), vec!["f1", "f2"]);
    }

    #[test]
    fn test_request_filters_replaces_list() {
        let config = HttpClientConfig::builder()
            .add_request_filter(RequestFilter::observe_request("dropped", |_| {}))
            .request_filters(vec![RequestFilter::observe_request("kept", |_| {})])
            .add_request_filter(RequestFilter::observe_request("appended", |_| {}))
            .build();

        assert_eq!(names(&config), vec!["kept", "appended"]);
    }

    #[test]
    fn test_builder_changes_after_build_are_isolated() {
        let builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(5))
            .add_request_filter(RequestFilter::observe_request("f1", |_| {}));
        let first = builder.build();

        let builder = builder
            .timeout(Duration::from_secs(9))
            .add_request_filter(RequestFilter::observe_request("f2", |_| {}));
        let second = builder.build();

        assert_eq!(first.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(names(&first), vec!["f1"]);
        assert_eq!(second.timeout(), Some(Duration::from_secs(9)));
        assert_eq!(names(&second), vec!["f1", "f2"]);
    }

    #[test]
    fn test_add_filter_to_built_config_is_local() {
        let builder =
            HttpClientConfig::builder().add_request_filter(RequestFilter::observe_request("f1", |_| {}));
        let mut config = builder.build();

        let filters = config.add_request_filter(RequestFilter::observe_response("f2", |_, _| {}));
        assert_eq!(filters.len(), 2);

        assert_eq!(names(&config), vec!["f1", "f2"]);
        assert_eq!(names(&builder.build()), vec!["f1"]);
    }

    #[test]
    fn test_tuning_is_addressed() {
        let tuning = EngineTuning::Pooled(PooledTuning {
            retry_on_connection_failure: false,
            connection_pool: Some(ConnectionPoolTuning::new(2, Duration::from_secs(10))),
        });
        let config = HttpClientConfig::builder()
            .engine(EngineKind::Simple)
            .engine_tuning(tuning.clone())
            .build();

        assert_eq!(config.engine_tuning(), Some(&tuning));
        assert_eq!(config.tuning_for(EngineKind::Pooled), Some(&tuning));
        assert_eq!(config.tuning_for(EngineKind::Simple), None);
    }

    #[test]
    fn test_display_lists_set_fields_only() {
        let config = HttpClientConfig::builder()
            .engine(EngineKind::Simple)
            .timeout(Duration::from_secs(3))
            .build();
        let shown = config.to_string();

        assert!(shown.contains("engine=simple"));
        assert!(shown.contains("timeout=3s"));
        assert!(!shown.contains("connect_timeout"));
        assert!(!shown.contains("tls_config"));
    }
}
