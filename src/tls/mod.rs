//! TLS trust establishment
//!
//! Turns declarative [`TlsConfig`] settings into a working [`TlsContext`]:
//!
//! 1. [`KeyStore`] loads PKCS#12 key and trust material from disk
//! 2. [`TrustEvaluator`] decides how server certificates are judged
//! 3. [`TlsContext::from_config`] composes both into an OpenSSL client context
//!
//! Construction is all-or-nothing and fails closed: a store that cannot be
//! loaded aborts construction, it never downgrades to "trust everything".
//! Disabling verification is only ever an explicit choice through
//! [`TlsConfig::with_verify_disabled`].
//!
//! # Examples
//!
//! ```no_run
//! use http_facade::tls::{TlsConfig, TlsContext, TrustKind};
//!
//! let config = TlsConfig::new()
//!     .with_key_store("client.p12", "changeit")
//!     .with_trust_store("ca.p12", "changeit");
//!
//! let ctx = TlsContext::from_config(&config).unwrap();
//! assert_eq!(ctx.trust_kind(), TrustKind::TrustStore);
//! ```

pub mod cert;
pub mod config;
pub mod context;
pub mod error;
pub mod store;
pub mod trust;

pub use cert::CertInfo;
pub use config::TlsConfig;
pub use context::TlsContext;
pub use error::{ConfigurationError, TlsContextError, TlsMaterialError};
pub use store::KeyStore;
pub use trust::{TrustEvaluator, TrustKind};

/// Result type for TLS context construction
pub type Result<T> = std::result::Result<T, TlsContextError>;
