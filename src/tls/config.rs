//! Declarative TLS settings
//!
//! A [`TlsConfig`] names where key and trust material live. Nothing is read
//! or checked here; [`TlsContext::from_config`](super::TlsContext::from_config)
//! validates the combination and fails fast on first use.

use std::fmt;
use std::path::{Path, PathBuf};

/// TLS configuration
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    key_store_path: Option<PathBuf>,
    key_store_password: Option<String>,
    trust_store_path: Option<PathBuf>,
    trust_store_password: Option<String>,
    verify_disabled: bool,
}

impl TlsConfig {
    /// Empty configuration: no client certificate, platform trust anchors
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client key store and its password together
    pub fn with_key_store(self, path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        self.with_key_store_path(path).with_key_store_password(password)
    }

    pub fn with_key_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_store_path = Some(path.into());
        self
    }

    pub fn with_key_store_password(mut self, password: impl Into<String>) -> Self {
        self.key_store_password = Some(password.into());
        self
    }

    /// Set the trust store and its password together
    pub fn with_trust_store(self, path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        self.with_trust_store_path(path).with_trust_store_password(password)
    }

    /// Set the trust store path; without a password the store is opened
    /// with the empty password
    pub fn with_trust_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trust_store_path = Some(path.into());
        self
    }

    pub fn with_trust_store_password(mut self, password: impl Into<String>) -> Self {
        self.trust_store_password = Some(password.into());
        self
    }

    /// Disable server certificate verification entirely
    ///
    /// Any configured trust store is ignored while this is set. Only use it
    /// against endpoints you control.
    pub fn with_verify_disabled(mut self, disabled: bool) -> Self {
        self.verify_disabled = disabled;
        self
    }

    pub fn key_store_path(&self) -> Option<&Path> {
        self.key_store_path.as_deref()
    }

    pub fn key_store_password(&self) -> Option<&str> {
        self.key_store_password.as_deref()
    }

    pub fn trust_store_path(&self) -> Option<&Path> {
        self.trust_store_path.as_deref()
    }

    pub fn trust_store_password(&self) -> Option<&str> {
        self.trust_store_password.as_deref()
    }

    pub fn verify_disabled(&self) -> bool {
        self.verify_disabled
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |p: &Option<String>| p.as_ref().map(|_| "<redacted>");
        f.debug_struct("TlsConfig")
            .field("key_store_path", &self.key_store_path)
            .field("key_store_password", &redact(&self.key_store_password))
            .field("trust_store_path", &self.trust_store_path)
            .field("trust_store_password", &redact(&self.trust_store_password))
            .field("verify_disabled", &self.verify_disabled)
            .finish()
    }
}
