//! Server trust decision
//!
//! Exactly one of three evaluators is chosen, with fixed precedence:
//!
//! 1. verification disabled: [`TrustEvaluator::InsecureAcceptAll`]
//! 2. trust store configured: [`TrustEvaluator::TrustStore`], its anchors only
//! 3. otherwise: [`TrustEvaluator::PlatformDefault`]
//!
//! A trust store replaces the platform anchors, it never augments them.

use super::config::TlsConfig;
use super::error::TlsContextError;
use super::store::KeyStore;
use openssl::error::ErrorStack;
use openssl::ssl::{SslContextBuilder, SslVerifyMode};
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509StoreContext, X509};
use std::fmt;
use std::path::PathBuf;

/// Which trust decision an evaluator represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustKind {
    /// Every chain and hostname is accepted. Insecure.
    InsecureAcceptAll,
    /// Chains must lead to an anchor from the configured trust store
    TrustStore,
    /// Chains must lead to an anchor from the platform's default locations
    PlatformDefault,
}

impl TrustKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustKind::InsecureAcceptAll => "insecure-accept-all",
            TrustKind::TrustStore => "trust-store",
            TrustKind::PlatformDefault => "platform-default",
        }
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, TrustKind::InsecureAcceptAll)
    }
}

impl fmt::Display for TrustKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server certificate trust evaluator
#[derive(Clone)]
pub enum TrustEvaluator {
    /// Accepts any certificate chain for any hostname
    InsecureAcceptAll,
    /// Validates against the anchors of one trust store
    TrustStore { path: PathBuf, anchors: Vec<X509> },
    /// Validates against the platform's default anchors
    PlatformDefault,
}

impl TrustEvaluator {
    /// Decide trust from a TLS configuration
    ///
    /// The trust store is not opened at all when verification is disabled.
    pub fn from_config(config: &TlsConfig) -> Result<Self, TlsContextError> {
        if config.verify_disabled() {
            if let Some(path) = config.trust_store_path() {
                tracing::warn!(
                    path = %path.display(),
                    "trust store ignored because certificate verification is disabled"
                );
            }
            return Ok(Self::insecure());
        }

        let material = KeyStore::load(config.trust_store_path(), config.trust_store_password())?;
        Self::from_material(material.as_ref(), false)
    }

    /// Decide trust from already loaded material
    pub fn from_material(
        material: Option<&KeyStore>,
        verify_disabled: bool,
    ) -> Result<Self, TlsContextError> {
        if verify_disabled {
            return Ok(Self::insecure());
        }

        let Some(store) = material else {
            tracing::debug!(trust = %TrustKind::PlatformDefault, "using platform trust anchors");
            return Ok(TrustEvaluator::PlatformDefault);
        };

        let anchors: Vec<X509> = store.certificates().cloned().collect();
        if anchors.is_empty() {
            return Err(TlsContextError::EmptyTrustStore {
                path: store.path().to_path_buf(),
            });
        }

        for anchor in store.entries() {
            tracing::debug!(trust = %TrustKind::TrustStore, anchor = %anchor, "trust anchor");
        }

        Ok(TrustEvaluator::TrustStore {
            path: store.path().to_path_buf(),
            anchors,
        })
    }

    /// The always-accept evaluator
    pub fn insecure() -> Self {
        tracing::warn!(
            trust = %TrustKind::InsecureAcceptAll,
            "TLS server certificate verification is DISABLED"
        );
        TrustEvaluator::InsecureAcceptAll
    }

    pub fn kind(&self) -> TrustKind {
        match self {
            TrustEvaluator::InsecureAcceptAll => TrustKind::InsecureAcceptAll,
            TrustEvaluator::TrustStore { .. } => TrustKind::TrustStore,
            TrustEvaluator::PlatformDefault => TrustKind::PlatformDefault,
        }
    }

    pub fn is_insecure(&self) -> bool {
        self.kind().is_insecure()
    }

    /// Configured trust anchors; empty for the other two evaluators
    pub fn anchors(&self) -> &[X509] {
        match self {
            TrustEvaluator::TrustStore { anchors, .. } => anchors,
            _ => &[],
        }
    }

    /// Build the certificate store this evaluator validates against
    ///
    /// Returns `None` for the always-accept evaluator, which has none. A new
    /// store is built on every call; for [`TrustEvaluator::PlatformDefault`]
    /// that means loading the system anchors from disk again.
    pub fn cert_store(&self) -> Result<Option<X509Store>, ErrorStack> {
        let mut builder = X509StoreBuilder::new()?;
        match self {
            TrustEvaluator::InsecureAcceptAll => return Ok(None),
            TrustEvaluator::TrustStore { anchors, .. } => {
                for anchor in anchors {
                    builder.add_cert(anchor.clone())?;
                }
            }
            TrustEvaluator::PlatformDefault => builder.set_default_paths()?,
        }
        Ok(Some(builder.build()))
    }

    /// Evaluate a certificate chain, leaf first
    ///
    /// Only the chain of trust is checked here; hostname matching happens
    /// during the handshake. An empty chain is rejected by every evaluator
    /// except the always-accept one.
    ///
    /// Builds a fresh store through [`cert_store`](Self::cert_store) each
    /// time, so checking many chains this way repeats the anchor loading.
    /// Handshakes do not go through here: [`TlsContext`](super::TlsContext)
    /// installs the store once when it is built.
    pub fn verify_chain(&self, chain: &[X509]) -> Result<bool, ErrorStack> {
        let Some(store) = self.cert_store()? else {
            return Ok(true);
        };
        let Some((leaf, rest)) = chain.split_first() else {
            return Ok(false);
        };

        let mut intermediates = Stack::new()?;
        for cert in rest {
            intermediates.push(cert.clone())?;
        }

        let mut ctx = X509StoreContext::new()?;
        ctx.init(&store, leaf, &intermediates, |c| c.verify_cert())
    }

    /// Install this decision into an OpenSSL context
    pub(crate) fn configure(&self, builder: &mut SslContextBuilder) -> Result<(), ErrorStack> {
        match self {
            TrustEvaluator::InsecureAcceptAll => builder.set_verify(SslVerifyMode::NONE),
            TrustEvaluator::TrustStore { .. } => {
                if let Some(store) = self.cert_store()? {
                    builder.set_cert_store(store);
                }
                builder.set_verify(SslVerifyMode::PEER);
            }
            TrustEvaluator::PlatformDefault => {
                builder.set_default_verify_paths()?;
                builder.set_verify(SslVerifyMode::PEER);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TrustEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustEvaluator::TrustStore { path, anchors } => f
                .debug_struct("TrustStore")
                .field("path", path)
                .field("anchors", &anchors.len())
                .finish(),
            other => f.write_str(match other.kind() {
                TrustKind::InsecureAcceptAll => "InsecureAcceptAll",
                _ => "PlatformDefault",
            }),
        }
    }
}
