//! TLS context construction
//!
//! [`TlsContext::from_config`] is the only way to obtain a context. It either
//! returns a fully initialized context or an error; nothing in between is
//! ever observable.

use super::cert::CertInfo;
use super::config::TlsConfig;
use super::error::{ConfigurationError, TlsContextError};
use super::store::KeyStore;
use super::trust::{TrustEvaluator, TrustKind};
use crate::{Error, Result as HttpResult};
use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslStream};
use std::io::{Read, Write};
use std::net::IpAddr;

/// Client credential, server trust and randomness, ready for handshakes
///
/// Immutable once built. Cloning is cheap and clones share the underlying
/// OpenSSL context, so one context can serve any number of concurrent calls.
#[derive(Clone)]
pub struct TlsContext {
    ctx: SslContext,
    trust: TrustEvaluator,
    client_certificate: Option<CertInfo>,
}

impl TlsContext {
    /// Build a context from declarative settings
    ///
    /// Loads the client key store (if any), decides server trust, verifies
    /// that the secure random source is usable and assembles the OpenSSL
    /// context. No caching: every call reads the stores again.
    pub fn from_config(config: &TlsConfig) -> Result<Self, TlsContextError> {
        validate(config)?;

        let key_store = KeyStore::load(config.key_store_path(), config.key_store_password())?;
        let trust = TrustEvaluator::from_config(config)?;

        let mut builder = SslContextBuilder::new(SslMethod::tls_client())?;

        let client_certificate = match &key_store {
            Some(store) => Some(install_client_identity(&mut builder, store)?),
            None => None,
        };

        trust.configure(&mut builder)?;

        let mut seed = [0u8; 32];
        openssl::rand::rand_bytes(&mut seed).map_err(TlsContextError::Random)?;

        tracing::debug!(
            trust = %trust.kind(),
            client_certificate = client_certificate.as_ref().map(|c| c.subject.as_str()),
            "TLS context built"
        );

        Ok(TlsContext {
            ctx: builder.build(),
            trust,
            client_certificate,
        })
    }

    /// Context with platform trust anchors and no client certificate
    pub fn platform_default() -> Result<Self, TlsContextError> {
        Self::from_config(&TlsConfig::default())
    }

    pub fn trust(&self) -> &TrustEvaluator {
        &self.trust
    }

    pub fn trust_kind(&self) -> TrustKind {
        self.trust.kind()
    }

    /// Identity presented to servers that ask for a client certificate
    pub fn client_certificate(&self) -> Option<&CertInfo> {
        self.client_certificate.as_ref()
    }

    pub fn ssl_context(&self) -> &SslContext {
        &self.ctx
    }

    /// Perform a client handshake over an established stream
    ///
    /// `host` is used for SNI and, unless verification is disabled, is
    /// checked against the server certificate.
    pub fn connect<S>(&self, host: &str, stream: S) -> HttpResult<SslStream<S>>
    where
        S: Read + Write + std::fmt::Debug,
    {
        let mut ssl = openssl::ssl::Ssl::new(&self.ctx)
            .map_err(|e| Error::Handshake(format!("Failed to create session: {}", e)))?;

        let ip = host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .ok();

        if ip.is_none() {
            ssl.set_hostname(host)
                .map_err(|e| Error::Handshake(format!("Invalid SNI name {}: {}", host, e)))?;
        }

        if !self.trust.is_insecure() {
            let param = ssl.param_mut();
            let checked = match ip {
                Some(ip) => param.set_ip(ip),
                None => param.set_host(host),
            };
            checked.map_err(|e| Error::Handshake(format!("Invalid host {}: {}", host, e)))?;
        }

        ssl.connect(stream)
            .map_err(|e| Error::Handshake(format!("Connection to {} failed: {}", host, e)))
    }
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext")
            .field("trust", &self.trust)
            .field("client_certificate", &self.client_certificate)
            .finish()
    }
}

fn validate(config: &TlsConfig) -> Result<(), ConfigurationError> {
    match (config.key_store_path(), config.key_store_password()) {
        (Some(path), None) => {
            return Err(ConfigurationError::KeyStorePasswordMissing {
                path: path.to_path_buf(),
            })
        }
        (None, Some(_)) => return Err(ConfigurationError::KeyStorePathMissing),
        _ => {}
    }

    if config.trust_store_path().is_none() && config.trust_store_password().is_some() {
        return Err(ConfigurationError::TrustStorePasswordWithoutPath);
    }

    Ok(())
}

fn install_client_identity(
    builder: &mut SslContextBuilder,
    store: &KeyStore,
) -> Result<CertInfo, TlsContextError> {
    let key = store
        .private_key()
        .ok_or_else(|| TlsContextError::MissingPrivateKey {
            path: store.path().to_path_buf(),
        })?;
    let cert = store
        .certificate()
        .ok_or_else(|| TlsContextError::MissingCertificate {
            path: store.path().to_path_buf(),
        })?;

    builder.set_private_key(key)?;
    builder.set_certificate(cert)?;
    for intermediate in store.chain() {
        builder.add_extra_chain_cert(intermediate.clone())?;
    }
    builder.check_private_key()?;

    Ok(CertInfo::from_x509(cert))
}
