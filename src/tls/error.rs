//! TLS error taxonomy
//!
//! All three kinds are fatal to context construction. None of them ever
//! falls back to disabling verification.

use openssl::error::ErrorStack;
use std::path::PathBuf;

/// Contradictory TLS settings, detected when a context is first built
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("key store {path:?} is configured without a password")]
    KeyStorePasswordMissing { path: PathBuf },

    #[error("key store password is configured without a key store path")]
    KeyStorePathMissing,

    #[error("trust store password is configured without a trust store path")]
    TrustStorePasswordWithoutPath,
}

/// A key or trust store could not be read, parsed or decrypted
#[derive(Debug, thiserror::Error)]
pub enum TlsMaterialError {
    #[error("failed to read store {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store {path:?} is not a valid PKCS#12 file: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: ErrorStack,
    },

    #[error("failed to decrypt store {path:?} (wrong password?): {source}")]
    Decrypt {
        path: PathBuf,
        #[source]
        source: ErrorStack,
    },
}

impl TlsMaterialError {
    /// Path of the store that failed to load
    pub fn path(&self) -> &std::path::Path {
        match self {
            TlsMaterialError::Read { path, .. }
            | TlsMaterialError::Malformed { path, .. }
            | TlsMaterialError::Decrypt { path, .. } => path,
        }
    }
}

/// Failure composing key material and a trust evaluator into a context
#[derive(Debug, thiserror::Error)]
pub enum TlsContextError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Material(#[from] TlsMaterialError),

    #[error("key store {path:?} holds no private key")]
    MissingPrivateKey { path: PathBuf },

    #[error("key store {path:?} holds no certificate for its private key")]
    MissingCertificate { path: PathBuf },

    #[error("trust store {path:?} holds no trust anchors")]
    EmptyTrustStore { path: PathBuf },

    #[error("secure random source unavailable: {0}")]
    Random(#[source] ErrorStack),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] ErrorStack),
}
