//! Key and trust store loading
//!
//! Stores are PKCS#12 files. There is no format detection: anything that
//! does not parse as PKCS#12 is rejected.

use super::cert::CertInfo;
use super::error::TlsMaterialError;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use std::fs;
use std::path::{Path, PathBuf};

/// In-memory credential material read from a store
pub struct KeyStore {
    path: PathBuf,
    private_key: Option<PKey<Private>>,
    certificate: Option<X509>,
    chain: Vec<X509>,
}

impl KeyStore {
    /// Load a store if a path is configured
    ///
    /// An absent path is not an error: it yields `Ok(None)`, meaning "no
    /// material, use defaults". An absent password is treated as empty.
    pub fn load(
        path: Option<&Path>,
        password: Option<&str>,
    ) -> Result<Option<KeyStore>, TlsMaterialError> {
        match path {
            Some(path) => Self::open(path, password.unwrap_or("")).map(Some),
            None => Ok(None),
        }
    }

    /// Read and decrypt a PKCS#12 store
    ///
    /// The file is read fully and closed before parsing starts.
    pub fn open(path: &Path, password: &str) -> Result<KeyStore, TlsMaterialError> {
        let der = fs::read(path).map_err(|source| TlsMaterialError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let pkcs12 = Pkcs12::from_der(&der).map_err(|source| TlsMaterialError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = pkcs12
            .parse2(password)
            .map_err(|source| TlsMaterialError::Decrypt {
                path: path.to_path_buf(),
                source,
            })?;

        let chain = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();

        let store = KeyStore {
            path: path.to_path_buf(),
            private_key: parsed.pkey,
            certificate: parsed.cert,
            chain,
        };

        tracing::debug!(
            path = %store.path.display(),
            entries = store.len(),
            has_private_key = store.private_key.is_some(),
            "loaded PKCS#12 store"
        );

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn private_key(&self) -> Option<&PKey<Private>> {
        self.private_key.as_ref()
    }

    /// Certificate paired with the private key, if any
    pub fn certificate(&self) -> Option<&X509> {
        self.certificate.as_ref()
    }

    /// Additional certificates: the key's issuing chain, or the trust
    /// anchors of a trust store
    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    /// Every certificate in the store, keyed certificate first
    pub fn certificates(&self) -> impl Iterator<Item = &X509> {
        self.certificate.iter().chain(self.chain.iter())
    }

    /// Summaries of every certificate in the store
    pub fn entries(&self) -> Vec<CertInfo> {
        self.certificates().map(|c| CertInfo::from_x509(c)).collect()
    }

    /// Number of certificates in the store
    pub fn len(&self) -> usize {
        self.certificates().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("path", &self.path)
            .field("has_private_key", &self.private_key.is_some())
            .field("entries", &self.entries())
            .finish()
    }
}
