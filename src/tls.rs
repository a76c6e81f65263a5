use std::fmt;
use std::path::Path;

use reqwest::{Certificate, ClientBuilder};

use crate::{HttpClientError, Result};

/// Custom set of trusted root certificates.
///
/// When configured, the base transport trusts exactly these roots; the
/// built-in root store is disabled.
#[derive(Clone)]
pub struct TlsTrustStore {
    roots: Vec<Certificate>,
}

impl fmt::Debug for TlsTrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsTrustStore")
            .field("roots", &self.roots.len())
            .finish()
    }
}

impl TlsTrustStore {
    /// Parses one or more PEM encoded CA certificates.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let roots = Certificate::from_pem_bundle(pem)
            .map_err(|err| HttpClientError::Tls(format!("invalid PEM bundle: {err}")))?;
        if roots.is_empty() {
            return Err(HttpClientError::Tls(
                "no certificates found in PEM input".to_owned(),
            ));
        }
        Ok(Self { roots })
    }

    /// Reads and parses a PEM file of CA certificates.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|err| {
            HttpClientError::Tls(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_pem(&pem)
    }

    pub fn from_certificates(roots: impl IntoIterator<Item = Certificate>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub(crate) fn apply(&self, builder: ClientBuilder) -> ClientBuilder {
        self.roots
            .iter()
            .cloned()
            .fold(builder.tls_built_in_root_certs(false), |builder, root| {
                builder.add_root_certificate(root)
            })
    }
}
