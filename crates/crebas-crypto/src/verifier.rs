//! Trust anchor for certificate chain verification.
//!
//! Every participant (apps, the Control Provider, the human operator) holds
//! a certificate issued directly by the platform CA. The anchor is the
//! single root those certificates must chain to.

use std::path::Path;

use crate::certificate::Certificate;
use crate::error::{CryptoError, CryptoResult};
use crate::keypair::PublicKey;

/// The CA root certificates are verified against.
///
/// # Example
///
/// ```no_run
/// use crebas_crypto::{Certificate, TrustAnchor};
///
/// let anchor = TrustAnchor::load("/etc/crebas/ca.crt").unwrap();
/// let app_cert = Certificate::load("app.crt").unwrap();
/// assert!(anchor.verify(&app_cert).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    root: Certificate,
}

impl TrustAnchor {
    /// Create an anchor from the CA root certificate.
    #[must_use]
    pub fn new(root: Certificate) -> Self {
        Self { root }
    }

    /// Load the CA root from a PEM or DER file.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Certificate::load`].
    pub fn load(path: impl AsRef<Path>) -> CryptoResult<Self> {
        Certificate::load(path).map(Self::new)
    }

    /// The CA root certificate.
    #[must_use]
    pub fn root(&self) -> &Certificate {
        &self.root
    }

    /// Verify that `cert` was issued by the CA root.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UntrustedCertificate`] if it was not.
    pub fn verify(&self, cert: &Certificate) -> CryptoResult<()> {
        cert.verify_issued_by(&self.root)
    }

    /// Verify that `cert` chains to the root and certifies `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UntrustedCertificate`] if the chain check fails
    /// or the certified key differs from `key`.
    pub fn verify_binding(&self, cert: &Certificate, key: &PublicKey) -> CryptoResult<()> {
        self.verify(cert)?;
        if &cert.public_key()? != key {
            return Err(CryptoError::UntrustedCertificate(format!(
                "'{}' does not certify key {}",
                cert.subject(),
                key.key_id_hex()
            )));
        }
        Ok(())
    }
}
