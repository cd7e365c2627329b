//! X.509 certificates binding participant identities to RSA keys.
//!
//! Certificates reach the authority as PEM, DER, or base64 of either (the
//! wire form used when apps register). Only `sha256WithRSAEncryption`
//! signatures are accepted when checking issuance.

use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use x509_cert::der::oid::ObjectIdentifier;
use x509_cert::der::pem::LineEnding;
use x509_cert::der::{Decode, DecodePem, Encode, EncodePem};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::ContentHash;
use crate::keypair::PublicKey;
use crate::signature::Signature;

/// `sha256WithRSAEncryption` (RFC 4055).
pub const SHA256_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

const PEM_BOUNDARY: &[u8] = b"-----BEGIN";

/// A decoded X.509 certificate together with its DER encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    inner: x509_cert::Certificate,
    der: Vec<u8>,
}

impl Certificate {
    /// Decode from DER.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if the bytes are not a certificate.
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        let inner = x509_cert::Certificate::from_der(der)
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    /// Decode from a PEM `CERTIFICATE` block.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if the PEM does not hold a certificate.
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let inner = x509_cert::Certificate::from_pem(pem)
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
        let der = inner
            .to_der()
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
        Ok(Self { inner, der })
    }

    /// Decode from either PEM or DER, detected from the leading bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if neither form decodes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.trim_ascii_start().starts_with(PEM_BOUNDARY) {
            let pem = std::str::from_utf8(bytes)
                .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
            Self::from_pem(pem)
        } else {
            Self::from_der(bytes)
        }
    }

    /// Decode the base64 wire form (base64 of PEM or DER).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidBase64Encoding`] or
    /// [`CryptoError::InvalidCertificate`].
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| CryptoError::InvalidBase64Encoding)?;
        Self::from_bytes(&bytes)
    }

    /// Read a PEM or DER certificate file.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IoError`] if the file cannot be read, or the
    /// errors of [`from_bytes`](Self::from_bytes).
    pub fn load(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| CryptoError::IoError(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Encode as PEM.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if encoding fails.
    pub fn to_pem(&self) -> CryptoResult<String> {
        self.inner
            .to_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))
    }

    /// Encode as base64 of the PEM form, as carried on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if encoding fails.
    pub fn to_base64(&self) -> CryptoResult<String> {
        use base64::Engine;
        Ok(base64::engine::general_purpose::STANDARD.encode(self.to_pem()?))
    }

    /// The DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name (RFC 4514 string form).
    #[must_use]
    pub fn subject(&self) -> String {
        self.inner.tbs_certificate.subject.to_string()
    }

    /// Issuer distinguished name (RFC 4514 string form).
    #[must_use]
    pub fn issuer(&self) -> String {
        self.inner.tbs_certificate.issuer.to_string()
    }

    /// SHA-256 over the DER encoding.
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        ContentHash::hash(&self.der)
    }

    /// The certified RSA public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if the subject key is not RSA.
    pub fn public_key(&self) -> CryptoResult<PublicKey> {
        let spki = self
            .inner
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
        PublicKey::from_der(&spki)
    }

    /// Check that `at` lies inside the validity window.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UntrustedCertificate`] if the certificate is
    /// not yet valid or has expired.
    pub fn check_validity_at(&self, at: SystemTime) -> CryptoResult<()> {
        let now = at.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        let validity = &self.inner.tbs_certificate.validity;
        if now < validity.not_before.to_unix_duration() {
            return Err(CryptoError::UntrustedCertificate(format!(
                "{} is not yet valid",
                self.subject()
            )));
        }
        if now > validity.not_after.to_unix_duration() {
            return Err(CryptoError::UntrustedCertificate(format!(
                "{} has expired",
                self.subject()
            )));
        }
        Ok(())
    }

    /// Verify that `issuer` issued this certificate: names chain, the
    /// certificate is currently valid, and the issuer's key verifies the
    /// signature over the TBS portion.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UntrustedCertificate`] on any failed check.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> CryptoResult<()> {
        let tbs = &self.inner.tbs_certificate;
        if tbs.issuer != issuer.inner.tbs_certificate.subject {
            return Err(CryptoError::UntrustedCertificate(format!(
                "issuer '{}' does not match '{}'",
                self.issuer(),
                issuer.subject()
            )));
        }

        let algorithm = self.inner.signature_algorithm.oid;
        if algorithm != SHA256_WITH_RSA_ENCRYPTION {
            return Err(CryptoError::UntrustedCertificate(format!(
                "unsupported signature algorithm {algorithm}"
            )));
        }

        self.check_validity_at(SystemTime::now())?;

        let tbs_der = tbs
            .to_der()
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;
        let signature = Signature::from_bytes(self.inner.signature.raw_bytes());
        issuer
            .public_key()?
            .verify(&tbs_der, &signature)
            .map_err(|_| {
                CryptoError::UntrustedCertificate(format!(
                    "signature on '{}' does not verify against '{}'",
                    self.subject(),
                    issuer.subject()
                ))
            })
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
