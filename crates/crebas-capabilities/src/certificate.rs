//! Participant certificates as registered with the authority.

use crebas_crypto::{Certificate, PublicKey};
use serde::{Deserialize, Serialize};

use crate::error::CapabilityResult;
use crate::ids::AppId;

/// A participant's X.509 certificate, keyed by its app id.
///
/// The wire form carries base64 of the PEM; the decoded handle is attached
/// by [`decode`](Self::decode) and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppCertificate {
    /// Participant the certificate belongs to.
    #[serde(rename = "appID")]
    pub app_id: AppId,
    /// Base64 certificate bytes.
    #[serde(rename = "certificate")]
    pub certificate: String,
    #[serde(skip)]
    decoded: Option<Certificate>,
}

impl AppCertificate {
    /// Wrap an already decoded certificate.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Malformed`](crate::CapabilityError::Malformed)
    /// if the certificate cannot be re-encoded.
    pub fn new(app_id: AppId, certificate: &Certificate) -> CapabilityResult<Self> {
        Ok(Self {
            app_id,
            certificate: certificate.to_base64()?,
            decoded: Some(certificate.clone()),
        })
    }

    /// Decode the base64 payload and attach the handle.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Malformed`](crate::CapabilityError::Malformed)
    /// if the payload is not a base64 certificate.
    pub fn decode(mut self) -> CapabilityResult<Self> {
        if self.decoded.is_none() {
            self.decoded = Some(Certificate::from_base64(&self.certificate)?);
        }
        Ok(self)
    }

    /// The decoded certificate, if [`decode`](Self::decode) has run.
    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        self.decoded.as_ref()
    }

    /// The certified public key.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Malformed`](crate::CapabilityError::Malformed)
    /// if the payload does not decode, or a crypto error if the key is not RSA.
    pub fn public_key(&self) -> CapabilityResult<PublicKey> {
        match &self.decoded {
            Some(cert) => Ok(cert.public_key()?),
            None => Ok(Certificate::from_base64(&self.certificate)?.public_key()?),
        }
    }
}
