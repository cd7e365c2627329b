//! Capability error types.

use crebas_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur in capability handling.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Signature verification failed or the signature is malformed.
    #[error("invalid signature on {entity}")]
    InvalidSignature {
        /// Entity whose signature failed (e.g. `capability cap:...`).
        entity: String,
    },

    /// No certificate is registered for the claimed signer.
    #[error("no certificate registered for signer {signer_id}")]
    UnknownSigner {
        /// The claimed signer.
        signer_id: String,
    },

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind.
        kind: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// More than one user grant policy matched a capability and requester.
    #[error(
        "{count} user grant policies match capability {capability_id} for requester {requester_id}"
    )]
    AmbiguousPolicy {
        /// Capability the policies target.
        capability_id: String,
        /// Requester the policies target.
        requester_id: String,
        /// Number of matching policies.
        count: usize,
    },

    /// Input failed schema or invariant checks.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Certificate does not chain to the CA root.
    #[error("untrusted certificate: {0}")]
    UntrustedCertificate(String),

    /// Any other cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[source] CryptoError),
}

impl From<CryptoError> for CapabilityError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UntrustedCertificate(msg) => Self::UntrustedCertificate(msg),
            CryptoError::InvalidCertificate(msg) => Self::Malformed(format!("certificate: {msg}")),
            CryptoError::InvalidBase64Encoding => Self::Malformed("invalid base64 encoding".into()),
            other => Self::Crypto(other),
        }
    }
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;
