//! Authority error types.

use std::fmt;

use crebas_capabilities::CapabilityError;
use crebas_crypto::CryptoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::AuthorityRole;

/// Errors returned by authority operations.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// A capability-level failure.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// An authority principal's certificate is untrusted or certifies a
    /// different key.
    #[error("{role} identity rejected: {reason}")]
    Identity {
        /// Which principal.
        role: AuthorityRole,
        /// What failed.
        reason: String,
    },
}

impl From<CryptoError> for AuthorityError {
    fn from(err: CryptoError) -> Self {
        Self::Capability(err.into())
    }
}

/// Stable classification of an [`AuthorityError`], carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// A signature did not verify.
    InvalidSignature,
    /// A certificate does not chain to the CA root.
    UntrustedCertificate,
    /// No certificate is registered for the signer.
    UnknownSigner,
    /// A referenced entity does not exist.
    NotFound,
    /// Conflicting user grant policies.
    AmbiguousPolicy,
    /// Input failed validation.
    Malformed,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidSignature => "invalid-signature",
            Self::UntrustedCertificate => "untrusted-certificate",
            Self::UnknownSigner => "unknown-signer",
            Self::NotFound => "not-found",
            Self::AmbiguousPolicy => "ambiguous-policy",
            Self::Malformed => "malformed",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl AuthorityError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Capability(err) => match err {
                CapabilityError::InvalidSignature { .. } => ErrorKind::InvalidSignature,
                CapabilityError::UntrustedCertificate(_) => ErrorKind::UntrustedCertificate,
                CapabilityError::UnknownSigner { .. } => ErrorKind::UnknownSigner,
                CapabilityError::NotFound { .. } => ErrorKind::NotFound,
                CapabilityError::AmbiguousPolicy { .. } => ErrorKind::AmbiguousPolicy,
                CapabilityError::Malformed(_) => ErrorKind::Malformed,
                CapabilityError::Crypto(_) => ErrorKind::Internal,
            },
            Self::Identity { .. } => ErrorKind::UntrustedCertificate,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Capability(CapabilityError::Malformed(message.into()))
    }

    pub(crate) fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::Capability(CapabilityError::NotFound {
            kind,
            id: id.to_string(),
        })
    }
}

/// Result type for authority operations.
pub type AuthorityResult<T> = Result<T, AuthorityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = AuthorityError::not_found("request", "req:1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "request not found: req:1");

        let err: AuthorityError = CryptoError::UntrustedCertificate("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::UntrustedCertificate);

        let err: AuthorityError = CryptoError::SigningFailed("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err = AuthorityError::Identity {
            role: AuthorityRole::User,
            reason: "key mismatch".into(),
        };
        assert_eq!(err.kind(), ErrorKind::UntrustedCertificate);
        assert!(err.to_string().starts_with("user identity rejected"));
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::AmbiguousPolicy).unwrap(),
            "\"ambiguous-policy\""
        );
        assert_eq!(ErrorKind::UnknownSigner.to_string(), "unknown-signer");
    }
}
