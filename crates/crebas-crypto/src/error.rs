//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Private key material could not be parsed or failed validation.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// Key is shorter than the minimum accepted modulus size.
    #[error("key too weak: {bits} bits (minimum {minimum})")]
    WeakKey {
        /// Modulus size of the rejected key.
        bits: usize,
        /// Minimum accepted modulus size.
        minimum: usize,
    },

    /// Invalid public key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Producing a signature failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// Invalid base64 encoding.
    #[error("invalid base64 encoding")]
    InvalidBase64Encoding,

    /// Certificate bytes could not be decoded.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Certificate does not chain to the trusted root.
    #[error("untrusted certificate: {0}")]
    UntrustedCertificate(String),

    /// I/O error (e.g. reading key or certificate files).
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
