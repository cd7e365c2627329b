//! CREBAS Crypto - trust verification for the capability authority.
//!
//! This crate provides:
//! - RSA key pairs (2048 bits minimum) loaded from PKCS#1 or PKCS#8 PEM
//! - PKCS#1 v1.5 / SHA-256 signatures, carried as base64
//! - X.509 certificate decoding and verification against the platform CA
//! - SHA-256 content hashing for fingerprints
//!
//! # Example
//!
//! ```no_run
//! use crebas_crypto::{ContentHash, KeyPair};
//!
//! let keypair = KeyPair::generate().unwrap();
//!
//! let message = b"important data";
//! let signature = keypair.sign(message).unwrap();
//! assert!(keypair.verify(message, &signature).is_ok());
//!
//! let hash = ContentHash::hash(message);
//! println!("Hash: {}", hash.to_hex());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod certificate;
mod error;
mod hash;
mod keypair;
mod signature;
mod verifier;

pub use certificate::{Certificate, SHA256_WITH_RSA_ENCRYPTION};
pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use keypair::{KeyPair, MIN_KEY_BITS, PublicKey};
pub use signature::Signature;
pub use verifier::TrustAnchor;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::LazyLock;

    use crate::KeyPair;

    static PRIMARY: LazyLock<KeyPair> = LazyLock::new(|| KeyPair::generate().unwrap());
    static SECONDARY: LazyLock<KeyPair> = LazyLock::new(|| KeyPair::generate().unwrap());

    pub(crate) fn test_keypair() -> KeyPair {
        PRIMARY.clone()
    }

    pub(crate) fn other_keypair() -> KeyPair {
        SECONDARY.clone()
    }
}
