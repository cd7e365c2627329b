//! Prelude module - commonly used types for convenient import.
//!
//! Use `use crebas_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Key types
pub use crate::{KeyPair, PublicKey};

// Signature
pub use crate::Signature;

// Certificates and trust
pub use crate::{Certificate, TrustAnchor};

// Hashing
pub use crate::ContentHash;
