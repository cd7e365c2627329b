//! Signing principals.

use crebas_crypto::{KeyPair, PublicKey, Signature};

use crate::error::CapabilityResult;
use crate::ids::AppId;

/// A participant able to sign capabilities: an identifier plus its key.
///
/// The authority holds two: the Control Provider and the human operator.
/// Apps use the same type to sign their own offers and requests.
#[derive(Debug, Clone)]
pub struct Principal {
    id: AppId,
    key: KeyPair,
}

impl Principal {
    /// Create a principal.
    #[must_use]
    pub fn new(id: AppId, key: KeyPair) -> Self {
        Self { id, key }
    }

    /// The principal's identifier.
    #[must_use]
    pub fn id(&self) -> AppId {
        self.id
    }

    /// The signing key.
    #[must_use]
    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    /// The verification key.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        self.key.public_key()
    }

    /// Sign raw signing data.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Crypto`](crate::CapabilityError::Crypto)
    /// if the RSA operation fails.
    pub fn sign(&self, data: &[u8]) -> CapabilityResult<Signature> {
        Ok(self.key.sign(data)?)
    }
}
