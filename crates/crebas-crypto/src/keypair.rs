//! RSA key pairs for the authority's signing principals.
//!
//! Keys are loaded from PEM files provisioned alongside the principal's
//! X.509 certificate. Both PKCS#1 (`RSA PRIVATE KEY`) and PKCS#8
//! (`PRIVATE KEY`) encodings are accepted.

use std::path::Path;

use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::hash::ContentHash;
use crate::signature::Signature;

/// Minimum accepted RSA modulus size in bits.
pub const MIN_KEY_BITS: usize = 2048;

/// An RSA key pair that signs with PKCS#1 v1.5 over SHA-256.
///
/// The private key is zeroized on drop by the underlying signing key.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey<Sha256>,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random 2048-bit key pair.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if key generation fails.
    pub fn generate() -> CryptoResult<Self> {
        let key = RsaPrivateKey::new(&mut OsRng, MIN_KEY_BITS)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_private_key(key)
    }

    /// Wrap an already decoded private key after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the key is inconsistent, or
    /// [`CryptoError::WeakKey`] if its modulus is below [`MIN_KEY_BITS`].
    pub fn from_private_key(key: RsaPrivateKey) -> CryptoResult<Self> {
        key.validate()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let public_key = PublicKey::from_rsa(key.to_public_key());
        let bits = public_key.bits();
        if bits < MIN_KEY_BITS {
            return Err(CryptoError::WeakKey {
                bits,
                minimum: MIN_KEY_BITS,
            });
        }

        Ok(Self {
            signing_key: SigningKey::new(key),
            public_key,
        })
    }

    /// Parse a PEM encoded private key (PKCS#8 or PKCS#1).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if neither encoding parses, or the
    /// errors of [`from_private_key`](Self::from_private_key).
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::from_private_key(key)
    }

    /// Load a PEM encoded private key from a file.
    ///
    /// # Security
    ///
    /// - Refuses to read key files that are symlinks.
    /// - The file contents are held in a `Zeroizing` buffer and cleared once
    ///   the key has been parsed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IoError`] on I/O failures or symlink detection,
    /// or the errors of [`from_pem`](Self::from_pem).
    pub fn load(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();

        let meta =
            std::fs::symlink_metadata(path).map_err(|e| CryptoError::IoError(e.to_string()))?;
        if meta.file_type().is_symlink() {
            return Err(CryptoError::IoError(
                "refusing to read key file: path is a symlink".into(),
            ));
        }

        let pem = Zeroizing::new(
            std::fs::read_to_string(path).map_err(|e| CryptoError::IoError(e.to_string()))?,
        );
        Self::from_pem(&pem)
    }

    /// Export the private key as PKCS#8 PEM (careful - sensitive!).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if encoding fails.
    pub fn to_pkcs8_pem(&self) -> CryptoResult<Zeroizing<String>> {
        self.signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Sign a message with PKCS#1 v1.5 over SHA-256.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SigningFailed`] if the RSA operation fails.
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        let sig: RsaSignature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        Ok(Signature::from_bytes(sig.to_vec()))
    }

    /// Verify a signature (convenience method using our public key).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] if verification fails.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        self.public_key.verify(message, signature)
    }

    /// Borrow the public half.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Export the public key.
    #[must_use]
    pub fn export_public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    /// Get a short key ID (first 8 bytes of the public key fingerprint).
    #[must_use]
    pub fn key_id(&self) -> [u8; 8] {
        self.public_key.key_id()
    }

    /// Get the key ID as a hex string.
    #[must_use]
    pub fn key_id_hex(&self) -> String {
        self.public_key.key_id_hex()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id_hex())
            .finish_non_exhaustive()
    }
}

/// An RSA public key (safe to share).
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    pub(crate) fn from_rsa(key: RsaPublicKey) -> Self {
        Self(key)
    }

    /// Decode from a DER `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if the bytes are not an RSA
    /// public key.
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        RsaPublicKey::from_public_key_der(der)
            .map(Self)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    /// Encode as a DER `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if encoding fails.
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        self.0
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    /// Modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.0.size().saturating_mul(8)
    }

    /// Fingerprint over the modulus and public exponent.
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        let n = self.0.n().to_bytes_be();
        let e = self.0.e().to_bytes_be();
        ContentHash::hash_multi(&[n.as_slice(), e.as_slice()])
    }

    /// Get a short key ID (first 8 bytes of the fingerprint).
    #[must_use]
    pub fn key_id(&self) -> [u8; 8] {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.fingerprint().as_bytes()[..8]);
        id
    }

    /// Get the key ID as a hex string.
    #[must_use]
    pub fn key_id_hex(&self) -> String {
        hex::encode(self.key_id())
    }

    /// Verify a PKCS#1 v1.5 / SHA-256 signature against this key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SignatureVerificationFailed`] if the signature
    /// is malformed or does not verify.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> CryptoResult<()> {
        let sig = RsaSignature::try_from(signature.as_bytes())
            .map_err(|_| CryptoError::SignatureVerificationFailed)?;
        VerifyingKey::<Sha256>::new(self.0.clone())
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.key_id_hex())
    }
}
