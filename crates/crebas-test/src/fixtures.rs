//! Cached keys and identities.

use std::sync::{LazyLock, Once};

use crebas_crypto::{Certificate, KeyPair};

use crate::pki::test_pki;

/// Number of distinct app keys available through [`test_app_key`].
pub const APP_KEY_POOL: usize = 4;

static CP_KEY: LazyLock<KeyPair> = LazyLock::new(generate);
static USER_KEY: LazyLock<KeyPair> = LazyLock::new(generate);
static APP_KEYS: LazyLock<Vec<KeyPair>> =
    LazyLock::new(|| (0..APP_KEY_POOL).map(|_| generate()).collect());

static CP_IDENTITY: LazyLock<TestIdentity> =
    LazyLock::new(|| test_identity("crebas-cp", &CP_KEY));
static USER_IDENTITY: LazyLock<TestIdentity> =
    LazyLock::new(|| test_identity("crebas-user", &USER_KEY));

static LOGGING: Once = Once::new();

fn generate() -> KeyPair {
    KeyPair::generate().expect("test key generation")
}

/// A key pair together with its CA-issued certificate.
#[derive(Debug, Clone)]
pub struct TestIdentity {
    /// Signing key.
    pub key: KeyPair,
    /// Certificate issued by [`test_pki`].
    pub certificate: Certificate,
}

/// Control Provider key.
#[must_use]
pub fn test_cp_key() -> KeyPair {
    CP_KEY.clone()
}

/// Human operator key.
#[must_use]
pub fn test_user_key() -> KeyPair {
    USER_KEY.clone()
}

/// One of [`APP_KEY_POOL`] cached app keys (index wraps around).
#[must_use]
pub fn test_app_key(index: usize) -> KeyPair {
    APP_KEYS[index.wrapping_rem(APP_KEY_POOL)].clone()
}

/// Issue a certificate from [`test_pki`] for `key`.
#[must_use]
pub fn test_identity(common_name: &str, key: &KeyPair) -> TestIdentity {
    TestIdentity {
        key: key.clone(),
        certificate: test_pki().issue(common_name, key),
    }
}

/// The Control Provider identity.
#[must_use]
pub fn test_cp_identity() -> TestIdentity {
    CP_IDENTITY.clone()
}

/// The human operator identity.
#[must_use]
pub fn test_user_identity() -> TestIdentity {
    USER_IDENTITY.clone()
}

/// Install a test-writer tracing subscriber once per binary.
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
