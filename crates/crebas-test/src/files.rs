//! PEM files on disk for configuration and CLI tests.

use std::path::{Path, PathBuf};

use crate::fixtures::{test_cp_identity, test_user_identity};
use crate::pki::test_pki;

/// Paths of the PEM files written by [`write_pki_files`].
#[derive(Debug, Clone)]
pub struct PkiFiles {
    /// CA root certificate.
    pub ca_cert: PathBuf,
    /// Control Provider private key.
    pub cp_key: PathBuf,
    /// Control Provider certificate.
    pub cp_cert: PathBuf,
    /// Operator private key.
    pub user_key: PathBuf,
    /// Operator certificate.
    pub user_cert: PathBuf,
}

/// Write the shared CA and both authority identities into `dir`.
///
/// # Panics
///
/// Panics on encoding or I/O failure.
#[must_use]
pub fn write_pki_files(dir: &Path) -> PkiFiles {
    let cp = test_cp_identity();
    let user = test_user_identity();

    let files = PkiFiles {
        ca_cert: dir.join("ca.crt"),
        cp_key: dir.join("cp.key"),
        cp_cert: dir.join("cp.crt"),
        user_key: dir.join("user.key"),
        user_cert: dir.join("user.crt"),
    };

    write(&files.ca_cert, &test_pki().ca_certificate().to_pem().expect("CA pem"));
    write(&files.cp_key, &cp.key.to_pkcs8_pem().expect("cp key pem"));
    write(&files.cp_cert, &cp.certificate.to_pem().expect("cp cert pem"));
    write(&files.user_key, &user.key.to_pkcs8_pem().expect("user key pem"));
    write(&files.user_cert, &user.certificate.to_pem().expect("user cert pem"));

    files
}

fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("write PKI file");
}
