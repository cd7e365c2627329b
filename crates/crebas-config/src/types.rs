//! Configuration struct definitions.
//!
//! Paths and identifiers stay plain strings here; the binary converts them
//! into domain types at startup.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Authority identities and key material.
    pub authority: AuthoritySection,
    /// Logging.
    pub logging: LoggingSection,
}

/// Identities and PKI material of the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoritySection {
    /// Control Provider participant id (UUID). Random when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cp_id: Option<String>,
    /// Human operator participant id (UUID). Random when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// CA root certificate (PEM or DER).
    pub ca_cert: String,
    /// Control Provider private key (PKCS#1 or PKCS#8 PEM).
    pub cp_key: String,
    /// Control Provider certificate.
    pub cp_cert: String,
    /// Human operator private key.
    pub user_key: String,
    /// Human operator certificate.
    pub user_cert: String,
}

impl Default for AuthoritySection {
    fn default() -> Self {
        Self {
            cp_id: None,
            user_id: None,
            ca_cert: "/etc/crebas/pki/ca/ca.crt".to_owned(),
            cp_key: "/etc/crebas/pki/cp/cp.key".to_owned(),
            cp_cert: "/etc/crebas/pki/cp/cp.crt".to_owned(),
            user_key: "/etc/crebas/pki/user/user.key".to_owned(),
            user_cert: "/etc/crebas/pki/user/user.crt".to_owned(),
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level filter (`trace`, `debug`, `info`, `warn`, `error`, `off`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Output target (`stdout`, `stderr`, `file`).
    pub target: String,
    /// Log directory, required when `target = "file"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// File rotation (`daily`, `hourly`, `never`).
    pub rotation: String,
    /// Per-target directive overrides.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directory: None,
            rotation: "daily".to_owned(),
            directives: Vec::new(),
        }
    }
}
