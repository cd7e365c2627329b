//! Bridge from `crebas_config::Config` to domain types.
//!
//! The config crate knows nothing about keys, certificates or log layers;
//! everything typed is built here at startup.

use anyhow::{Context, Result, bail};
use crebas_authority::{Authority, AuthorityIdentity};
use crebas_capabilities::{AppId, Principal};
use crebas_config::Config;
use crebas_crypto::{Certificate, KeyPair, TrustAnchor};
use crebas_telemetry::{FileRotation, LogConfig, LogFormat, LogTarget};

/// File name prefix for rotated log files.
const LOG_FILE_PREFIX: &str = "crebas-cp";

/// Build the logging setup described by `config`.
///
/// # Errors
///
/// Returns an error for unknown format, target or rotation names.
pub(crate) fn to_log_config(config: &Config) -> Result<LogConfig> {
    let logging = &config.logging;
    let format: LogFormat = logging.format.parse()?;
    let mut log_config = LogConfig::new(logging.level.to_ascii_lowercase()).with_format(format);

    log_config = match logging.target.to_ascii_lowercase().as_str() {
        "stdout" => log_config.with_target(LogTarget::Stdout),
        "stderr" => log_config.with_target(LogTarget::Stderr),
        "file" => {
            let Some(directory) = logging.directory.as_deref() else {
                bail!("logging.directory is required when logging to files");
            };
            log_config.with_file_logging(directory, LOG_FILE_PREFIX, parse_rotation(&logging.rotation)?)
        },
        other => bail!("unknown log target '{other}'"),
    };

    for directive in &logging.directives {
        log_config = log_config.with_directive(directive.clone());
    }
    Ok(log_config)
}

fn parse_rotation(rotation: &str) -> Result<FileRotation> {
    match rotation.to_ascii_lowercase().as_str() {
        "daily" => Ok(FileRotation::Daily),
        "hourly" => Ok(FileRotation::Hourly),
        "never" => Ok(FileRotation::Never),
        other => bail!("unknown log rotation '{other}'"),
    }
}

/// Parse a configured participant id, or generate one when unset.
fn participant_id(field: &str, value: Option<&str>) -> Result<AppId> {
    match value {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("authority.{field} is not a valid id: '{raw}'")),
        None => {
            let id = AppId::new();
            tracing::info!(field, %id, "no participant id configured, generated one");
            Ok(id)
        },
    }
}

fn load_identity(
    field: &str,
    id: Option<&str>,
    key_path: &str,
    cert_path: &str,
) -> Result<AuthorityIdentity> {
    let key = KeyPair::load(key_path)
        .with_context(|| format!("failed to load {field} key from {key_path}"))?;
    let certificate = Certificate::load(cert_path)
        .with_context(|| format!("failed to load {field} certificate from {cert_path}"))?;
    Ok(AuthorityIdentity::new(
        Principal::new(participant_id(field, id)?, key),
        certificate,
    ))
}

/// Load the CA root named in `config`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub(crate) fn load_trust_anchor(config: &Config) -> Result<TrustAnchor> {
    let path = &config.authority.ca_cert;
    TrustAnchor::load(path).with_context(|| format!("failed to load CA certificate from {path}"))
}

/// Build a fresh in-memory authority from the configured PKI material.
///
/// # Errors
///
/// Returns an error if any file cannot be loaded, an id does not parse, or
/// the authority rejects its identities.
pub(crate) fn build_authority(config: &Config) -> Result<Authority> {
    let a = &config.authority;
    let trust = load_trust_anchor(config)?;
    let cp = load_identity("cp_id", a.cp_id.as_deref(), &a.cp_key, &a.cp_cert)?;
    let user = load_identity("user_id", a.user_id.as_deref(), &a.user_key, &a.user_cert)?;
    Authority::new(trust, cp, user).context("authority identities rejected")
}
