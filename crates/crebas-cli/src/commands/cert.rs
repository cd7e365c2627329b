//! Certificate commands: print an authority certificate, verify a file.

use std::path::Path;

use anyhow::{Context, Result};
use crebas_authority::AuthorityRole;
use crebas_config::Config;
use crebas_crypto::Certificate;

use crate::config_bridge::{build_authority, load_trust_anchor};
use crate::theme::Theme;

/// Print the certificate of one of the authority's principals.
///
/// `json` prints the registration wire form instead of PEM.
pub(crate) fn show_authority_cert(config: &Config, role: AuthorityRole, json: bool) -> Result<()> {
    let authority = build_authority(config)?;
    let cert = authority.fetch_authority_certificate(role)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cert)?);
        return Ok(());
    }

    let decoded = cert
        .certificate()
        .context("authority certificate is not decoded")?;
    eprintln!("{}", Theme::header(&format!("{role} certificate")));
    eprintln!("{}", Theme::field("App id", cert.app_id));
    eprintln!("{}", Theme::field("Subject", decoded.subject()));
    eprintln!("{}", Theme::field("Fingerprint", decoded.fingerprint()));
    print!("{}", decoded.to_pem()?);
    Ok(())
}

/// Check that the certificate at `path` was issued by the configured CA.
pub(crate) fn verify_cert(config: &Config, path: &Path) -> Result<()> {
    let trust = load_trust_anchor(config)?;
    let cert = Certificate::load(path)
        .with_context(|| format!("failed to load certificate from {}", path.display()))?;

    match trust.verify(&cert) {
        Ok(()) => {
            println!(
                "{}",
                Theme::success(&format!("'{}' is issued by '{}'", cert.subject(), trust.root().subject()))
            );
            println!("{}", Theme::field("Fingerprint", cert.fingerprint()));
            Ok(())
        },
        Err(e) => {
            println!("{}", Theme::error(&e.to_string()));
            Err(e).context(format!("{} is not trusted", path.display()))
        },
    }
}
