//! `check` command: load the configuration and stand up an authority.

use anyhow::Result;
use crebas_authority::AuthorityRole;
use crebas_config::ResolvedConfig;

use crate::config_bridge::build_authority;
use crate::theme::Theme;

/// Build the authority from `resolved` and report its identities.
pub(crate) fn run_check(resolved: &ResolvedConfig) -> Result<()> {
    let authority = build_authority(&resolved.config)?;

    println!("{}", Theme::header("Capability authority"));
    if resolved.loaded_files.is_empty() {
        println!("{}", Theme::dimmed("  (built-in defaults, no config files found)"));
    }
    for path in &resolved.loaded_files {
        println!("{}", Theme::field("Config", path));
    }
    println!("{}", Theme::field("CA", authority.trust_anchor().root().subject()));

    for role in [AuthorityRole::Cp, AuthorityRole::User] {
        let cert = authority.fetch_authority_certificate(role)?;
        let subject = cert
            .certificate()
            .map_or_else(|| "<undecoded>".to_owned(), crebas_crypto::Certificate::subject);
        println!("{}", Theme::field(&format!("{role} id"), cert.app_id));
        println!("{}", Theme::field(&format!("{role} subject"), subject));
    }

    println!("{}", Theme::success("PKI material verified against the CA"));
    Ok(())
}
