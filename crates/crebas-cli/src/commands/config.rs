//! `config` commands.

use anyhow::{Context, Result, bail};
use crebas_config::loader::{SYSTEM_CONFIG_PATH, user_config_path};
use crebas_config::{ResolvedConfig, ShowFormat};

use crate::theme::Theme;

/// Print the resolved configuration.
pub(crate) fn show_config(resolved: &ResolvedConfig, format: &str) -> Result<()> {
    let format = match format.to_ascii_lowercase().as_str() {
        "toml" => ShowFormat::Toml,
        "json" => ShowFormat::Json,
        other => bail!("unknown format '{other}' (expected toml or json)"),
    };
    let rendered = resolved
        .show(format)
        .context("failed to render configuration")?;
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Print the file locations checked while loading.
pub(crate) fn show_paths(explicit: Option<&std::path::Path>) {
    println!("{}", Theme::header("Config files (lowest to highest precedence)"));
    println!("{}", Theme::field("System", SYSTEM_CONFIG_PATH));
    match user_config_path() {
        Some(path) => println!("{}", Theme::field("User", path.display())),
        None => println!("{}", Theme::field("User", Theme::dimmed("<no home directory>"))),
    }
    match explicit {
        Some(path) => println!("{}", Theme::field("Explicit", path.display())),
        None => println!("{}", Theme::field("Explicit", Theme::dimmed("<none>"))),
    }
    println!("{}", Theme::info("CREBAS_* environment variables fill fields no file sets."));
}
