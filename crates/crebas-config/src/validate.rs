//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const FORMATS: &[&str] = &["pretty", "compact", "json", "full"];
const TARGETS: &[&str] = &["stdout", "stderr", "file"];
const ROTATIONS: &[&str] = &["daily", "hourly", "never"];

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

/// Validate a fully merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_authority(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_authority(config: &Config) -> ConfigResult<()> {
    let a = &config.authority;

    for (field, path) in [
        ("authority.ca_cert", &a.ca_cert),
        ("authority.cp_key", &a.cp_key),
        ("authority.cp_cert", &a.cp_cert),
        ("authority.user_key", &a.user_key),
        ("authority.user_cert", &a.user_cert),
    ] {
        if path.trim().is_empty() {
            return Err(invalid(field, "path must not be empty"));
        }
    }

    for (field, id) in [("authority.cp_id", &a.cp_id), ("authority.user_id", &a.user_id)] {
        if let Some(id) = id
            && !is_uuid(id)
        {
            return Err(invalid(field, format!("'{id}' is not a UUID")));
        }
    }

    if a.cp_id.is_some() && a.cp_id == a.user_id {
        return Err(invalid(
            "authority.user_id",
            "the operator must not share the Control Provider's id",
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    let level = l.level.to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!("unknown level '{}'; expected one of: {}", l.level, LEVELS.join(", ")),
        ));
    }

    let format = l.format.to_ascii_lowercase();
    if !FORMATS.contains(&format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!("unknown format '{}'; expected one of: {}", l.format, FORMATS.join(", ")),
        ));
    }

    let target = l.target.to_ascii_lowercase();
    if !TARGETS.contains(&target.as_str()) {
        return Err(invalid(
            "logging.target",
            format!("unknown target '{}'; expected one of: {}", l.target, TARGETS.join(", ")),
        ));
    }

    if !ROTATIONS.contains(&l.rotation.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.rotation",
            format!(
                "unknown rotation '{}'; expected one of: {}",
                l.rotation,
                ROTATIONS.join(", ")
            ),
        ));
    }

    if target == "file" && l.directory.as_deref().is_none_or(|d| d.trim().is_empty()) {
        return Err(invalid(
            "logging.directory",
            "a directory is required when logging to files",
        ));
    }

    Ok(())
}

/// Canonical 8-4-4-4-12 hex form.
fn is_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8_usize, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut config = Config::default();
        config.authority.cp_key = "  ".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("authority.cp_key"));
    }

    #[test]
    fn test_ids_must_be_uuids() {
        let mut config = Config::default();
        config.authority.cp_id = Some("not-a-uuid".to_owned());
        assert!(validate(&config).is_err());

        config.authority.cp_id = Some("8b0c7a52-34a5-4c57-9d3f-1f6f2f0b9a10".to_owned());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_shared_ids_rejected() {
        let mut config = Config::default();
        let id = "8b0c7a52-34a5-4c57-9d3f-1f6f2f0b9a10".to_owned();
        config.authority.cp_id = Some(id.clone());
        config.authority.user_id = Some(id);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_logging_values_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.logging.target = "syslog".to_owned();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_file_target_requires_directory() {
        let mut config = Config::default();
        config.logging.target = "file".to_owned();
        assert!(validate(&config).is_err());

        config.logging.directory = Some("/var/log/crebas".to_owned());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_uppercase_level_accepted() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".to_owned();
        assert!(validate(&config).is_ok());
    }
}
