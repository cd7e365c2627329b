//! Environment variable fallbacks.
//!
//! Environment variables are a fallback, not an override: they only fill
//! fields that no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "CREBAS_CP_ID",
        field_path: "authority.cp_id",
    },
    EnvMapping {
        var_name: "CREBAS_USER_ID",
        field_path: "authority.user_id",
    },
    EnvMapping {
        var_name: "CREBAS_CA_CERT",
        field_path: "authority.ca_cert",
    },
    EnvMapping {
        var_name: "CREBAS_CP_KEY",
        field_path: "authority.cp_key",
    },
    EnvMapping {
        var_name: "CREBAS_CP_CERT",
        field_path: "authority.cp_cert",
    },
    EnvMapping {
        var_name: "CREBAS_USER_KEY",
        field_path: "authority.user_key",
    },
    EnvMapping {
        var_name: "CREBAS_USER_CERT",
        field_path: "authority.user_cert",
    },
    EnvMapping {
        var_name: "CREBAS_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "CREBAS_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "CREBAS_LOG_TARGET",
        field_path: "logging.target",
    },
    EnvMapping {
        var_name: "CREBAS_LOG_DIR",
        field_path: "logging.directory",
    },
    EnvMapping {
        var_name: "CREBAS_LOG_ROTATION",
        field_path: "logging.rotation",
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_string_field(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Set a dotted `section.key` field, creating the section if needed.
fn set_string_field(root: &mut toml::Value, path: &str, val: &str) {
    let Some((section, key)) = path.split_once('.') else {
        return;
    };
    let Some(table) = root.as_table_mut() else {
        return;
    };
    let section = table
        .entry(section.to_owned())
        .or_insert(toml::Value::Table(toml::map::Map::new()));
    if let Some(section) = section.as_table_mut() {
        section.insert(key.to_owned(), toml::Value::String(val.to_owned()));
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
