//! YAML/JSON configuration loading with `${ENV:default}` expansion.

use crate::error::{DeckError, Result};
use serde::de::DeserializeOwned;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::Path;

/// Read a YAML (or JSON) file, expand environment variables and deserialize it.
pub fn load_config_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| DeckError::Config(format!("Failed to read config file {:?}: {}", path, e)))?;
    parse_config(&content)
        .map_err(|e| DeckError::Config(format!("Invalid config file {:?}: {}", path, e)))
}

/// Parse configuration text. JSON documents are valid YAML, so one parser covers both.
pub fn parse_config<T: DeserializeOwned>(content: &str) -> std::result::Result<T, String> {
    let mut value: YamlValue = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    if value.is_null() {
        value = YamlValue::Mapping(Default::default());
    }
    expand_variables(&mut value);
    serde_yaml::from_value(value).map_err(|e| e.to_string())
}

/// Expand `${ENV_VAR:default}` in every string value.
fn expand_variables(value: &mut YamlValue) {
    match value {
        YamlValue::String(s) => {
            if let Some(expanded) = expand_env_in_string(s) {
                *value = retype(expanded);
            }
        }
        YamlValue::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_variables(v);
            }
        }
        YamlValue::Sequence(seq) => {
            for item in seq.iter_mut() {
                expand_variables(item);
            }
        }
        _ => {}
    }
}

/// Let expanded numbers and booleans deserialize into typed fields.
fn retype(expanded: String) -> YamlValue {
    match serde_yaml::from_str::<YamlValue>(&expanded) {
        Ok(v @ (YamlValue::Number(_) | YamlValue::Bool(_))) => v,
        _ => YamlValue::String(expanded),
    }
}

/// Expand environment variables in a string
///
/// Supports syntax: ${ENV_VAR:default_value}
fn expand_env_in_string(s: &str) -> Option<String> {
    if !s.contains("${") {
        return None;
    }

    let re = regex::Regex::new(r"\$\{([^:}]+)(?::([^}]*))?\}").ok()?;
    let expanded = re.replace_all(s, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        env::var(&cap[1]).unwrap_or_else(|_| default_value.to_string())
    });

    Some(expanded.into_owned())
}
