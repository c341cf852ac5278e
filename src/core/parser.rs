//! Stack config parsing and validation.
//!
//! Parses `stackplan.yaml` (JSON and TOML are accepted by extension) and
//! validates structural constraints:
//! - Version must be "1.0"
//! - Name must not be empty
//! - Non-blank vpc ids must be well-formed
//! - Route and behavior paths must be shaped for the API / distribution

use super::error::SynthError;
use super::types::*;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Config file syntax, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Parse a stack config file from disk.
pub fn parse_config_file(path: &Path) -> Result<StackConfig, SynthError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SynthError::Io(format!("failed to read {}: {}", path.display(), e)))?;
    parse_config_as(&content, ConfigFormat::from_path(path))
}

/// Parse a YAML stack config from a string.
pub fn parse_config(yaml: &str) -> Result<StackConfig, SynthError> {
    parse_config_as(yaml, ConfigFormat::Yaml)
}

/// Parse a stack config in the given format.
pub fn parse_config_as(content: &str, format: ConfigFormat) -> Result<StackConfig, SynthError> {
    match format {
        ConfigFormat::Yaml => serde_yaml_ng::from_str(content)
            .map_err(|e| SynthError::Parse(format!("YAML parse error: {}", e))),
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| SynthError::Parse(format!("JSON parse error: {}", e))),
        ConfigFormat::Toml => toml::from_str(content)
            .map_err(|e| SynthError::Parse(format!("TOML parse error: {}", e))),
    }
}

fn vpc_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^vpc-[0-9a-f]+$").expect("static regex"))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &StackConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", config.version),
        });
    }

    if config.name.trim().is_empty() {
        errors.push(ValidationError {
            message: "name must not be empty".to_string(),
        });
    }

    if config.model_resources.is_empty() {
        errors.push(ValidationError {
            message: "model_resources must not be empty".to_string(),
        });
    }

    // Absent or blank ids are left to the lookup, which only runs for the
    // targeted environment in environment-aware mode.
    for (env_name, ctx) in &config.environments {
        let Some(id) = ctx.vpc_id.as_deref().map(str::trim) else {
            continue;
        };
        if !id.is_empty() && !vpc_id_pattern().is_match(id) {
            errors.push(ValidationError {
                message: format!(
                    "environment '{}' has malformed vpc-id '{}' (expected vpc-<hex>)",
                    env_name, id
                ),
            });
        }
    }

    if let Some(ref route) = config.profile.route_path {
        if route.is_empty() || route.starts_with('/') {
            errors.push(ValidationError {
                message: format!("profile.route_path '{}' must be relative and non-empty", route),
            });
        }
    }

    if let Some(ref pattern) = config.profile.behavior_path_pattern {
        if !pattern.starts_with('/') {
            errors.push(ValidationError {
                message: format!(
                    "profile.behavior_path_pattern '{}' must start with '/'",
                    pattern
                ),
            });
        }
    }

    errors
}
