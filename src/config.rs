//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` in the config directory overrides
//! them key by key.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [block]
//! name = "core/cover"                         # Block the filter applies to
//! desktop_field_attribute = "acfDesktopFieldKey"
//! mobile_field_attribute = "acfMobileFieldKey"
//!
//! [target]
//! tag = ""                  # Element tag to mutate, empty = any
//! class = "wp-block-cover"  # Class the element must carry, empty = any
//!
//! [markup]
//! scope_attribute = "carmo-bg-id"  # Emitted as data-carmo-bg-id
//! background_size = "cover"        # background-size in the scoped rule
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [block]
//! name = "acme/hero"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::inject::{InjectOptions, MOBILE_ATTRIBUTE, TargetSelector};
use crate::pipeline::CoverBlockOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverConfig {
    /// Which block the filter handles and where its field ids live.
    pub block: BlockConfig,
    /// Which element of the fragment receives the background.
    pub target: TargetConfig,
    /// Names and values used in the generated markup.
    pub markup: MarkupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockConfig {
    pub name: String,
    pub desktop_field_attribute: String,
    pub mobile_field_attribute: String,
}

impl Default for BlockConfig {
    fn default() -> Self {
        let stock = CoverBlockOptions::default();
        Self {
            name: stock.block_name,
            desktop_field_attribute: stock.desktop_field_attribute,
            mobile_field_attribute: stock.mobile_field_attribute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// Empty matches any tag.
    pub tag: String,
    /// Empty matches any class.
    pub class: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            tag: String::new(),
            class: "wp-block-cover".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupConfig {
    /// Scope attribute name without the `data-` prefix.
    pub scope_attribute: String,
    pub background_size: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            scope_attribute: "carmo-bg-id".to_string(),
            background_size: "cover".to_string(),
        }
    }
}

impl CoverConfig {
    /// Validate that every value can be emitted as-is.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.block;
        for (key, value) in [
            ("block.name", &b.name),
            ("block.desktop_field_attribute", &b.desktop_field_attribute),
            ("block.mobile_field_attribute", &b.mobile_field_attribute),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }

        if !self.target.tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(
                "target.tag must be ASCII letters and digits".into(),
            ));
        }
        if self.target.class.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "target.class must be a single class name".into(),
            ));
        }

        let scope = &self.markup.scope_attribute;
        if scope.is_empty()
            || !scope
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(
                "markup.scope_attribute must be lowercase letters, digits or '-'".into(),
            ));
        }
        if format!("data-{scope}") == MOBILE_ATTRIBUTE {
            return Err(ConfigError::Validation(format!(
                "markup.scope_attribute must not collide with {MOBILE_ATTRIBUTE}"
            )));
        }

        let size = &self.markup.background_size;
        if size.trim().is_empty() || size.chars().any(|c| ";{}<>\"'\\".contains(c)) {
            return Err(ConfigError::Validation(
                "markup.background_size must be a plain CSS value".into(),
            ));
        }
        Ok(())
    }

    pub fn block_options(&self) -> CoverBlockOptions {
        CoverBlockOptions {
            block_name: self.block.name.clone(),
            desktop_field_attribute: self.block.desktop_field_attribute.clone(),
            mobile_field_attribute: self.block.mobile_field_attribute.clone(),
        }
    }

    pub fn inject_options(&self) -> InjectOptions {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        InjectOptions {
            target: TargetSelector {
                tag: non_empty(&self.target.tag),
                class: non_empty(&self.target.class),
            },
            scope_attribute: format!("data-{}", self.markup.scope_attribute),
            background_size: self.markup.background_size.clone(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(CoverConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CoverConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CoverConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<CoverConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(dir = %dir.display(), block = %config.block.name, "configuration loaded");
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# carmo-cover configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Source block
# ---------------------------------------------------------------------------
[block]
# Block name the background filter applies to. Other blocks pass through.
name = "core/cover"

# Block attributes holding the desktop and mobile field identifiers.
desktop_field_attribute = "acfDesktopFieldKey"
mobile_field_attribute = "acfMobileFieldKey"

# ---------------------------------------------------------------------------
# Target element
# ---------------------------------------------------------------------------
[target]
# The first element matching both constraints receives the background.
# Tag name to match. Empty matches any tag.
tag = ""

# Class the element must carry. Empty matches any class.
class = "wp-block-cover"

# ---------------------------------------------------------------------------
# Generated markup
# ---------------------------------------------------------------------------
[markup]
# Scope attribute tying the element to its style rule, without "data-".
# Lowercase letters, digits and '-' only.
scope_attribute = "carmo-bg-id"

# background-size declared alongside the desktop image above 768px.
background_size = "cover"
"##
}
