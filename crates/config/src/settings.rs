// Pipeline settings
// Loaded from ~/.config/salesdash/settings.toml

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::read_file;

// ---------------------------------------------------------------------------
// Top-level settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub vat_rate: f64,
    pub header_rows: HeaderRows,
    /// Display order of product rows; unlisted products follow in their
    /// natural order.
    pub product_order: Vec<String>,
    /// Shared logins dropped before any per-agent tally.
    pub excluded_accounts: Vec<String>,
    /// Suppress agents that are not on the roster.
    pub registered_only: bool,
    pub raw_row_cap: usize,
    pub contract_filter: ContractFilter,
    pub cache: CacheSettings,
    /// Extra non-business days on top of weekends.
    pub holidays: Vec<NaiveDate>,
    pub paths: ConfigPaths,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            vat_rate: 0.011,
            header_rows: HeaderRows::default(),
            product_order: ["chair", "mattress", "water"].iter().map(|s| s.to_string()).collect(),
            excluded_accounts: vec!["fmin2".to_string()],
            registered_only: true,
            raw_row_cap: 100_000,
            contract_filter: ContractFilter::default(),
            cache: CacheSettings::default(),
            holidays: Vec::new(),
            paths: ConfigPaths::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Zero-based header row per input kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderRows {
    pub sales: usize,
    pub contract: usize,
    pub call_time: usize,
    pub installation: usize,
}

impl Default for HeaderRows {
    fn default() -> Self {
        Self {
            sales: 0,
            contract: 2,
            call_time: 0,
            installation: 0,
        }
    }
}

/// Record-level filter applied to matched contract rows in the per-agent analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractFilter {
    pub sale_channels: Vec<String>,
    pub require_campaign: bool,
}

impl Default for ContractFilter {
    fn default() -> Self {
        Self {
            sale_channels: vec!["본사".to_string(), "온라인".to_string()],
            require_campaign: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            capacity: 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPaths {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_managers: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PathBuf>,
}

impl ConfigPaths {
    /// Resolve relative paths against the directory holding the settings file.
    fn rebase(&mut self, base: &Path) {
        for path in [
            &mut self.roster,
            &mut self.excluded_managers,
            &mut self.targets,
            &mut self.promotion,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineSettings {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let settings: PipelineSettings = toml::from_str(input).map_err(|e| ConfigError::parse(None, e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.vat_rate.is_finite() || self.vat_rate < 0.0 {
            return Err(ConfigError::Validation(format!(
                "vat_rate must be a non-negative number, got {}",
                self.vat_rate
            )));
        }
        if self.raw_row_cap == 0 {
            return Err(ConfigError::Validation("raw_row_cap must be at least 1".into()));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Validation("cache.capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Default settings file location.
    pub fn config_path() -> PathBuf {
        config_dir().join("settings.toml")
    }

    /// Load from an explicit path. Relative data-file paths are resolved
    /// against the settings file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_file(path)?;
        let mut settings: PipelineSettings =
            toml::from_str(&contents).map_err(|e| ConfigError::parse(Some(path), e))?;
        settings.validate()?;
        if let Some(base) = path.parent() {
            settings.paths.rebase(base);
        }
        Ok(settings)
    }

    /// Load from the default location; a missing file yields defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::parse(None, e))
    }
}

/// `~/.config/salesdash` (platform equivalent), or `./salesdash` when the
/// platform has no config directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("salesdash")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        let settings = PipelineSettings::from_toml("").unwrap();
        assert_eq!(settings, PipelineSettings::default());
        assert_eq!(settings.header_rows.contract, 2);
        assert_eq!(settings.excluded_accounts, vec!["fmin2"]);
    }

    #[test]
    fn parse_sections() {
        let input = r#"
vat_rate = 0.1
registered_only = false
holidays = ["2024-02-09", "2024-02-12"]

[header_rows]
contract = 3

[contract_filter]
sale_channels = ["본사"]
require_campaign = false

[cache]
ttl_secs = 60
"#;
        let settings = PipelineSettings::from_toml(input).unwrap();
        assert_eq!(settings.vat_rate, 0.1);
        assert!(!settings.registered_only);
        assert_eq!(settings.header_rows.contract, 3);
        assert_eq!(settings.header_rows.sales, 0);
        assert_eq!(settings.contract_filter.sale_channels, vec!["본사"]);
        assert_eq!(settings.cache.ttl_secs, 60);
        assert_eq!(settings.cache.capacity, 20);
        assert_eq!(settings.holidays.len(), 2);
    }

    #[test]
    fn rejects_negative_vat() {
        let err = PipelineSettings::from_toml("vat_rate = -0.5").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_zero_cap_and_capacity() {
        assert!(PipelineSettings::from_toml("raw_row_cap = 0").is_err());
        assert!(PipelineSettings::from_toml("[cache]\ncapacity = 0").is_err());
    }

    #[test]
    fn rejects_wrong_types() {
        let err = PipelineSettings::from_toml("registered_only = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_rebases_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[paths]\nroster = \"roster.json\"\ntargets = \"/abs/targets.json\"\n").unwrap();

        let settings = PipelineSettings::load(&path).unwrap();
        assert_eq!(settings.paths.roster, Some(dir.path().join("roster.json")));
        assert_eq!(settings.paths.targets, Some(PathBuf::from("/abs/targets.json")));
    }

    #[test]
    fn toml_round_trips_defaults() {
        let text = PipelineSettings::default().to_toml().unwrap();
        assert_eq!(PipelineSettings::from_toml(&text).unwrap(), PipelineSettings::default());
    }
}
