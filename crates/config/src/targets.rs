// Monthly revenue targets
//
// Current schema:
//   { "monthly_targets": { "1": {"direct_target": N, "affiliate_target": N}, ... } }
// Legacy schema (one value for the whole year):
//   { "direct_target": N, "affiliate_target": N }
// Legacy files are expanded to all twelve months on read and rewritten in
// the current schema on the next save.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::read_file;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthTarget {
    #[serde(default)]
    pub direct_target: f64,
    #[serde(default)]
    pub affiliate_target: f64,
}

impl MonthTarget {
    pub fn total(&self) -> f64 {
        self.direct_target + self.affiliate_target
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevenueTargets {
    months: BTreeMap<u32, MonthTarget>,
}

#[derive(Serialize, Deserialize)]
struct PerMonthFile {
    monthly_targets: BTreeMap<String, MonthTarget>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TargetsFile {
    PerMonth(PerMonthFile),
    Legacy(MonthTarget),
}

impl RevenueTargets {
    /// Same target for every month.
    pub fn uniform(target: MonthTarget) -> Self {
        Self {
            months: (1..=12).map(|m| (m, target)).collect(),
        }
    }

    /// Target for `month` (1-12); zeros when unset.
    pub fn for_month(&self, month: u32) -> MonthTarget {
        self.months.get(&month).copied().unwrap_or_default()
    }

    pub fn set_month(&mut self, month: u32, target: MonthTarget) -> Result<(), ConfigError> {
        check_month(month)?;
        self.months.insert(month, target);
        Ok(())
    }

    /// Parse either schema. The flag is true when the legacy schema was read.
    pub fn from_json(input: &str) -> Result<(Self, bool), ConfigError> {
        let file: TargetsFile = serde_json::from_str(input).map_err(|e| ConfigError::parse(None, e))?;
        match file {
            TargetsFile::PerMonth(file) => {
                let mut months = BTreeMap::new();
                for (key, target) in file.monthly_targets {
                    let month: u32 = key
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::Validation(format!("month key '{key}' is not a number")))?;
                    check_month(month)?;
                    months.insert(month, target);
                }
                Ok((Self { months }, false))
            }
            TargetsFile::Legacy(target) => Ok((Self::uniform(target), true)),
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        let file = PerMonthFile {
            monthly_targets: self.months.iter().map(|(m, t)| (m.to_string(), *t)).collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| ConfigError::parse(None, e))
    }

    pub fn load(path: &Path) -> Result<(Self, bool), ConfigError> {
        let contents = read_file(path)?;
        Self::from_json(&contents).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    /// Always writes the per-month schema.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_json()?).map_err(io_err)
    }
}

fn check_month(month: u32) -> Result<(), ConfigError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("month must be 1-12, got {month}")))
    }
}
