// Agent roster file: { "CRM팀": [...], "온라인팀": [...] }

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::read_file;

/// Agent-name fragments that mark a call-time row as a non-agent line
/// (break time, wrap-up, idle, totals, login IDs).
pub fn default_invalid_patterns() -> Vec<String> {
    ["휴식", "후처리", "대기", "기타", "합계", "ID"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(rename = "CRM팀", default)]
    pub crm: Vec<String>,
    #[serde(rename = "온라인팀", default)]
    pub online: Vec<String>,
    #[serde(default = "default_invalid_patterns")]
    pub invalid_patterns: Vec<String>,
}

impl Default for RosterFile {
    fn default() -> Self {
        Self {
            crm: Vec::new(),
            online: Vec::new(),
            invalid_patterns: default_invalid_patterns(),
        }
    }
}

impl RosterFile {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|e| ConfigError::parse(None, e))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_file(path)?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::parse(Some(path), e))
    }
}

/// Managerial accounts excluded from every per-agent output: a JSON list of names.
pub fn load_excluded_managers(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = read_file(path)?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::parse(Some(path), e))
}
