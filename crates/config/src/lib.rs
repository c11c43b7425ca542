// Configuration loading
//
// Pipeline settings live in a TOML file; the roster, excluded managers,
// revenue targets and promotion rules are JSON files maintained by the
// dashboard's admin screens. Everything here is read-only from the
// pipeline's point of view, except the targets migration on save.

pub mod error;
pub mod promotion;
pub mod roster;
pub mod settings;
pub mod targets;

use std::path::Path;

pub use error::ConfigError;
pub use promotion::{product_key, DateRange, MinimumCriteria, PromotionSettings, PromotionTier, RankingMode, PRODUCT_KEYS};
pub use roster::{load_excluded_managers, RosterFile};
pub use settings::{config_dir, CacheSettings, ConfigPaths, ContractFilter, HeaderRows, PipelineSettings};
pub use targets::{MonthTarget, RevenueTargets};

/// All persisted configuration the pipeline reads, plus whatever failed to
/// load. Failed pieces are replaced by their defaults.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub roster: RosterFile,
    pub excluded_managers: Vec<String>,
    pub targets: RevenueTargets,
    pub promotion: PromotionSettings,
    pub problems: Vec<ConfigError>,
}

impl LoadedConfig {
    /// Load every file referenced by `settings.paths`. Missing paths are not
    /// an error; unreadable or malformed files are recorded in `problems`.
    pub fn load(settings: &PipelineSettings) -> Self {
        let mut loaded = LoadedConfig::default();
        let paths = &settings.paths;

        if let Some(path) = &paths.roster {
            match RosterFile::load(path) {
                Ok(roster) => loaded.roster = roster,
                Err(e) => loaded.problems.push(e),
            }
        }
        if let Some(path) = &paths.excluded_managers {
            match load_excluded_managers(path) {
                Ok(list) => loaded.excluded_managers = list,
                Err(e) => loaded.problems.push(e),
            }
        }
        if let Some(path) = &paths.targets {
            match RevenueTargets::load(path) {
                Ok((targets, migrated)) => {
                    if migrated {
                        log::info!("revenue targets in {} use the legacy single-value schema", path.display());
                    }
                    loaded.targets = targets;
                }
                Err(e) => loaded.problems.push(e),
            }
        }
        if let Some(path) = &paths.promotion {
            match PromotionSettings::load(path) {
                Ok(promotion) => loaded.promotion = promotion,
                Err(e) => loaded.problems.push(e),
            }
        }

        for problem in &loaded.problems {
            log::warn!("configuration fallback: {problem}");
        }
        loaded
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn broken_files_fall_back_and_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let roster = dir.path().join("roster.json");
        let targets = dir.path().join("targets.json");
        fs::write(&roster, "{ not json").unwrap();
        fs::write(&targets, r#"{"monthly_targets": {"3": {"direct_target": 5, "affiliate_target": 2}}}"#).unwrap();

        let mut settings = PipelineSettings::default();
        settings.paths.roster = Some(roster);
        settings.paths.targets = Some(targets);
        settings.paths.promotion = Some(dir.path().join("missing.json"));

        let loaded = LoadedConfig::load(&settings);
        assert!(loaded.roster.crm.is_empty());
        assert_eq!(loaded.targets.for_month(3).direct_target, 5.0);
        assert_eq!(loaded.problems.len(), 2);
    }
}
