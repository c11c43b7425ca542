// Promotion settings
//
// Keys follow the admin screen's JSON. Product keys and the ranking mode
// accept both the snake_case names and the Korean labels shown on screen;
// product keys are normalized to snake_case after parsing.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::read_file;

/// Product keys in display order.
pub const PRODUCT_KEYS: [&str; 5] = ["chair", "mattress", "water", "care_service", "membership"];

/// Map a snake_case or Korean product label to its snake_case key.
pub fn product_key(label: &str) -> Option<&'static str> {
    match label.trim() {
        "chair" | "안마의자" => Some("chair"),
        "mattress" | "라클라우드" => Some("mattress"),
        "water" | "정수기" => Some("water"),
        "care_service" | "케어" | "케어서비스" => Some("care_service"),
        "membership" | "멤버십" | "멤버쉽" => Some("membership"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    #[default]
    #[serde(alias = "건수", alias = "건수 기준")]
    ByCount,
    #[serde(alias = "금액", alias = "금액 기준")]
    ByAmount,
    #[serde(alias = "제품별 점수", alias = "점수 기준")]
    ByProductScore,
}

impl std::fmt::Display for RankingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByCount => write!(f, "by_count"),
            Self::ByAmount => write!(f, "by_amount"),
            Self::ByProductScore => write!(f, "by_product_score"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionTier {
    pub name: String,
    pub min_score: f64,
    /// Open-ended when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
}

impl PromotionTier {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min_score && self.max_score.map_or(true, |max| score <= max)
    }
}

/// Inclusive on both ends; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumCriteria {
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionSettings {
    pub analysis_mode: RankingMode,
    pub product_weights: BTreeMap<String, f64>,
    pub products_included: Vec<String>,
    pub include_service_products: bool,
    pub include_online: bool,
    pub include_indirect: bool,
    pub minimum_criteria: MinimumCriteria,
    pub promotion_tiers: Vec<PromotionTier>,
    pub date_range: DateRange,
    pub award_slots: usize,
}

impl Default for PromotionSettings {
    fn default() -> Self {
        Self {
            analysis_mode: RankingMode::ByCount,
            product_weights: BTreeMap::new(),
            products_included: PRODUCT_KEYS.iter().map(|s| s.to_string()).collect(),
            include_service_products: true,
            include_online: false,
            include_indirect: false,
            minimum_criteria: MinimumCriteria::default(),
            promotion_tiers: Vec::new(),
            date_range: DateRange::default(),
            award_slots: 3,
        }
    }
}

impl PromotionSettings {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let settings: PromotionSettings = serde_json::from_str(input).map_err(|e| ConfigError::parse(None, e))?;
        settings.normalized()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_file(path)?;
        let settings: PromotionSettings =
            serde_json::from_str(&contents).map_err(|e| ConfigError::parse(Some(path), e))?;
        settings.normalized()
    }

    /// Weight for a product key; unweighted products count once.
    pub fn weight(&self, key: &str) -> f64 {
        self.product_weights.get(key).copied().unwrap_or(1.0)
    }

    pub fn includes_product(&self, key: &str) -> bool {
        self.products_included.iter().any(|p| p == key)
    }

    /// First tier whose interval contains `score`.
    pub fn tier_for(&self, score: f64) -> Option<&PromotionTier> {
        self.promotion_tiers.iter().find(|t| t.contains(score))
    }

    fn normalized(mut self) -> Result<Self, ConfigError> {
        let mut weights = BTreeMap::new();
        for (label, weight) in std::mem::take(&mut self.product_weights) {
            let key = product_key(&label)
                .ok_or_else(|| ConfigError::Validation(format!("unknown product '{label}' in product_weights")))?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Validation(format!("weight for '{label}' must be non-negative")));
            }
            weights.insert(key.to_string(), weight);
        }
        self.product_weights = weights;

        let mut included = Vec::new();
        for label in &self.products_included {
            let key = product_key(label)
                .ok_or_else(|| ConfigError::Validation(format!("unknown product '{label}' in products_included")))?;
            if !included.iter().any(|k: &String| k == key) {
                included.push(key.to_string());
            }
        }
        self.products_included = included;

        for tier in &self.promotion_tiers {
            if let Some(max) = tier.max_score {
                if max < tier.min_score {
                    return Err(ConfigError::Validation(format!(
                        "tier '{}': max_score {max} is below min_score {}",
                        tier.name, tier.min_score
                    )));
                }
            }
        }
        if let (Some(start), Some(end)) = (self.date_range.start, self.date_range.end) {
            if end < start {
                return Err(ConfigError::Validation(format!("date_range ends ({end}) before it starts ({start})")));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let settings = PromotionSettings::from_json("{}").unwrap();
        assert_eq!(settings.analysis_mode, RankingMode::ByCount);
        assert_eq!(settings.award_slots, 3);
        assert_eq!(settings.products_included.len(), 5);
        assert_eq!(settings.weight("chair"), 1.0);
    }

    #[test]
    fn korean_labels_are_normalized() {
        let input = r#"{
            "analysis_mode": "제품별 점수",
            "product_weights": {"안마의자": 3, "정수기": 0.5},
            "products_included": ["안마의자", "chair", "정수기"],
            "minimum_criteria": {"count": 7},
            "promotion_tiers": [{"name": "골드", "min_score": 20}, {"name": "실버", "min_score": 10, "max_score": 19.99}],
            "date_range": {"start": "2024-03-01", "end": "2024-03-31"}
        }"#;
        let settings = PromotionSettings::from_json(input).unwrap();
        assert_eq!(settings.analysis_mode, RankingMode::ByProductScore);
        assert_eq!(settings.weight("chair"), 3.0);
        assert_eq!(settings.weight("water"), 0.5);
        assert_eq!(settings.products_included, vec!["chair", "water"]);
        assert_eq!(settings.minimum_criteria.count, 7);
        assert_eq!(settings.tier_for(25.0).map(|t| t.name.as_str()), Some("골드"));
        assert_eq!(settings.tier_for(12.0).map(|t| t.name.as_str()), Some("실버"));
        assert!(settings.tier_for(5.0).is_none());
        assert!(settings.date_range.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(!settings.date_range.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
    }

    #[test]
    fn unknown_product_is_rejected() {
        let err = PromotionSettings::from_json(r#"{"product_weights": {"sofa": 1}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        assert!(PromotionSettings::from_json(r#"{"promotion_tiers": [{"name": "x", "min_score": 5, "max_score": 1}]}"#).is_err());
        assert!(PromotionSettings::from_json(r#"{"date_range": {"start": "2024-03-02", "end": "2024-03-01"}}"#).is_err());
    }
}
