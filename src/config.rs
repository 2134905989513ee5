//! Report configuration
//!
//! Column names, report years, the decode chain and the numeric thresholds
//! that drive classification and splitting. Loaded from a JSON file and then
//! overridden from `YOY_*` environment variables.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Names of the categorical columns the report groups by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub platform: String,
    pub city: String,
    pub format: String,
    pub industry: String,
    pub client: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            platform: "业绩平台".to_string(),
            city: "城市".to_string(),
            format: "一级业态".to_string(),
            industry: "行业".to_string(),
            client: "客户".to_string(),
        }
    }
}

impl FieldNames {
    /// Dimensions shown in the full report, in display order.
    pub fn dimensions(&self) -> Vec<&str> {
        vec![
            self.platform.as_str(),
            self.city.as_str(),
            self.format.as_str(),
            self.industry.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Column holding the amount, in units of 10k currency.
    pub amount_column: String,
    pub year1: i32,
    pub year2: i32,
    pub fields: FieldNames,
    /// Decode chain, tried in order. WHATWG labels.
    pub encodings: Vec<String>,
    /// pct_growth above this is high-growth; at or below is steady.
    pub high_growth_pct: f64,
    /// Floor for the large/small growth split threshold.
    pub min_growth_threshold: f64,
    pub top_n: usize,
    pub concentration_k: usize,
    pub contribution_k: usize,
    /// How many groups the project quality view lists as steepest falls.
    pub quality_k: usize,
    /// Highlighted labels per grouping field (e.g. key cities).
    pub key_groups: HashMap<String, Vec<String>>,
}

/// Key cities highlighted under the default city column.
pub const DEFAULT_KEY_CITIES: [&str; 10] = [
    "广州", "北京", "成都", "上海", "杭州", "重庆", "深圳", "珠海", "天津", "苏州",
];

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            amount_column: "业绩金额".to_string(),
            year1: 2024,
            year2: 2025,
            fields: FieldNames::default(),
            encodings: vec![
                "utf-8".to_string(),
                "gbk".to_string(),
                "gb2312".to_string(),
                "iso-8859-1".to_string(),
            ],
            high_growth_pct: 20.0,
            min_growth_threshold: 500.0,
            top_n: 10,
            concentration_k: 3,
            contribution_k: 3,
            quality_k: 3,
            key_groups: HashMap::from([(
                FieldNames::default().city,
                DEFAULT_KEY_CITIES.iter().map(|c| c.to_string()).collect(),
            )]),
        }
    }
}

impl ReportConfig {
    /// Load configuration from a JSON file. Missing keys take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `YOY_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Split out so tests do not
    /// have to touch the process environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("YOY_AMOUNT_COLUMN") {
            self.amount_column = v;
        }
        if let Some(v) = lookup("YOY_YEAR1") {
            self.year1 = parse_override("YOY_YEAR1", &v)?;
        }
        if let Some(v) = lookup("YOY_YEAR2") {
            self.year2 = parse_override("YOY_YEAR2", &v)?;
        }
        if let Some(v) = lookup("YOY_MIN_GROWTH_THRESHOLD") {
            self.min_growth_threshold = parse_override("YOY_MIN_GROWTH_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("YOY_TOP_N") {
            self.top_n = parse_override("YOY_TOP_N", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.year1 == self.year2 {
            return Err(ReportError::Config(format!(
                "year1 and year2 must differ (both {})",
                self.year1
            )));
        }
        if self.amount_column.trim().is_empty() {
            return Err(ReportError::Config("amount_column is empty".to_string()));
        }
        if self.encodings.is_empty() {
            return Err(ReportError::Config("encodings list is empty".to_string()));
        }
        if self.top_n == 0 || self.concentration_k == 0 || self.contribution_k == 0 {
            return Err(ReportError::Config(
                "top_n, concentration_k and contribution_k must be positive".to_string(),
            ));
        }
        if !self.high_growth_pct.is_finite() || !self.min_growth_threshold.is_finite() {
            return Err(ReportError::Config("thresholds must be finite".to_string()));
        }
        Ok(())
    }

    pub fn key_groups_for(&self, field: &str) -> &[String] {
        self.key_groups
            .get(field)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ReportError::Config(format!("{} has invalid value '{}'", key, value)))
}
