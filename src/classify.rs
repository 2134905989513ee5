//! Growth Classifier
//!
//! Turns a group's paired year values into growth figures and one of nine
//! status labels. Pure: the same inputs always give the same status.

use crate::aggregate::{DimensionTotals, SortKey};
use crate::config::ReportConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthStatus {
    HighGrowth,
    SteadyGrowth,
    Emerging,
    /// Share rose while the measured rate did not. Usually other groups shrank.
    GrowthWithoutRate,
    GrowthShareLagging,
    /// Value fell but share rose.
    Anomalous,
    DualDecline,
    Exited,
    Unchanged,
}

impl GrowthStatus {
    pub const ALL: [GrowthStatus; 9] = [
        GrowthStatus::HighGrowth,
        GrowthStatus::SteadyGrowth,
        GrowthStatus::Emerging,
        GrowthStatus::GrowthWithoutRate,
        GrowthStatus::GrowthShareLagging,
        GrowthStatus::Anomalous,
        GrowthStatus::DualDecline,
        GrowthStatus::Exited,
        GrowthStatus::Unchanged,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GrowthStatus::HighGrowth => "high-growth",
            GrowthStatus::SteadyGrowth => "steady-growth",
            GrowthStatus::Emerging => "emerging",
            GrowthStatus::GrowthWithoutRate => "growth-without-rate",
            GrowthStatus::GrowthShareLagging => "growth-share-lagging",
            GrowthStatus::Anomalous => "anomalous",
            GrowthStatus::DualDecline => "dual-decline",
            GrowthStatus::Exited => "exited",
            GrowthStatus::Unchanged => "unchanged",
        }
    }

    /// Statuses called out for review.
    pub fn needs_attention(self) -> bool {
        matches!(
            self,
            GrowthStatus::GrowthWithoutRate | GrowthStatus::Anomalous | GrowthStatus::DualDecline
        )
    }

    pub fn is_strong(self) -> bool {
        matches!(
            self,
            GrowthStatus::HighGrowth | GrowthStatus::SteadyGrowth | GrowthStatus::Emerging
        )
    }
}

impl fmt::Display for GrowthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-group growth figures for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRecord {
    pub group_label: String,
    pub value_y1: f64,
    pub value_y2: f64,
    pub abs_growth: f64,
    /// 0 when `value_y1 == 0`.
    pub pct_growth: f64,
    pub share_y1: f64,
    pub share_y2: f64,
    pub share_delta: f64,
    pub status: GrowthStatus,
}

/// Percentage growth with the zero-baseline convention: no prior value
/// means 0%, not infinity.
pub fn pct_growth(value_y1: f64, value_y2: f64) -> f64 {
    if value_y1 == 0.0 {
        0.0
    } else {
        (value_y2 - value_y1) / value_y1 * 100.0
    }
}

/// `value / total * 100`, or 0 when the total is 0.
pub fn share_of(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        value / total * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthClassifier {
    high_growth_pct: f64,
}

impl Default for GrowthClassifier {
    fn default() -> Self {
        Self::new(20.0)
    }
}

impl GrowthClassifier {
    pub fn new(high_growth_pct: f64) -> Self {
        Self { high_growth_pct }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(config.high_growth_pct)
    }

    /// Decision table, first match wins.
    pub fn status(&self, value_y1: f64, value_y2: f64, share_y1: f64, share_y2: f64) -> GrowthStatus {
        let growth = value_y2 - value_y1;
        let share_delta = share_y2 - share_y1;
        let pct = pct_growth(value_y1, value_y2);

        if growth > 0.0 {
            if share_delta > 0.0 {
                if pct > self.high_growth_pct {
                    GrowthStatus::HighGrowth
                } else if pct > 0.0 {
                    GrowthStatus::SteadyGrowth
                } else if pct == 0.0 && value_y1 == 0.0 {
                    GrowthStatus::Emerging
                } else {
                    GrowthStatus::GrowthWithoutRate
                }
            } else {
                GrowthStatus::GrowthShareLagging
            }
        } else if growth < 0.0 {
            if share_delta > 0.0 {
                GrowthStatus::Anomalous
            } else if value_y1 > 0.0 && value_y2 == 0.0 {
                GrowthStatus::Exited
            } else {
                GrowthStatus::DualDecline
            }
        } else if value_y1 == 0.0 {
            GrowthStatus::Emerging
        } else if value_y2 == 0.0 {
            GrowthStatus::Exited
        } else {
            GrowthStatus::Unchanged
        }
    }

    pub fn classify(
        &self,
        group_label: impl Into<String>,
        value_y1: f64,
        value_y2: f64,
        share_y1: f64,
        share_y2: f64,
    ) -> GrowthRecord {
        GrowthRecord {
            group_label: group_label.into(),
            value_y1,
            value_y2,
            abs_growth: value_y2 - value_y1,
            pct_growth: pct_growth(value_y1, value_y2),
            share_y1,
            share_y2,
            share_delta: share_y2 - share_y1,
            status: self.status(value_y1, value_y2, share_y1, share_y2),
        }
    }

    /// Classify every label of a dimension, ordered by `sort`.
    pub fn classify_dimension(&self, totals: &DimensionTotals, sort: SortKey) -> Vec<GrowthRecord> {
        let total_y1 = totals.grand_total_y1();
        let total_y2 = totals.grand_total_y2();

        totals
            .ordered_labels(sort)
            .into_iter()
            .map(|label| {
                let v1 = totals.value_y1(&label);
                let v2 = totals.value_y2(&label);
                self.classify(label, v1, v2, share_of(v1, total_y1), share_of(v2, total_y2))
            })
            .collect()
    }
}

/// Status under the default 20% high-growth cut.
pub fn classify_status(value_y1: f64, value_y2: f64, share_y1: f64, share_y2: f64) -> GrowthStatus {
    GrowthClassifier::default().status(value_y1, value_y2, share_y1, share_y2)
}
