//! Dimensional Aggregator
//!
//! Per-year sums for one categorical field, reindexed over the union of
//! labels seen in either year. Labels are compared verbatim: "北京" and
//! "北京 " are different groups.

use crate::classify::pct_growth;
use crate::error::{ReportError, Result};
use crate::frame;
use crate::record::{Record, Year};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

/// Label → amount, iterated in label order.
pub type GroupTotals = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub group_label: String,
    pub year: Year,
    pub total_amount: f64,
    pub count: usize,
}

/// Display ordering for labels of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Descending by `value_y1 + value_y2`.
    CombinedTotalDesc,
    /// Descending by `value_y2 - value_y1`.
    AbsGrowthDesc,
    LabelAsc,
}

/// Both years' totals for one field over the same label set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionTotals {
    pub field: String,
    pub totals_y1: GroupTotals,
    pub totals_y2: GroupTotals,
    pub counts_y1: BTreeMap<String, usize>,
    pub counts_y2: BTreeMap<String, usize>,
}

impl DimensionTotals {
    pub fn build(records_y1: &[Record], records_y2: &[Record], field: &str) -> Result<Self> {
        let has_records = !records_y1.is_empty() || !records_y2.is_empty();
        let known = records_y1
            .iter()
            .chain(records_y2.iter())
            .any(|r| r.has_field(field));
        if has_records && !known {
            return Err(ReportError::UnknownField(field.to_string()));
        }

        let groups_y1 = frame::group_records(records_y1, field)?;
        let groups_y2 = frame::group_records(records_y2, field)?;

        let mut totals_y1 = GroupTotals::new();
        let mut totals_y2 = GroupTotals::new();
        let mut counts_y1 = BTreeMap::new();
        let mut counts_y2 = BTreeMap::new();

        for g in &groups_y1 {
            *totals_y1.entry(g.group_label.clone()).or_insert(0.0) += g.total_amount;
            *counts_y1.entry(g.group_label.clone()).or_insert(0) += g.count;
        }
        for g in &groups_y2 {
            *totals_y2.entry(g.group_label.clone()).or_insert(0.0) += g.total_amount;
            *counts_y2.entry(g.group_label.clone()).or_insert(0) += g.count;
        }

        // Reindex both sides over the union, zero-filling
        let labels: Vec<String> = totals_y1
            .keys()
            .chain(totals_y2.keys())
            .cloned()
            .unique()
            .collect();
        for label in labels {
            totals_y1.entry(label.clone()).or_insert(0.0);
            totals_y2.entry(label.clone()).or_insert(0.0);
            counts_y1.entry(label.clone()).or_insert(0);
            counts_y2.entry(label).or_insert(0);
        }

        Ok(Self {
            field: field.to_string(),
            totals_y1,
            totals_y2,
            counts_y1,
            counts_y2,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &String> {
        self.totals_y1.keys()
    }

    pub fn len(&self) -> usize {
        self.totals_y1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals_y1.is_empty()
    }

    pub fn value_y1(&self, label: &str) -> f64 {
        self.totals_y1.get(label).copied().unwrap_or(0.0)
    }

    pub fn value_y2(&self, label: &str) -> f64 {
        self.totals_y2.get(label).copied().unwrap_or(0.0)
    }

    pub fn grand_total_y1(&self) -> f64 {
        self.totals_y1.values().sum()
    }

    pub fn grand_total_y2(&self) -> f64 {
        self.totals_y2.values().sum()
    }

    /// Labels ordered by `sort`. Ties keep label order.
    pub fn ordered_labels(&self, sort: SortKey) -> Vec<String> {
        let labels = self.labels().cloned();
        match sort {
            SortKey::LabelAsc => labels.collect(),
            SortKey::CombinedTotalDesc => labels
                .sorted_by(|a, b| {
                    let ta = self.value_y1(a) + self.value_y2(a);
                    let tb = self.value_y1(b) + self.value_y2(b);
                    tb.total_cmp(&ta)
                })
                .collect(),
            SortKey::AbsGrowthDesc => labels
                .sorted_by(|a, b| {
                    let ga = self.value_y2(a) - self.value_y1(a);
                    let gb = self.value_y2(b) - self.value_y1(b);
                    gb.total_cmp(&ga)
                })
                .collect(),
        }
    }
}

/// Sums per label for each year, over the union of labels.
pub fn aggregate(
    records_y1: &[Record],
    records_y2: &[Record],
    field: &str,
) -> Result<(GroupTotals, GroupTotals)> {
    let totals = DimensionTotals::build(records_y1, records_y2, field)?;
    Ok((totals.totals_y1, totals.totals_y2))
}

/// Groups partitioned by the size of their absolute growth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthSplit {
    pub field: String,
    /// `max(median |growth|, floor)`
    pub threshold: f64,
    /// `|growth| >= threshold`, growth descending.
    pub large: Vec<(String, f64)>,
    pub small: Vec<(String, f64)>,
    /// Absent in year 1, present in year 2.
    pub new_groups: Vec<(String, f64)>,
    /// Present in year 1, zero in year 2.
    pub zeroed_groups: Vec<(String, f64)>,
}

impl GrowthSplit {
    pub fn compute(totals: &DimensionTotals, floor: f64) -> Self {
        let growth: Vec<(String, f64)> = totals
            .ordered_labels(SortKey::AbsGrowthDesc)
            .into_iter()
            .map(|label| {
                let g = totals.value_y2(&label) - totals.value_y1(&label);
                (label, g)
            })
            .collect();

        let magnitudes: Vec<f64> = growth.iter().map(|(_, g)| g.abs()).collect();
        let threshold = median(&magnitudes).max(floor);

        let (large, small): (Vec<_>, Vec<_>) = growth
            .iter()
            .cloned()
            .partition(|(_, g)| g.abs() >= threshold);

        let new_groups = growth
            .iter()
            .filter(|(label, _)| totals.value_y1(label) == 0.0 && totals.value_y2(label) > 0.0)
            .cloned()
            .collect();
        let zeroed_groups = growth
            .iter()
            .filter(|(label, _)| totals.value_y1(label) > 0.0 && totals.value_y2(label) == 0.0)
            .cloned()
            .collect();

        Self {
            field: totals.field.clone(),
            threshold,
            large,
            small,
            new_groups,
            zeroed_groups,
        }
    }
}

/// Average amount per record of one group in both years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupQuality {
    pub group_label: String,
    pub total_y1: f64,
    pub count_y1: usize,
    pub avg_y1: f64,
    pub total_y2: f64,
    pub count_y2: usize,
    pub avg_y2: f64,
    /// Change of the average in percent; -100 when the group has no
    /// records in year 2.
    pub change_rate: f64,
}

impl GroupQuality {
    pub fn absent_y2(&self) -> bool {
        self.count_y2 == 0
    }
}

/// Per-record average amount for every group that has year-1 records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectQuality {
    pub field: String,
    /// Combined total descending.
    pub groups: Vec<GroupQuality>,
    /// Steepest falls of the average, among groups still present in year 2.
    pub worst: Vec<GroupQuality>,
}

impl ProjectQuality {
    pub fn compute(totals: &DimensionTotals, worst_k: usize) -> Self {
        let count = |counts: &BTreeMap<String, usize>, label: &str| counts.get(label).copied().unwrap_or(0);

        let groups: Vec<GroupQuality> = totals
            .ordered_labels(SortKey::CombinedTotalDesc)
            .into_iter()
            .filter(|label| count(&totals.counts_y1, label) > 0)
            .map(|label| {
                let count_y1 = count(&totals.counts_y1, &label);
                let count_y2 = count(&totals.counts_y2, &label);
                let avg_y1 = average(totals.value_y1(&label), count_y1);
                let avg_y2 = average(totals.value_y2(&label), count_y2);
                GroupQuality {
                    total_y1: totals.value_y1(&label),
                    total_y2: totals.value_y2(&label),
                    count_y1,
                    count_y2,
                    avg_y1,
                    avg_y2,
                    change_rate: if count_y2 == 0 {
                        -100.0
                    } else {
                        pct_growth(avg_y1, avg_y2)
                    },
                    group_label: label,
                }
            })
            .collect();

        let worst = groups
            .iter()
            .filter(|g| !g.absent_y2() && g.change_rate < 0.0)
            .sorted_by(|a, b| a.change_rate.total_cmp(&b.change_rate))
            .take(worst_k)
            .cloned()
            .collect();

        Self {
            field: totals.field.clone(),
            groups,
            worst,
        }
    }
}

/// `total / count`, or 0 for no records.
pub fn average(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Median with the two middle values averaged; 0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted: Vec<f64> = values.iter().copied().sorted_by(|a, b| a.total_cmp(b)).collect();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn records(year: i32, rows: &[(u8, i32)]) -> Vec<Record> {
        rows.iter()
            .map(|(label, cents)| {
                let mut keys = HashMap::new();
                keys.insert("f".to_string(), format!("g{}", label));
                Record::new(year, keys, *cents as f64 / 100.0)
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_totals_preserve_mass(
            rows_y1 in prop::collection::vec((0u8..6, -100_000i32..100_000), 0..40),
            rows_y2 in prop::collection::vec((0u8..6, -100_000i32..100_000), 1..40),
        ) {
            let y1 = records(2024, &rows_y1);
            let y2 = records(2025, &rows_y2);
            let (t1, t2) = aggregate(&y1, &y2, "f").unwrap();

            let expected_y1: f64 = y1.iter().map(|r| r.amount).sum();
            let expected_y2: f64 = y2.iter().map(|r| r.amount).sum();
            prop_assert!((t1.values().sum::<f64>() - expected_y1).abs() < 1e-6);
            prop_assert!((t2.values().sum::<f64>() - expected_y2).abs() < 1e-6);
        }

        #[test]
        fn prop_union_complete(
            rows_y1 in prop::collection::vec((0u8..8, 0i32..1000), 0..20),
            rows_y2 in prop::collection::vec((0u8..8, 0i32..1000), 1..20),
        ) {
            let y1 = records(2024, &rows_y1);
            let y2 = records(2025, &rows_y2);
            let (t1, t2) = aggregate(&y1, &y2, "f").unwrap();

            for r in y1.iter().chain(y2.iter()) {
                prop_assert!(t1.contains_key(r.label("f")));
                prop_assert!(t2.contains_key(r.label("f")));
            }
            prop_assert_eq!(t1.len(), t2.len());
        }
    }
}
