//! Analysis run: the two years' records loaded once, and every report view
//! derived from them.

use crate::aggregate::{average, DimensionTotals, GrowthSplit, GroupTotals, ProjectQuality, SortKey};
use crate::classify::{pct_growth, share_of, GrowthClassifier, GrowthRecord, GrowthStatus};
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::loader::{LoadStats, RecordLoader};
use crate::ranking::{self, ClientRanking};
use crate::record::{self, Record, Year};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Which year's records a ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearScope {
    Year1,
    Year2,
    Combined,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearOverview {
    pub year1: Year,
    pub year2: Year,
    pub total_y1: f64,
    pub total_y2: f64,
    pub abs_growth: f64,
    /// 0 unless the year-1 total is positive.
    pub growth_rate: f64,
    pub count_y1: usize,
    pub count_y2: usize,
    pub count_total: usize,
    pub avg_y1: f64,
    pub avg_y2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contributor {
    pub group_label: String,
    pub abs_growth: f64,
    pub pct_growth: f64,
    /// Share of the dimension's total growth.
    pub share_of_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionReport {
    pub field: String,
    /// Descending by `abs_growth`.
    pub records: Vec<GrowthRecord>,
    pub total_growth: f64,
    pub growing: usize,
    pub declining: usize,
    pub growing_ratio: f64,
    pub contribution_k: usize,
    pub top_contribution: f64,
    pub largest_contributor: Option<Contributor>,
    pub strong: Vec<String>,
    pub attention: Vec<String>,
    pub exited: Vec<String>,
}

impl DimensionReport {
    pub fn with_status(&self, status: GrowthStatus) -> impl Iterator<Item = &GrowthRecord> {
        self.records.iter().filter(move |r| r.status == status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearConcentration {
    pub year: Year,
    pub top: Vec<(String, f64)>,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationReport {
    pub field: String,
    pub k: usize,
    pub years: Vec<YearConcentration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyShare {
    pub year: Year,
    pub key_amount: f64,
    pub other_amount: f64,
    pub key_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyGrowth {
    pub group_label: String,
    pub value_y1: f64,
    pub value_y2: f64,
    pub abs_growth: f64,
    pub pct_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyGroupFocus {
    pub field: String,
    pub keys: Vec<String>,
    pub years: Vec<KeyShare>,
    /// Keys with records in either year, growth descending.
    pub growth: Vec<KeyGrowth>,
    /// Mean `abs_growth` over `growth`.
    pub average_growth: f64,
    /// Keys with no records in either year.
    pub missing: Vec<String>,
}

/// One key label split by a second field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyLabelBreakdown {
    pub group_label: String,
    pub by_y1: GroupTotals,
    pub by_y2: GroupTotals,
    pub total_y1: f64,
    pub total_y2: f64,
    /// Largest entry of `by_y1`; first label wins a tie.
    pub main_y1: Option<String>,
    pub main_y2: Option<String>,
    /// 0 unless `total_y1` is positive.
    pub growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyBreakdown {
    pub field: String,
    pub by_field: String,
    /// Configured key order. Keys without records are left out.
    pub groups: Vec<KeyLabelBreakdown>,
    /// Largest `total_y2 - total_y1` among keys with a positive year-1 total.
    pub fastest_growing: Option<(String, f64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullReport {
    pub generated_at: DateTime<Utc>,
    pub load_stats: Vec<LoadStats>,
    pub overview: YearOverview,
    pub dimensions: Vec<DimensionReport>,
    pub city_split: Option<GrowthSplit>,
    pub city_concentration: Option<ConcentrationReport>,
    pub city_quality: Option<ProjectQuality>,
    pub top_clients: ClientRanking,
    pub key_focus: Vec<KeyGroupFocus>,
    pub key_breakdown: Option<KeyBreakdown>,
}

pub struct AnalysisRun {
    config: ReportConfig,
    classifier: GrowthClassifier,
    records_y1: Vec<Record>,
    records_y2: Vec<Record>,
    load_stats: Vec<LoadStats>,
    totals_cache: RefCell<HashMap<String, DimensionTotals>>,
}

impl AnalysisRun {
    /// Build a run from already-loaded records. Every record must carry the
    /// year of the side it is passed on.
    pub fn new(config: ReportConfig, records_y1: Vec<Record>, records_y2: Vec<Record>) -> Result<Self> {
        config.validate()?;
        check_years(&records_y1, config.year1)?;
        check_years(&records_y2, config.year2)?;

        Ok(Self {
            classifier: GrowthClassifier::from_config(&config),
            config,
            records_y1,
            records_y2,
            load_stats: Vec::new(),
            totals_cache: RefCell::new(HashMap::new()),
        })
    }

    /// Load both files and build a run. Either file failing aborts the run.
    pub fn from_bytes(config: ReportConfig, bytes_y1: &[u8], bytes_y2: &[u8]) -> Result<Self> {
        let loader = RecordLoader::from_config(&config)?;
        let y1 = loader.load_with_stats(bytes_y1, config.year1)?;
        let y2 = loader.load_with_stats(bytes_y2, config.year2)?;

        let mut run = Self::new(config, y1.records, y2.records)?;
        run.load_stats = vec![y1.stats, y2.stats];
        Ok(run)
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn records_y1(&self) -> &[Record] {
        &self.records_y1
    }

    pub fn records_y2(&self) -> &[Record] {
        &self.records_y2
    }

    pub fn load_stats(&self) -> &[LoadStats] {
        &self.load_stats
    }

    pub fn overview(&self) -> YearOverview {
        let total_y1 = record::total_amount(&self.records_y1);
        let total_y2 = record::total_amount(&self.records_y2);
        let count_y1 = self.records_y1.len();
        let count_y2 = self.records_y2.len();

        YearOverview {
            year1: self.config.year1,
            year2: self.config.year2,
            total_y1,
            total_y2,
            abs_growth: total_y2 - total_y1,
            growth_rate: if total_y1 > 0.0 {
                (total_y2 - total_y1) / total_y1 * 100.0
            } else {
                0.0
            },
            count_y1,
            count_y2,
            count_total: count_y1 + count_y2,
            avg_y1: average(total_y1, count_y1),
            avg_y2: average(total_y2, count_y2),
        }
    }

    /// Union-indexed totals for one field. Computed once per field.
    pub fn totals(&self, field: &str) -> Result<DimensionTotals> {
        if let Some(cached) = self.totals_cache.borrow().get(field) {
            return Ok(cached.clone());
        }

        let totals = DimensionTotals::build(&self.records_y1, &self.records_y2, field)?;
        debug!("Aggregated {} groups for field '{}'", totals.len(), field);
        self.totals_cache
            .borrow_mut()
            .insert(field.to_string(), totals.clone());
        Ok(totals)
    }

    pub fn growth_records(&self, field: &str, sort: SortKey) -> Result<Vec<GrowthRecord>> {
        let totals = self.totals(field)?;
        Ok(self.classifier.classify_dimension(&totals, sort))
    }

    pub fn dimension_report(&self, field: &str) -> Result<DimensionReport> {
        let records = self.growth_records(field, SortKey::AbsGrowthDesc)?;
        let k = self.config.contribution_k;

        let total_growth: f64 = records.iter().map(|r| r.abs_growth).sum();
        let growing = records.iter().filter(|r| r.abs_growth > 0.0).count();
        let declining = records.iter().filter(|r| r.abs_growth < 0.0).count();

        let largest_contributor = records.first().map(|r| Contributor {
            group_label: r.group_label.clone(),
            abs_growth: r.abs_growth,
            pct_growth: r.pct_growth,
            share_of_growth: share_of(r.abs_growth, total_growth),
        });

        let strong = labels_where(&records, GrowthStatus::is_strong);
        let attention = labels_where(&records, GrowthStatus::needs_attention);
        let exited = labels_where(&records, |s| s == GrowthStatus::Exited);

        info!(
            "Dimension '{}': {} groups, {} growing, {} flagged",
            field,
            records.len(),
            growing,
            attention.len()
        );

        Ok(DimensionReport {
            field: field.to_string(),
            total_growth,
            growing,
            declining,
            growing_ratio: share_of(growing as f64, records.len() as f64),
            contribution_k: k,
            top_contribution: ranking::growth_contribution(&records, k),
            largest_contributor,
            strong,
            attention,
            exited,
            records,
        })
    }

    pub fn growth_split(&self, field: &str) -> Result<GrowthSplit> {
        let totals = self.totals(field)?;
        Ok(GrowthSplit::compute(&totals, self.config.min_growth_threshold))
    }

    pub fn concentration(&self, field: &str, k: usize) -> Result<ConcentrationReport> {
        let totals = self.totals(field)?;
        let years = [
            (self.config.year1, &totals.totals_y1, &totals.counts_y1),
            (self.config.year2, &totals.totals_y2, &totals.counts_y2),
        ]
        .into_iter()
        .map(|(year, year_totals, counts)| {
            // Zero-filled union entries are not real groups of that year
            let present = present_only(year_totals, counts);
            YearConcentration {
                year,
                top: ranking::top_n(&present, k),
                ratio: ranking::concentration(&present, k),
            }
        })
        .collect();

        Ok(ConcentrationReport {
            field: field.to_string(),
            k,
            years,
        })
    }

    /// Top `n` labels of a field by amount within `scope`.
    pub fn top_groups(&self, field: &str, scope: YearScope, n: usize) -> Result<Vec<(String, f64)>> {
        let totals = self.scope_totals(field, scope)?;
        Ok(ranking::top_n(&totals, n))
    }

    pub fn top_clients(&self, scope: YearScope, n: usize) -> Result<ClientRanking> {
        let fields = &self.config.fields;
        let client_totals = self.top_groups(&fields.client, scope, n)?;
        let industries = ranking::client_industries(
            self.scope_records(scope),
            &fields.client,
            &fields.industry,
        );
        Ok(ClientRanking {
            client_count: ranking::distinct_clients(self.scope_records(scope), &fields.client),
            clients: ranking::rank_clients(&client_totals, &industries),
        })
    }

    /// Average amount per record for each group of `field`.
    pub fn project_quality(&self, field: &str) -> Result<ProjectQuality> {
        let totals = self.totals(field)?;
        Ok(ProjectQuality::compute(&totals, self.config.quality_k))
    }

    /// Combined share of the configured key labels per year.
    pub fn key_group_focus(&self, field: &str) -> Result<Option<KeyGroupFocus>> {
        let keys = self.config.key_groups_for(field);
        if keys.is_empty() {
            return Ok(None);
        }
        let totals = self.totals(field)?;

        let years = [
            (self.config.year1, &totals.totals_y1),
            (self.config.year2, &totals.totals_y2),
        ]
        .into_iter()
        .map(|(year, year_totals)| {
            let (key_amount, other_amount) = year_totals.iter().fold(
                (0.0, 0.0),
                |(key, other), (label, v)| {
                    if keys.contains(label) {
                        (key + v, other)
                    } else {
                        (key, other + v)
                    }
                },
            );
            KeyShare {
                year,
                key_amount,
                other_amount,
                key_share: share_of(key_amount, key_amount + other_amount),
            }
        })
        .collect();

        let is_present = |key: &String| {
            totals.counts_y1.get(key).copied().unwrap_or(0) + totals.counts_y2.get(key).copied().unwrap_or(0) > 0
        };
        let growth: Vec<KeyGrowth> = keys
            .iter()
            .filter(|key| is_present(*key))
            .map(|key| {
                let (v1, v2) = (totals.value_y1(key), totals.value_y2(key));
                KeyGrowth {
                    group_label: key.clone(),
                    value_y1: v1,
                    value_y2: v2,
                    abs_growth: v2 - v1,
                    pct_growth: pct_growth(v1, v2),
                }
            })
            .sorted_by(|a, b| b.abs_growth.total_cmp(&a.abs_growth))
            .collect();
        let missing: Vec<String> = keys.iter().filter(|key| !is_present(*key)).cloned().collect();
        if !missing.is_empty() {
            debug!("Key labels of '{}' without records: {}", field, missing.join(", "));
        }

        Ok(Some(KeyGroupFocus {
            field: field.to_string(),
            keys: keys.to_vec(),
            years,
            average_growth: average(growth.iter().map(|g| g.abs_growth).sum(), growth.len()),
            growth,
            missing,
        }))
    }

    /// Totals of `by_field` inside each configured key label of `field`.
    /// Only positive amounts are counted.
    pub fn key_breakdown(&self, field: &str, by_field: &str) -> Result<Option<KeyBreakdown>> {
        let keys = self.config.key_groups_for(field);
        if keys.is_empty() {
            return Ok(None);
        }
        // Fails on a field neither file has
        self.totals(field)?;

        let mut groups = Vec::new();
        for key in keys {
            let y1 = key_records(&self.records_y1, field, key);
            let y2 = key_records(&self.records_y2, field, key);
            if y1.is_empty() && y2.is_empty() {
                continue;
            }

            let totals = DimensionTotals::build(&y1, &y2, by_field)?;
            let by_y1 = present_only(&totals.totals_y1, &totals.counts_y1);
            let by_y2 = present_only(&totals.totals_y2, &totals.counts_y2);
            let total_y1 = totals.grand_total_y1();
            let total_y2 = totals.grand_total_y2();

            groups.push(KeyLabelBreakdown {
                group_label: key.clone(),
                main_y1: main_label(&by_y1),
                main_y2: main_label(&by_y2),
                by_y1,
                by_y2,
                total_y1,
                total_y2,
                growth_rate: if total_y1 > 0.0 {
                    pct_growth(total_y1, total_y2)
                } else {
                    0.0
                },
            });
        }

        let fastest_growing = groups
            .iter()
            .filter(|g| g.total_y1 > 0.0)
            .fold(None, |best: Option<(&str, f64)>, g| {
                let growth = g.total_y2 - g.total_y1;
                match best {
                    Some((_, b)) if b >= growth => best,
                    _ => Some((g.group_label.as_str(), growth)),
                }
            })
            .map(|(label, growth)| (label.to_string(), growth));

        Ok(Some(KeyBreakdown {
            field: field.to_string(),
            by_field: by_field.to_string(),
            groups,
            fastest_growing,
        }))
    }

    /// Every view the report shows. Dimensions missing from both files are
    /// skipped with a warning.
    pub fn full_report(&self) -> Result<FullReport> {
        let fields = &self.config.fields;

        let mut dimensions = Vec::new();
        for field in fields.dimensions() {
            match self.dimension_report(field) {
                Ok(report) => dimensions.push(report),
                Err(ReportError::UnknownField(f)) => warn!("Skipping dimension '{}': not in input", f),
                Err(e) => return Err(e),
            }
        }

        let city_split = skip_unknown(self.growth_split(&fields.city))?;
        let city_concentration =
            skip_unknown(self.concentration(&fields.city, self.config.concentration_k))?;
        let city_quality = skip_unknown(self.project_quality(&fields.city))?;
        let top_clients =
            skip_unknown(self.top_clients(YearScope::Combined, self.config.top_n))?.unwrap_or_default();

        let mut key_focus = Vec::new();
        let mut key_fields: Vec<&String> = self.config.key_groups.keys().collect();
        key_fields.sort();
        for field in key_fields {
            if let Some(focus) = skip_unknown(self.key_group_focus(field))?.flatten() {
                key_focus.push(focus);
            }
        }
        let key_breakdown = skip_unknown(self.key_breakdown(&fields.city, &fields.format))?.flatten();

        Ok(FullReport {
            generated_at: Utc::now(),
            load_stats: self.load_stats.clone(),
            overview: self.overview(),
            dimensions,
            city_split,
            city_concentration,
            city_quality,
            top_clients,
            key_focus,
            key_breakdown,
        })
    }

    fn scope_records(&self, scope: YearScope) -> Box<dyn Iterator<Item = &Record> + '_> {
        match scope {
            YearScope::Year1 => Box::new(self.records_y1.iter()),
            YearScope::Year2 => Box::new(self.records_y2.iter()),
            YearScope::Combined => Box::new(self.records_y1.iter().chain(self.records_y2.iter())),
        }
    }

    fn scope_totals(&self, field: &str, scope: YearScope) -> Result<GroupTotals> {
        let totals = self.totals(field)?;
        Ok(match scope {
            YearScope::Year1 => present_only(&totals.totals_y1, &totals.counts_y1),
            YearScope::Year2 => present_only(&totals.totals_y2, &totals.counts_y2),
            YearScope::Combined => totals
                .labels()
                .map(|label| (label.clone(), totals.value_y1(label) + totals.value_y2(label)))
                .collect(),
        })
    }
}

fn check_years(records: &[Record], expected: Year) -> Result<()> {
    match records.iter().find(|r| r.year != expected) {
        Some(r) => Err(ReportError::Config(format!(
            "record stamped {} passed as year {}",
            r.year, expected
        ))),
        None => Ok(()),
    }
}

fn labels_where(records: &[GrowthRecord], pred: impl Fn(GrowthStatus) -> bool) -> Vec<String> {
    records
        .iter()
        .filter(|r| pred(r.status))
        .map(|r| r.group_label.clone())
        .collect()
}

/// Entries of `values` whose label has at least one record.
fn present_only(values: &GroupTotals, counts: &BTreeMap<String, usize>) -> GroupTotals {
    values
        .iter()
        .filter(|(label, _)| counts.get(*label).copied().unwrap_or(0) > 0)
        .map(|(label, v)| (label.clone(), *v))
        .collect()
}

fn key_records(records: &[Record], field: &str, key: &str) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.label(field) == key && r.amount > 0.0)
        .cloned()
        .collect()
}

fn main_label(values: &GroupTotals) -> Option<String> {
    values
        .iter()
        .fold(None, |best: Option<(&String, f64)>, (label, v)| match best {
            Some((_, b)) if b >= *v => best,
            _ => Some((label, *v)),
        })
        .map(|(label, _)| label.clone())
}

fn skip_unknown<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(ReportError::UnknownField(f)) => {
            warn!("Skipping view over '{}': not in input", f);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
