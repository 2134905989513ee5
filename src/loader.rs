//! Record Loader - turns one year's CSV export into cleaned records
//!
//! Decoding walks the configured encoding chain and keeps the first decode
//! that produces no malformed sequences. Cleaning then drops, in order:
//! rows with every cell blank, rows whose amount is blank or not a finite
//! number, and exact duplicates of an earlier surviving row.

use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::record::{Record, Year};
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Per-file cleaning counters. Dropped rows are only ever counted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub encoding: String,
    pub rows_read: usize,
    pub dropped_empty: usize,
    pub dropped_amount: usize,
    pub dropped_duplicate: usize,
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub records: Vec<Record>,
    pub stats: LoadStats,
}

pub struct RecordLoader {
    amount_column: String,
    encodings: Vec<(String, &'static Encoding)>,
}

impl RecordLoader {
    pub fn new(amount_column: impl Into<String>, encodings: &[String]) -> Result<Self> {
        let encodings = encodings
            .iter()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes())
                    .map(|enc| (label.clone(), enc))
                    .ok_or_else(|| ReportError::UnknownEncoding(label.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        if encodings.is_empty() {
            return Err(ReportError::Config("encodings list is empty".to_string()));
        }

        Ok(Self {
            amount_column: amount_column.into(),
            encodings,
        })
    }

    pub fn from_config(config: &ReportConfig) -> Result<Self> {
        Self::new(config.amount_column.clone(), &config.encodings)
    }

    /// Load and clean one file's bytes, stamping every record with `year`.
    pub fn load(&self, bytes: &[u8], year: Year) -> Result<Vec<Record>> {
        Ok(self.load_with_stats(bytes, year)?.records)
    }

    pub fn load_path(&self, path: impl AsRef<Path>, year: Year) -> Result<LoadedFile> {
        let bytes = std::fs::read(path.as_ref())?;
        self.load_with_stats(&bytes, year)
    }

    pub fn load_with_stats(&self, bytes: &[u8], year: Year) -> Result<LoadedFile> {
        let (text, encoding) = self.decode(bytes)?;
        let mut stats = LoadStats {
            encoding: encoding.to_string(),
            ..LoadStats::default()
        };

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ReportError::EmptyInput(year));
        }

        let amount_idx = headers
            .iter()
            .position(|h| *h == self.amount_column)
            .ok_or_else(|| ReportError::MissingRequiredColumn {
                column: self.amount_column.clone(),
            })?;

        let mut seen: HashSet<(Vec<String>, u64)> = HashSet::new();
        let mut records = Vec::new();

        for row in rdr.records() {
            let row = row?;
            stats.rows_read += 1;

            if row.iter().all(|cell| cell.trim().is_empty()) {
                stats.dropped_empty += 1;
                continue;
            }

            let amount = match row.get(amount_idx).and_then(parse_amount) {
                Some(amount) => amount,
                None => {
                    stats.dropped_amount += 1;
                    continue;
                }
            };

            let cells: Vec<String> = headers
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != amount_idx)
                .map(|(idx, _)| row.get(idx).unwrap_or("").to_string())
                .collect();

            // -0.0 and 0.0 are the same amount
            let amount_bits = if amount == 0.0 { 0.0f64.to_bits() } else { amount.to_bits() };
            if !seen.insert((cells.clone(), amount_bits)) {
                stats.dropped_duplicate += 1;
                continue;
            }

            let group_keys: HashMap<String, String> = headers
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != amount_idx)
                .filter_map(|(idx, header)| row.get(idx).map(|cell| (header.clone(), cell.to_string())))
                .collect();

            records.push(Record::new(year, group_keys, amount));
        }

        stats.kept = records.len();
        debug!(
            "Year {}: read {} rows, dropped {} empty, {} bad amount, {} duplicate",
            year, stats.rows_read, stats.dropped_empty, stats.dropped_amount, stats.dropped_duplicate
        );
        info!("Loaded {} records for {} ({})", stats.kept, year, stats.encoding);

        Ok(LoadedFile { records, stats })
    }

    /// Decode with the first encoding that yields no malformed input.
    /// A leading BOM for the winning encoding is removed.
    pub fn decode(&self, bytes: &[u8]) -> Result<(String, &str)> {
        for (label, encoding) in &self.encodings {
            let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
            if had_errors {
                debug!("Decoding as {} failed, trying next", label);
                continue;
            }
            return Ok((text.into_owned(), label.as_str()));
        }

        Err(ReportError::EncodingUnsupported {
            tried: self.encodings.iter().map(|(label, _)| label.clone()).collect(),
        })
    }
}

/// Coerce an amount cell. Blank, unparseable and non-finite values yield None.
fn parse_amount(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
