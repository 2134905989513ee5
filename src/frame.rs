//! Polars bridge: records projected onto one grouping field, and the
//! grouped sum/count over that projection.

use crate::aggregate::GroupAggregate;
use crate::error::Result;
use crate::record::Record;
use polars::prelude::*;

pub const YEAR_COLUMN: &str = "year";
pub const LABEL_COLUMN: &str = "label";
pub const AMOUNT_COLUMN: &str = "amount";

/// Build a `(year, label, amount)` frame for one grouping field.
pub fn records_frame(records: &[Record], field: &str) -> Result<DataFrame> {
    let years: Vec<i32> = records.iter().map(|r| r.year).collect();
    let labels: Vec<&str> = records.iter().map(|r| r.label(field)).collect();
    let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();

    let df = DataFrame::new(vec![
        Series::new(YEAR_COLUMN, years),
        Series::new(LABEL_COLUMN, labels),
        Series::new(AMOUNT_COLUMN, amounts),
    ])?;

    Ok(df)
}

/// Sum and count amounts per `(year, label)`, in first-seen order.
pub fn group_sums(df: &DataFrame) -> Result<Vec<GroupAggregate>> {
    let grouped = df
        .clone()
        .lazy()
        .group_by_stable([col(YEAR_COLUMN), col(LABEL_COLUMN)])
        .agg([
            col(AMOUNT_COLUMN).sum().alias("total_amount"),
            len().alias("count"),
        ])
        .collect()?;

    let years = grouped.column(YEAR_COLUMN)?.i32()?;
    let labels = grouped.column(LABEL_COLUMN)?.str()?;
    let totals = grouped.column("total_amount")?.f64()?;
    let counts = grouped.column("count")?.u32()?;

    let mut out = Vec::with_capacity(grouped.height());
    for i in 0..grouped.height() {
        if let (Some(year), Some(label), Some(total), Some(count)) =
            (years.get(i), labels.get(i), totals.get(i), counts.get(i))
        {
            out.push(GroupAggregate {
                group_label: label.to_string(),
                year,
                total_amount: total,
                count: count as usize,
            });
        }
    }

    Ok(out)
}

/// Convenience: project and group in one step.
pub fn group_records(records: &[Record], field: &str) -> Result<Vec<GroupAggregate>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    group_sums(&records_frame(records, field)?)
}
