pub mod aggregate;
pub mod analysis;
pub mod classify;
pub mod config;
pub mod error;
pub mod frame;
pub mod loader;
pub mod narrative;
pub mod ranking;
pub mod record;

pub use aggregate::{
    aggregate, DimensionTotals, GroupAggregate, GroupTotals, GrowthSplit, ProjectQuality, SortKey,
};
pub use analysis::{
    AnalysisRun, DimensionReport, FullReport, KeyBreakdown, KeyGroupFocus, YearOverview, YearScope,
};
pub use classify::{classify_status, pct_growth, GrowthClassifier, GrowthRecord, GrowthStatus};
pub use config::ReportConfig;
pub use error::{ReportError, Result};
pub use loader::{LoadStats, RecordLoader};
pub use ranking::{concentration, top_n, ClientRank, ClientRanking};
pub use record::{Record, Year};
