//! Plain-text summaries of report views.

use crate::aggregate::{GrowthSplit, ProjectQuality};
use crate::analysis::{
    ConcentrationReport, DimensionReport, FullReport, KeyBreakdown, KeyGroupFocus, YearOverview,
};
use crate::classify::{GrowthRecord, GrowthStatus};
use crate::loader::LoadStats;
use crate::ranking::ClientRanking;
use itertools::Itertools;

/// One-line reading of a status, shown next to each group.
pub fn status_note(status: GrowthStatus) -> &'static str {
    match status {
        GrowthStatus::HighGrowth => "strong growth with a larger share",
        GrowthStatus::SteadyGrowth => "steady growth, position holding",
        GrowthStatus::Emerging => "no amount in the prior year, new this year",
        GrowthStatus::GrowthWithoutRate => {
            "share rose without a measured rate; other groups likely shrank"
        }
        GrowthStatus::GrowthShareLagging => "grew, but slower than the market",
        GrowthStatus::Anomalous => "fell while its share rose; check the data",
        GrowthStatus::DualDecline => "amount and share both fell",
        GrowthStatus::Exited => "amount dropped to zero",
        GrowthStatus::Unchanged => "no change in amount",
    }
}

/// Rate column text. Emerging groups have no meaningful rate.
pub fn rate_text(record: &GrowthRecord) -> String {
    match record.status {
        GrowthStatus::Emerging => "new".to_string(),
        GrowthStatus::HighGrowth
        | GrowthStatus::SteadyGrowth
        | GrowthStatus::GrowthWithoutRate
        | GrowthStatus::GrowthShareLagging
        | GrowthStatus::Anomalous
        | GrowthStatus::DualDecline
        | GrowthStatus::Exited
        | GrowthStatus::Unchanged => format!("{:.1}%", record.pct_growth),
    }
}

pub fn render_overview(o: &YearOverview) -> String {
    let direction = if o.abs_growth > 0.0 {
        "up"
    } else if o.abs_growth < 0.0 {
        "down"
    } else {
        "flat"
    };
    // A rate needs a positive year-1 base
    let change = if o.total_y1 > 0.0 {
        format!("{} {:.1}%", direction, o.growth_rate.abs())
    } else {
        format!("{} (no prior-year base)", direction)
    };
    [
        "== Overview ==".to_string(),
        format!("{} total: {:.0} (10k), {} records", o.year1, o.total_y1, o.count_y1),
        format!("{} total: {:.0} (10k), {} records", o.year2, o.total_y2, o.count_y2),
        format!(
            "Growth: {}, difference {:.0}; average per record {:.1} -> {:.1}",
            change,
            o.abs_growth.abs(),
            o.avg_y1,
            o.avg_y2
        ),
    ]
    .join("\n")
}

pub fn render_load_stats(stats: &[LoadStats]) -> String {
    stats
        .iter()
        .map(|s| {
            format!(
                "decoded as {}: {} rows read, {} kept ({} blank, {} bad amount, {} duplicate)",
                s.encoding, s.rows_read, s.kept, s.dropped_empty, s.dropped_amount, s.dropped_duplicate
            )
        })
        .join("\n")
}

pub fn render_dimension(report: &DimensionReport) -> String {
    let mut lines = vec![format!("== {} ==", report.field)];

    lines.extend(report.records.iter().map(|r| {
        format!(
            "  {:<16} {:>10.0} -> {:>10.0}  {:>+10.0}  {:>8}  share {:+.1}pt  [{}] {}",
            r.group_label,
            r.value_y1,
            r.value_y2,
            r.abs_growth,
            rate_text(r),
            r.share_delta,
            r.status,
            status_note(r.status)
        )
    }));

    lines.push(format!(
        "Total growth {:.0}; {}/{} growing, {} declining ({:.1}% growing)",
        report.total_growth,
        report.growing,
        report.records.len(),
        report.declining,
        report.growing_ratio
    ));
    if let Some(top) = &report.largest_contributor {
        lines.push(format!(
            "Largest contributor: {} ({:+.0}, {:.1}% of total growth)",
            top.group_label, top.abs_growth, top.share_of_growth
        ));
    }
    lines.push(format!(
        "Top {} contribute {:.1}% of growth",
        report.contribution_k, report.top_contribution
    ));
    if !report.strong.is_empty() {
        lines.push(format!("Performing well: {}", report.strong.join(", ")));
    }
    if !report.attention.is_empty() {
        lines.push(format!(
            "Needs attention ({}): {}",
            report.attention.len(),
            report.attention.join(", ")
        ));
    }
    if !report.exited.is_empty() {
        lines.push(format!("Exited: {}", report.exited.join(", ")));
    }
    lines.join("\n")
}

pub fn render_split(split: &GrowthSplit) -> String {
    let list = |entries: &[(String, f64)]| {
        entries
            .iter()
            .map(|(label, g)| format!("{} {:+.0}", label, g))
            .join(", ")
    };
    [
        format!("== {} growth split (threshold {:.0}) ==", split.field, split.threshold),
        format!("Large: {}", list(&split.large)),
        format!("Small: {}", list(&split.small)),
        format!("New: {}", list(&split.new_groups)),
        format!("Zeroed: {}", list(&split.zeroed_groups)),
    ]
    .join("\n")
}

pub fn render_concentration(report: &ConcentrationReport) -> String {
    let mut lines = vec![format!("== {} concentration (top {}) ==", report.field, report.k)];
    lines.extend(report.years.iter().map(|y| {
        format!(
            "{}: {:.1}% [{}]",
            y.year,
            y.ratio,
            y.top.iter().map(|(label, _)| label.as_str()).join(", ")
        )
    }));
    lines.join("\n")
}

pub fn render_quality(quality: &ProjectQuality) -> String {
    let mut lines = vec![format!("== {} average per record ==", quality.field)];
    lines.extend(quality.groups.iter().map(|g| {
        let change = if g.absent_y2() {
            "no records".to_string()
        } else {
            format!("{:+.1}%", g.change_rate)
        };
        format!(
            "  {:<16} {:>8.1} ({}) -> {:>8.1} ({})  {}",
            g.group_label, g.avg_y1, g.count_y1, g.avg_y2, g.count_y2, change
        )
    }));
    if !quality.worst.is_empty() {
        lines.push(format!(
            "Steepest falls: {}",
            quality
                .worst
                .iter()
                .map(|g| format!("{} {:.1}%", g.group_label, g.change_rate))
                .join(", ")
        ));
    }
    lines.join("\n")
}

pub fn render_clients(ranking: &ClientRanking) -> String {
    let mut lines = vec![format!("== Top clients ({} served) ==", ranking.client_count)];
    lines.extend(
        ranking
            .clients
            .iter()
            .map(|c| format!("{:>3}. {:<30} {:>10.0}", c.rank, c.display_label(), c.amount)),
    );
    lines.join("\n")
}

pub fn render_key_focus(focus: &KeyGroupFocus) -> String {
    let mut lines = vec![format!("== Key {} ({}) ==", focus.field, focus.keys.join(", "))];
    lines.extend(focus.years.iter().map(|y| {
        format!(
            "{}: key {:.0} / other {:.0} ({:.1}% key)",
            y.year, y.key_amount, y.other_amount, y.key_share
        )
    }));
    lines.extend(
        focus
            .growth
            .iter()
            .map(|g| format!("  {:<16} {:>+10.0}", g.group_label, g.abs_growth)),
    );
    if !focus.growth.is_empty() {
        lines.push(format!("Average growth {:+.1}", focus.average_growth));
    }
    if !focus.missing.is_empty() {
        lines.push(format!("No records: {}", focus.missing.join(", ")));
    }
    lines.join("\n")
}

pub fn render_key_breakdown(breakdown: &KeyBreakdown) -> String {
    let main = |label: &Option<String>| label.as_deref().unwrap_or("-").to_string();
    let mut lines = vec![format!("== Key {} by {} ==", breakdown.field, breakdown.by_field)];
    lines.extend(breakdown.groups.iter().map(|g| {
        format!(
            "  {:<16} {:>10.0} [{}] -> {:>10.0} [{}]  {:+.1}%",
            g.group_label,
            g.total_y1,
            main(&g.main_y1),
            g.total_y2,
            main(&g.main_y2),
            g.growth_rate
        )
    }));
    if let Some((label, growth)) = &breakdown.fastest_growing {
        lines.push(format!("Fastest growing: {} ({:+.0})", label, growth));
    }
    lines.join("\n")
}

pub fn render_full(report: &FullReport) -> String {
    let mut sections = vec![render_overview(&report.overview)];
    if !report.load_stats.is_empty() {
        sections.push(render_load_stats(&report.load_stats));
    }
    sections.extend(report.dimensions.iter().map(render_dimension));
    if let Some(split) = &report.city_split {
        sections.push(render_split(split));
    }
    if let Some(c) = &report.city_concentration {
        sections.push(render_concentration(c));
    }
    if let Some(q) = &report.city_quality {
        sections.push(render_quality(q));
    }
    if !report.top_clients.clients.is_empty() {
        sections.push(render_clients(&report.top_clients));
    }
    sections.extend(report.key_focus.iter().map(render_key_focus));
    if let Some(b) = &report.key_breakdown {
        sections.push(render_key_breakdown(b));
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GroupQuality;
    use crate::analysis::KeyGrowth;
    use crate::classify::GrowthClassifier;
    use crate::ranking::ClientRank;

    #[test]
    fn test_every_status_has_a_note() {
        for status in GrowthStatus::ALL {
            assert!(!status_note(status).is_empty());
        }
    }

    #[test]
    fn test_rate_text() {
        let c = GrowthClassifier::default();
        assert_eq!(rate_text(&c.classify("a", 0.0, 10.0, 0.0, 5.0)), "new");
        assert_eq!(rate_text(&c.classify("b", 100.0, 90.0, 10.0, 5.0)), "-10.0%");
    }

    fn overview(total_y1: f64, total_y2: f64) -> YearOverview {
        YearOverview {
            year1: 2024,
            year2: 2025,
            total_y1,
            total_y2,
            abs_growth: total_y2 - total_y1,
            growth_rate: if total_y1 > 0.0 {
                (total_y2 - total_y1) / total_y1 * 100.0
            } else {
                0.0
            },
            count_y1: 4,
            count_y2: 2,
            count_total: 6,
            avg_y1: total_y1 / 4.0,
            avg_y2: total_y2 / 2.0,
        }
    }

    #[test]
    fn test_render_overview() {
        let text = render_overview(&overview(100.0, 80.0));
        assert!(text.contains("Growth: down 20.0%, difference 20"));
        assert!(text.contains("2025 total: 80 (10k), 2 records"));
    }

    #[test]
    fn test_render_overview_direction() {
        let up = render_overview(&overview(100.0, 150.0));
        assert!(up.contains("Growth: up 50.0%, difference 50"));

        let from_zero = render_overview(&overview(0.0, 80.0));
        assert!(!from_zero.contains("down"), "growth from zero read as decline: {}", from_zero);
        assert!(from_zero.contains("Growth: up (no prior-year base), difference 80"));

        let flat = render_overview(&overview(60.0, 60.0));
        assert!(flat.contains("Growth: flat 0.0%, difference 0"));
        assert!(!flat.contains("down"));
    }

    #[test]
    fn test_render_quality() {
        let group = |label: &str, count_y2: usize, change_rate: f64| GroupQuality {
            group_label: label.to_string(),
            total_y1: 100.0,
            count_y1: 2,
            avg_y1: 50.0,
            total_y2: 40.0,
            count_y2,
            avg_y2: if count_y2 == 0 { 0.0 } else { 40.0 / count_y2 as f64 },
            change_rate,
        };
        let quality = ProjectQuality {
            field: "城市".to_string(),
            groups: vec![group("A", 2, -60.0), group("B", 0, -100.0)],
            worst: vec![group("A", 2, -60.0)],
        };
        let text = render_quality(&quality);
        assert!(text.contains("no records"));
        assert!(text.contains("Steepest falls: A -60.0%"));
        assert!(!text.contains("B -100.0%"));
    }

    #[test]
    fn test_render_clients_and_keys() {
        let ranking = ClientRanking {
            client_count: 7,
            clients: vec![ClientRank {
                rank: 1,
                client: "客户1".to_string(),
                industry: "科技".to_string(),
                amount: 220.0,
            }],
        };
        let text = render_clients(&ranking);
        assert!(text.contains("(7 served)"));
        assert!(text.contains("科技-客户1"));

        let focus = KeyGroupFocus {
            field: "城市".to_string(),
            keys: vec!["北京".to_string(), "苏州".to_string()],
            years: vec![],
            growth: vec![KeyGrowth {
                group_label: "北京".to_string(),
                value_y1: 10.0,
                value_y2: 30.0,
                abs_growth: 20.0,
                pct_growth: 200.0,
            }],
            average_growth: 20.0,
            missing: vec!["苏州".to_string()],
        };
        let text = render_key_focus(&focus);
        assert!(text.contains("Average growth +20.0"));
        assert!(text.contains("No records: 苏州"));
    }

    #[test]
    fn test_render_split() {
        let split = GrowthSplit {
            field: "city".to_string(),
            threshold: 500.0,
            large: vec![("A".to_string(), 800.0)],
            small: vec![("B".to_string(), -50.0)],
            new_groups: vec![],
            zeroed_groups: vec![],
        };
        let text = render_split(&split);
        assert!(text.contains("Large: A +800"));
        assert!(text.contains("Small: B -50"));
    }
}
