use std::fs;
use yoy_report::analysis::AnalysisRun;
use yoy_report::narrative;
use yoy_report::{GrowthStatus, RecordLoader, ReportConfig, ReportError, SortKey, YearScope};

const Y1_CSV: &str = "\
业绩平台,城市,一级业态,行业,客户,业绩金额
平台甲,A,写字楼物业,科技,客户1,60
平台甲,A,写字楼物业,科技,客户1,40
平台乙,B,商业物业,零售,客户2,50
平台乙,B,商业物业,零售,客户2,50
平台乙,D,商业物业,零售,客户3,待定
,,,,,
";

const Y2_CSV: &str = "\
业绩平台,城市,一级业态,行业,客户,业绩金额
平台甲,A,写字楼物业,科技,客户1,120
平台丙,C,产业园物业,制造,客户4,30
平台丙,C,产业园物业,制造,客户4,
";

fn scenario_run() -> AnalysisRun {
    AnalysisRun::from_bytes(ReportConfig::default(), Y1_CSV.as_bytes(), Y2_CSV.as_bytes()).unwrap()
}

#[test]
fn test_example_scenario() {
    let run = scenario_run();

    let totals = run.totals("城市").unwrap();
    assert_eq!(totals.totals_y1["A"], 100.0);
    assert_eq!(totals.totals_y1["B"], 50.0);
    assert_eq!(totals.totals_y1["C"], 0.0);
    assert_eq!(totals.totals_y2["A"], 120.0);
    assert_eq!(totals.totals_y2["B"], 0.0);
    assert_eq!(totals.totals_y2["C"], 30.0);

    let records = run.growth_records("城市", SortKey::LabelAsc).unwrap();
    let a = &records[0];
    assert_eq!(a.group_label, "A");
    assert_eq!(a.abs_growth, 20.0);
    assert!((a.pct_growth - 20.0).abs() < 1e-9);
    assert_eq!(a.status, GrowthStatus::SteadyGrowth);

    let b = &records[1];
    assert_eq!(b.abs_growth, -50.0);
    assert_eq!(b.pct_growth, -100.0);
    assert_eq!(b.status, GrowthStatus::Exited);

    let c = &records[2];
    assert_eq!(c.abs_growth, 30.0);
    assert_eq!(c.pct_growth, 0.0);
    assert_eq!(c.status, GrowthStatus::Emerging);
}

#[test]
fn test_load_stats_recorded() {
    let run = scenario_run();
    let stats = run.load_stats();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].kept, 3);
    assert_eq!(stats[0].dropped_duplicate, 1);
    assert_eq!(stats[0].dropped_amount, 1);
    assert_eq!(stats[0].dropped_empty, 1);
    assert_eq!(stats[1].kept, 2);
    assert_eq!(run.overview().count_total, 5);
}

#[test]
fn test_full_report_json_and_text() {
    let run = scenario_run();
    let report = run.full_report().unwrap();
    assert_eq!(report.dimensions.len(), 4);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["overview"]["total_y1"], 150.0);
    assert_eq!(json["dimensions"][1]["field"], "城市");
    assert!(json["dimensions"][1]["records"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["status"] == "emerging"));

    let text = narrative::render_full(&report);
    assert!(text.contains("== 城市 =="));
    assert!(text.contains("Exited: B"));
    assert!(text.contains("科技-客户1"));
}

#[test]
fn test_gbk_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2024.csv");
    let (encoded, _, _) = encoding_rs::GBK.encode(Y1_CSV);
    fs::write(&path, &encoded).unwrap();

    let loader = RecordLoader::from_config(&ReportConfig::default()).unwrap();
    let loaded = loader.load_path(&path, 2024).unwrap();
    assert_eq!(loaded.stats.encoding, "gbk");
    assert_eq!(loaded.records.len(), 3);
    assert_eq!(loaded.records[2].label("客户"), "客户2");
}

#[test]
fn test_missing_amount_column_aborts_run() {
    let bad = "城市,金额\nA,1\n";
    let result = AnalysisRun::from_bytes(ReportConfig::default(), Y1_CSV.as_bytes(), bad.as_bytes());
    assert!(matches!(result, Err(ReportError::MissingRequiredColumn { .. })));
}

#[test]
fn test_concentration_and_clients() {
    let run = scenario_run();
    let conc = run.concentration("城市", 1).unwrap();
    assert!((conc.years[0].ratio - 100.0 / 150.0 * 100.0).abs() < 1e-9);
    assert_eq!(conc.years[1].top[0].0, "A");

    let ranking = run.top_clients(YearScope::Combined, 2).unwrap();
    assert_eq!(ranking.client_count, 3);
    assert_eq!(ranking.clients[0].display_label(), "科技-客户1");
    assert_eq!(ranking.clients[0].amount, 220.0);
    assert_eq!(ranking.clients[1].client, "客户2");
}

const KEY_Y1_CSV: &str = "\
业绩平台,城市,一级业态,行业,客户,业绩金额
平台甲,北京,写字楼物业,科技,客户1,100
平台甲,北京,写字楼物业,科技,客户1,60
平台甲,北京,商业物业,零售,客户2,50
平台乙,上海,写字楼物业,金融,客户3,80
平台乙,西安,商业物业,零售,客户4,40
";

const KEY_Y2_CSV: &str = "\
业绩平台,城市,一级业态,行业,客户,业绩金额
平台甲,北京,商业物业,零售,客户2,300
平台乙,上海,写字楼物业,金融,客户3,40
平台乙,上海,写字楼物业,金融,客户5,40
平台丙,成都,产业园物业,制造,客户6,90
";

#[test]
fn test_default_key_cities_report() {
    let run = AnalysisRun::from_bytes(ReportConfig::default(), KEY_Y1_CSV.as_bytes(), KEY_Y2_CSV.as_bytes()).unwrap();
    let report = run.full_report().unwrap();

    let focus = &report.key_focus[0];
    assert_eq!(focus.field, "城市");
    assert_eq!(focus.years[0].key_amount, 290.0);
    assert_eq!(focus.years[0].other_amount, 40.0);
    let growth: Vec<&str> = focus.growth.iter().map(|g| g.group_label.as_str()).collect();
    assert_eq!(growth, vec!["北京", "成都", "上海"]);
    assert_eq!(focus.missing.len(), 7);
    assert!(focus.missing.contains(&"苏州".to_string()));

    let breakdown = report.key_breakdown.as_ref().unwrap();
    assert_eq!(breakdown.by_field, "一级业态");
    // Configured key order: 广州 has no records, so 北京 leads
    let beijing = &breakdown.groups[0];
    assert_eq!(beijing.group_label, "北京");
    assert_eq!(beijing.main_y1.as_deref(), Some("写字楼物业"));
    assert_eq!(beijing.main_y2.as_deref(), Some("商业物业"));
    assert_eq!(breakdown.fastest_growing, Some(("北京".to_string(), 90.0)));

    let quality = report.city_quality.as_ref().unwrap();
    let shanghai = quality.groups.iter().find(|g| g.group_label == "上海").unwrap();
    assert_eq!((shanghai.avg_y1, shanghai.avg_y2), (80.0, 40.0));
    assert_eq!(shanghai.change_rate, -50.0);
    assert_eq!(quality.worst[0].group_label, "上海");
    let xian = quality.groups.iter().find(|g| g.group_label == "西安").unwrap();
    assert_eq!(xian.change_rate, -100.0);
    assert_eq!(report.top_clients.client_count, 6);

    let text = narrative::render_full(&report);
    assert!(text.contains("== Key 城市 by 一级业态 =="));
    assert!(text.contains("Fastest growing: 北京"));
    assert!(text.contains("Steepest falls: 上海"));
    assert!(text.contains("(6 served)"));
}

#[test]
fn test_city_split_uses_floor() {
    let run = scenario_run();
    let split = run.growth_split("城市").unwrap();
    assert_eq!(split.threshold, 500.0);
    assert!(split.large.is_empty());
    assert_eq!(split.small.len(), 3);
    assert_eq!(split.new_groups[0].0, "C");
    assert_eq!(split.zeroed_groups[0].0, "B");
}
