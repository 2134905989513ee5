//! Concentration & Ranking Utilities

use crate::classify::GrowthRecord;
use crate::record::Record;
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;

pub const UNKNOWN_INDUSTRY: &str = "未知行业";

/// Top `n` entries by amount, descending. Equal amounts keep the input's
/// iteration order.
pub fn top_n<'a, I>(totals: I, n: usize) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
{
    totals
        .into_iter()
        .map(|(label, amount)| (label.clone(), *amount))
        .sorted_by(|a, b| b.1.total_cmp(&a.1))
        .take(n)
        .collect()
}

/// Share of the grand total held by the top `n` groups, as a percentage.
/// 0 when the grand total is 0.
pub fn concentration<'a, I>(totals: I, n: usize) -> f64
where
    I: IntoIterator<Item = (&'a String, &'a f64)>,
{
    let entries: Vec<(&String, &f64)> = totals.into_iter().collect();
    let total: f64 = entries.iter().map(|(_, v)| **v).sum();
    if total == 0.0 {
        return 0.0;
    }
    let top: f64 = top_n(entries, n).iter().map(|(_, v)| v).sum();
    top / total * 100.0
}

/// Share of the total growth produced by the first `k` records, which are
/// expected in descending `abs_growth` order. 0 unless total growth is
/// positive.
pub fn growth_contribution(records: &[GrowthRecord], k: usize) -> f64 {
    let total_growth: f64 = records.iter().map(|r| r.abs_growth).sum();
    if total_growth <= 0.0 {
        return 0.0;
    }
    let top: f64 = records.iter().take(k).map(|r| r.abs_growth).sum();
    top / total_growth * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRank {
    pub rank: usize,
    pub client: String,
    pub industry: String,
    pub amount: f64,
}

impl ClientRank {
    /// `industry-client`, the label the report shows.
    pub fn display_label(&self) -> String {
        format!("{}-{}", self.industry, self.client)
    }
}

/// Top clients of a scope plus how many distinct clients it served.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientRanking {
    /// Distinct non-blank client labels in the scope.
    pub client_count: usize,
    pub clients: Vec<ClientRank>,
}

impl ClientRanking {
    pub fn leader(&self) -> Option<&ClientRank> {
        self.clients.first()
    }
}

/// Distinct non-blank values of `client_field`.
pub fn distinct_clients<'a, I>(records: I, client_field: &str) -> usize
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .map(|r| r.label(client_field))
        .filter(|c| !c.trim().is_empty())
        .unique()
        .count()
}

/// First industry seen for each client. Blank industries are skipped.
pub fn client_industries<'a, I>(records: I, client_field: &str, industry_field: &str) -> HashMap<String, String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut map = HashMap::new();
    for record in records {
        let industry = record.label(industry_field);
        if industry.trim().is_empty() {
            continue;
        }
        map.entry(record.label(client_field).to_string())
            .or_insert_with(|| industry.to_string());
    }
    map
}

/// Attach ranks and industries to client totals.
pub fn rank_clients(
    client_totals: &[(String, f64)],
    industries: &HashMap<String, String>,
) -> Vec<ClientRank> {
    client_totals
        .iter()
        .enumerate()
        .map(|(idx, (client, amount))| ClientRank {
            rank: idx + 1,
            client: client.clone(),
            industry: industries
                .get(client)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_INDUSTRY.to_string()),
            amount: *amount,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::GrowthClassifier;
    use std::collections::BTreeMap;

    fn totals(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_top_n_descending_with_stable_ties() {
        let t = totals(&[("a", 5.0), ("b", 9.0), ("c", 5.0), ("d", 1.0)]);
        let top = top_n(&t, 3);
        assert_eq!(
            top,
            vec![("b".to_string(), 9.0), ("a".to_string(), 5.0), ("c".to_string(), 5.0)]
        );
        assert_eq!(top_n(&t, 10).len(), 4);
        assert!(top_n(&t, 0).is_empty());
    }

    #[test]
    fn test_concentration() {
        let t = totals(&[("a", 50.0), ("b", 30.0), ("c", 20.0)]);
        assert_eq!(concentration(&t, 1), 50.0);
        assert_eq!(concentration(&t, 2), 80.0);
        assert_eq!(concentration(&t, 3), 100.0);
        assert_eq!(concentration(&totals(&[("a", 0.0)]), 1), 0.0);
        assert_eq!(concentration(&BTreeMap::new(), 3), 0.0);
    }

    #[test]
    fn test_growth_contribution() {
        let c = GrowthClassifier::default();
        let records = vec![
            c.classify("a", 0.0, 60.0, 0.0, 60.0),
            c.classify("b", 10.0, 40.0, 10.0, 40.0),
            c.classify("c", 10.0, 0.0, 10.0, 0.0),
        ];
        // total growth 60 + 30 - 10 = 80
        assert_eq!(growth_contribution(&records, 1), 75.0);
        assert_eq!(growth_contribution(&records[2..], 1), 0.0);
    }

    #[test]
    fn test_client_ranking() {
        let mk = |client: &str, industry: &str| {
            let mut keys = HashMap::new();
            keys.insert("client".to_string(), client.to_string());
            keys.insert("industry".to_string(), industry.to_string());
            Record::new(2024, keys, 1.0)
        };
        let records = vec![mk("X", ""), mk("X", "Tech"), mk("X", "Retail"), mk("Y", "Energy")];
        let industries = client_industries(&records, "client", "industry");
        assert_eq!(industries["X"], "Tech");

        let ranked = rank_clients(
            &[("Y".to_string(), 9.0), ("Z".to_string(), 2.0)],
            &industries,
        );
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].display_label(), "Energy-Y");
        assert_eq!(ranked[1].industry, UNKNOWN_INDUSTRY);
    }

    #[test]
    fn test_distinct_clients() {
        let mk = |client: &str| {
            let mut keys = HashMap::new();
            keys.insert("client".to_string(), client.to_string());
            Record::new(2024, keys, 1.0)
        };
        let records = vec![mk("X"), mk("Y"), mk("X"), mk(" "), mk("")];
        assert_eq!(distinct_clients(&records, "client"), 2);
        assert_eq!(distinct_clients(&records, "other"), 0);
        assert_eq!(distinct_clients(&Vec::<Record>::new(), "client"), 0);
    }
}
