use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    #[default]
    Day,
    Month,
}

impl Bucket {
    /// Bucket key in the clinic's local time: `2024-03-05` or `2024-03`.
    pub fn key(self, at: DateTime<Utc>, offset: FixedOffset) -> String {
        let local = at.with_timezone(&offset);
        match self {
            Bucket::Day => local.format("%Y-%m-%d").to_string(),
            Bucket::Month => format!("{:04}-{:02}", local.year(), local.month()),
        }
    }

    /// Every key between `from` and `to` inclusive, so charts get zero rows.
    pub fn keys_between(self, from: NaiveDate, to: NaiveDate) -> Vec<String> {
        let mut keys = Vec::new();
        if from > to {
            return keys;
        }
        match self {
            Bucket::Day => {
                for day in from.iter_days().take_while(|d| *d <= to) {
                    keys.push(day.format("%Y-%m-%d").to_string());
                }
            }
            Bucket::Month => {
                let (mut y, mut m) = (from.year(), from.month());
                while (y, m) <= (to.year(), to.month()) {
                    keys.push(format!("{y:04}-{m:02}"));
                    if m == 12 {
                        y += 1;
                        m = 1;
                    } else {
                        m += 1;
                    }
                }
            }
        }
        keys
    }
}

/// Number of events per bucket key.
pub fn count_by_bucket(
    events: &[DateTime<Utc>],
    bucket: Bucket,
    offset: FixedOffset,
) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for at in events {
        *counts.entry(bucket.key(*at, offset)).or_insert(0) += 1;
    }
    counts
}

/// Sum of amounts per bucket key.
pub fn sum_by_bucket(
    events: &[(DateTime<Utc>, i64)],
    bucket: Bucket,
    offset: FixedOffset,
) -> BTreeMap<String, i64> {
    let mut sums = BTreeMap::new();
    for (at, amount) in events {
        *sums.entry(bucket.key(*at, offset)).or_insert(0) += amount;
    }
    sums
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardRow {
    pub bucket: String,
    pub new_patients: i64,
    pub treatment_notes: i64,
    pub documents_issued: i64,
    pub revenue_satang: i64,
}

#[derive(Debug, Default)]
pub struct DashboardInput {
    pub patients_created: Vec<DateTime<Utc>>,
    pub notes_created: Vec<DateTime<Utc>>,
    pub documents_issued: Vec<DateTime<Utc>>,
    pub receipts: Vec<(DateTime<Utc>, i64)>,
}

/// Builds one row per bucket in `[from, to]`, filling gaps with zeros.
pub fn build_dashboard(
    input: &DashboardInput,
    bucket: Bucket,
    offset: FixedOffset,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DashboardRow> {
    let patients = count_by_bucket(&input.patients_created, bucket, offset);
    let notes = count_by_bucket(&input.notes_created, bucket, offset);
    let documents = count_by_bucket(&input.documents_issued, bucket, offset);
    let revenue = sum_by_bucket(&input.receipts, bucket, offset);

    let get = |m: &BTreeMap<String, i64>, k: &str| m.get(k).copied().unwrap_or(0);

    bucket
        .keys_between(from, to)
        .into_iter()
        .map(|key| DashboardRow {
            new_patients: get(&patients, &key),
            treatment_notes: get(&notes, &key),
            documents_issued: get(&documents, &key),
            revenue_satang: get(&revenue, &key),
            bucket: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bangkok() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn keys_use_local_offset() {
        // 18:00 UTC is already the next day in Bangkok.
        let at = utc(2024, 3, 5, 18);
        assert_eq!(Bucket::Day.key(at, bangkok()), "2024-03-06");
        assert_eq!(Bucket::Month.key(utc(2024, 1, 31, 20), bangkok()), "2024-02");
    }

    #[test]
    fn counts_group_by_key() {
        let events = vec![utc(2024, 3, 5, 1), utc(2024, 3, 5, 2), utc(2024, 3, 6, 1)];
        let counts = count_by_bucket(&events, Bucket::Day, bangkok());
        assert_eq!(counts.get("2024-03-05"), Some(&2));
        assert_eq!(counts.get("2024-03-06"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn month_keys_cross_year_boundary() {
        let keys = Bucket::Month.keys_between(date(2023, 11, 15), date(2024, 2, 1));
        assert_eq!(keys, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert!(Bucket::Day.keys_between(date(2024, 2, 1), date(2024, 1, 1)).is_empty());
    }

    #[test]
    fn dashboard_fills_gaps_with_zero() {
        let input = DashboardInput {
            patients_created: vec![utc(2024, 3, 1, 3)],
            notes_created: vec![utc(2024, 3, 3, 3), utc(2024, 3, 3, 4)],
            documents_issued: vec![utc(2024, 3, 3, 5)],
            receipts: vec![(utc(2024, 3, 3, 5), 15_050), (utc(2024, 3, 3, 6), 1_000)],
        };
        let rows = build_dashboard(&input, Bucket::Day, bangkok(), date(2024, 3, 1), date(2024, 3, 3));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].new_patients, 1);
        assert_eq!(rows[1], DashboardRow {
            bucket: "2024-03-02".into(),
            new_patients: 0,
            treatment_notes: 0,
            documents_issued: 0,
            revenue_satang: 0,
        });
        assert_eq!(rows[2].treatment_notes, 2);
        assert_eq!(rows[2].revenue_satang, 16_050);
    }
}
