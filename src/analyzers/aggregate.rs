use crate::analyzers::types::{ClassifiedRecord, GroupKey, IndicatorSums};
use std::collections::BTreeMap;

/// Running totals for one group.
///
/// Weights are buffered and summed in sorted order on finish, so the float
/// totals do not depend on input order.
#[derive(Debug, Default)]
struct Accumulator {
    num: u64,
    den: u64,
    actual: Vec<f64>,
    potential: Vec<f64>,
}

impl Accumulator {
    fn push(&mut self, record: &ClassifiedRecord) {
        self.num += u64::from(record.num);
        self.den += u64::from(record.den);
        self.actual.push(record.actual_weight);
        self.potential.push(record.potential_weight);
    }

    fn finish(self) -> IndicatorSums {
        IndicatorSums {
            num: self.num,
            den: self.den,
            actual_weight: ordered_sum(self.actual),
            potential_weight: ordered_sum(self.potential),
        }
    }
}

fn ordered_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().sum()
}

/// Builds the grouping key of a classified record.
///
/// The plant takes part in the key whenever the record carries one, so
/// multi-plant batches never merge entities across plants.
pub fn group_key(record: &ClassifiedRecord) -> GroupKey {
    GroupKey {
        date: record.date,
        ids: record.ids.clone(),
        plant: record.plant.clone(),
    }
}

/// Sums the indicators of `records` per (date, identifiers, plant).
///
/// Output is ordered by key: date first, then identifiers, then plant.
pub fn aggregate_daily(records: &[ClassifiedRecord]) -> Vec<(GroupKey, IndicatorSums)> {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();

    for record in records {
        groups.entry(group_key(record)).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(key, acc)| (key, acc.finish()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(
        day: u32,
        hour: u32,
        ids: &[&str],
        plant: Option<&str>,
        den: u8,
        num: u8,
        g: f64,
    ) -> ClassifiedRecord {
        let date = NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        ClassifiedRecord {
            plant: plant.map(str::to_string),
            timestamp: date.and_hms_opt(hour, 0, 0).unwrap(),
            date,
            ids: ids.iter().map(|s| s.to_string()).collect(),
            power: Some(if num == 1 { 10.0 } else { 0.0 }),
            irradiance: Some(g),
            num,
            den,
            actual_weight: if num == 1 { g } else { 0.0 },
            potential_weight: if den == 1 { g } else { 0.0 },
        }
    }

    #[test]
    fn test_aggregate_sums_per_day_and_entity() {
        let records = vec![
            record(1, 9, &["sn1"], Some("P"), 1, 1, 0.3),
            record(1, 10, &["sn1"], Some("P"), 1, 0, 0.5),
            record(1, 11, &["sn2"], Some("P"), 1, 1, 0.7),
            record(2, 9, &["sn1"], Some("P"), 0, 0, 0.01),
        ];

        let daily = aggregate_daily(&records);

        assert_eq!(daily.len(), 3);
        let (key, sums) = &daily[0];
        assert_eq!(key.date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(key.ids, vec!["sn1"]);
        assert_eq!((sums.num, sums.den), (1, 2));
        assert!((sums.actual_weight - 0.3).abs() < 1e-12);
        assert!((sums.potential_weight - 0.8).abs() < 1e-12);

        assert_eq!(daily[1].0.ids, vec!["sn2"]);
        assert_eq!(daily[2].1.den, 0);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let mut records: Vec<ClassifiedRecord> = (0..24)
            .map(|h| {
                let num = u8::from(h % 3 != 0);
                record(1 + h % 2, h, &["sn1", "MPPT1"], Some("P"), 1, num, 0.1 + h as f64 * 0.037)
            })
            .collect();

        let forward = aggregate_daily(&records);
        records.reverse();
        let reversed = aggregate_daily(&records);
        records.rotate_left(7);
        let rotated = aggregate_daily(&records);

        assert_eq!(forward, reversed);
        assert_eq!(forward, rotated);
    }

    #[test]
    fn test_plants_are_kept_apart() {
        let records = vec![
            record(1, 9, &["sn1"], Some("Alpha"), 1, 1, 0.3),
            record(1, 9, &["sn1"], Some("Beta"), 1, 0, 0.3),
        ];

        let daily = aggregate_daily(&records);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].0.plant.as_deref(), Some("Alpha"));
        assert_eq!(daily[0].1.num, 1);
        assert_eq!(daily[1].0.plant.as_deref(), Some("Beta"));
        assert_eq!(daily[1].1.num, 0);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_daily(&[]).is_empty());
    }
}
