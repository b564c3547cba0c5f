use crate::record;

use chrono::{Datelike, Timelike};

/// Fixed 6-hour slice of a calendar day.
///
/// Only the hour decides the slice; minutes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayQuarter {
    /// 00:00 - 05:59
    Night,
    /// 06:00 - 11:59
    Morning,
    /// 12:00 - 17:59
    Afternoon,
    /// 18:00 - 23:59
    Evening,
}

impl DayQuarter {
    pub const ALL: [DayQuarter; 4] = [
        DayQuarter::Night,
        DayQuarter::Morning,
        DayQuarter::Afternoon,
        DayQuarter::Evening,
    ];

    pub fn of(time: chrono::NaiveTime) -> Self {
        match time.hour() {
            0..=5 => DayQuarter::Night,
            6..=11 => DayQuarter::Morning,
            12..=17 => DayQuarter::Afternoon,
            _ => DayQuarter::Evening,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Hour at which the slice starts.
    pub fn start_hour(self) -> u32 {
        self.index() as u32 * 6
    }
}

impl std::fmt::Display for DayQuarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let start = self.start_hour();
        write!(f, "Q{} {:02}:00-{:02}:59", self.index(), start, start + 5)
    }
}

/// Quarter index (0..=3) for a time of day.
pub fn get_quarter(time: chrono::NaiveTime) -> u8 {
    DayQuarter::of(time).index()
}

/// Bucket coordinates of a single point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BucketKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub quarter: DayQuarter,
}

impl BucketKey {
    pub fn of(ts: chrono::NaiveDateTime) -> Self {
        BucketKey {
            year: ts.year(),
            month: ts.month(),
            day: ts.day(),
            quarter: DayQuarter::of(ts.time()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quarter {
    /// Records in insertion order.
    pub records: Vec<record::Record>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Day {
    pub quarters: std::collections::BTreeMap<DayQuarter, Quarter>,
}

impl Day {
    pub fn quarter_mut(&mut self, quarter: DayQuarter) -> &mut Quarter {
        self.quarters.entry(quarter).or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Month {
    pub days: std::collections::BTreeMap<u32, Day>,
}

impl Month {
    pub fn day_mut(&mut self, day: u32) -> &mut Day {
        self.days.entry(day).or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Year {
    pub months: std::collections::BTreeMap<u32, Month>,
}

impl Year {
    pub fn month_mut(&mut self, month: u32) -> &mut Month {
        self.months.entry(month).or_default()
    }
}

/// Hierarchical store: year -> month -> day -> quarter of day -> records.
///
/// Intermediate levels are created on demand by `add_record`; a missing key
/// means there is no data for that unit. Nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeIndex {
    years: std::collections::BTreeMap<i32, Year>,
    len: usize,
}

impl TimeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to the bucket derived from its own date and time.
    ///
    /// Example: `2025-01-27 13:45` lands in year 2025, month 1, day 27,
    /// quarter `Afternoon` (12:00-17:59).
    pub fn add_record(&mut self, record: record::Record) {
        let key = BucketKey::of(record.timestamp());
        self.year_mut(key.year)
            .month_mut(key.month)
            .day_mut(key.day)
            .quarter_mut(key.quarter)
            .records
            .push(record);
        self.len += 1;
    }

    pub fn year_mut(&mut self, year: i32) -> &mut Year {
        self.years.entry(year).or_default()
    }

    pub fn years(&self) -> &std::collections::BTreeMap<i32, Year> {
        &self.years
    }

    pub fn quarter(&self, key: BucketKey) -> Option<&Quarter> {
        self.years
            .get(&key.year)?
            .months
            .get(&key.month)?
            .days
            .get(&key.day)?
            .quarters
            .get(&key.quarter)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Walks every bucket in key order, yielding its coordinates and contents.
    pub fn buckets(&self) -> impl Iterator<Item = (BucketKey, &Quarter)> + '_ {
        self.years.iter().flat_map(|(&year, y)| {
            y.months.iter().flat_map(move |(&month, m)| {
                m.days.iter().flat_map(move |(&day, d)| {
                    d.quarters.iter().map(move |(&quarter, q)| {
                        (BucketKey { year, month, day, quarter }, q)
                    })
                })
            })
        })
    }

    /// All records in structural order (bucket key, then insertion order).
    pub fn records(&self) -> impl Iterator<Item = &record::Record> + '_ {
        self.buckets().flat_map(|(_, q)| q.records.iter())
    }
}

impl Extend<record::Record> for TimeIndex {
    fn extend<I: IntoIterator<Item = record::Record>>(&mut self, iter: I) {
        for r in iter {
            self.add_record(r);
        }
    }
}

impl FromIterator<record::Record> for TimeIndex {
    fn from_iter<I: IntoIterator<Item = record::Record>>(iter: I) -> Self {
        let mut index = TimeIndex::new();
        index.extend(iter);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: &str, time: &str, v: f64) -> record::Record {
        record::Record::parse(date, time, [v, v / 2.0, v / 3.0, v + 20.0, v - 20.0]).unwrap()
    }

    fn t(s: &str) -> chrono::NaiveTime {
        record::parse_time(s).unwrap()
    }

    #[test]
    fn quarter_boundaries_follow_six_hour_split() {
        assert_eq!(get_quarter(t("00:00")), 0);
        assert_eq!(get_quarter(t("05:59")), 0);
        assert_eq!(get_quarter(t("06:00")), 1);
        assert_eq!(get_quarter(t("11:59")), 1);
        assert_eq!(get_quarter(t("12:00")), 2);
        assert_eq!(get_quarter(t("17:59")), 2);
        assert_eq!(get_quarter(t("18:00")), 3);
        assert_eq!(get_quarter(t("23:59")), 3);
    }

    // Older revisions mention 05:45 / 11:45 as quarter edges (15-minute alignment).
    // Bucketing is hour-only, so those times stay in the earlier slice.
    #[test]
    fn minutes_do_not_move_quarter_edges() {
        assert_eq!(get_quarter(t("05:45")), 0);
        assert_eq!(get_quarter(t("11:45")), 1);
        assert_eq!(get_quarter(t("13:30")), 2);
    }

    #[test]
    fn add_record_creates_intermediate_levels() {
        let mut index = TimeIndex::new();
        index.add_record(rec("2023-01-01", "12:30", 100.0));
        index.add_record(rec("2023-01-01", "13:30", 110.0));
        index.add_record(rec("2023-01-01", "19:00", 90.0));

        assert_eq!(index.years().len(), 1);
        let year = &index.years()[&2023];
        assert_eq!(year.months.len(), 1);
        let month = &year.months[&1];
        assert_eq!(month.days.len(), 1);
        let day = &month.days[&1];
        assert_eq!(day.quarters.len(), 2);
        assert_eq!(day.quarters[&DayQuarter::Afternoon].records.len(), 2);
        assert_eq!(day.quarters[&DayQuarter::Evening].records.len(), 1);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn quarter_preserves_insertion_order() {
        let mut index = TimeIndex::new();
        index.add_record(rec("2024-03-10", "14:00", 3.0));
        index.add_record(rec("2024-03-10", "12:15", 1.0));
        index.add_record(rec("2024-03-10", "17:59", 2.0));

        let key = BucketKey::of(rec("2024-03-10", "12:00", 0.0).timestamp());
        let values: Vec<f64> = index
            .quarter(key)
            .unwrap()
            .records
            .iter()
            .map(|r| r.self_consumption)
            .collect();
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn each_record_lands_in_exactly_one_bucket() {
        let index: TimeIndex = vec![
            rec("2022-12-31", "23:59", 1.0),
            rec("2023-01-01", "00:00", 2.0),
            rec("2023-01-01", "06:00", 3.0),
        ]
        .into_iter()
        .collect();

        let buckets: Vec<BucketKey> = index.buckets().map(|(k, _)| k).collect();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].year, 2022);
        assert_eq!(buckets[0].quarter, DayQuarter::Evening);
        assert_eq!(buckets[1].quarter, DayQuarter::Night);
        assert_eq!(buckets[2].quarter, DayQuarter::Morning);
        assert_eq!(index.records().count(), 3);
    }

    #[test]
    fn reinsertion_in_any_order_rebuilds_same_structure() {
        let records = vec![
            rec("2023-05-02", "08:00", 1.0),
            rec("2023-05-01", "20:00", 2.0),
            rec("2021-01-01", "01:00", 3.0),
            rec("2023-05-02", "09:00", 4.0),
        ];
        let original: TimeIndex = records.iter().cloned().collect();
        let rebuilt: TimeIndex = original.records().cloned().collect();
        assert_eq!(original, rebuilt);

        let mut reversed = records.clone();
        reversed.reverse();
        let shuffled: TimeIndex = reversed.into_iter().collect();
        assert_eq!(
            original.buckets().map(|(k, q)| (k, q.records.len())).collect::<Vec<_>>(),
            shuffled.buckets().map(|(k, q)| (k, q.records.len())).collect::<Vec<_>>(),
        );
    }
}
