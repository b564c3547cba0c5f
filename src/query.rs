use crate::error;
use crate::index;
use crate::record;

/// Timestamp format used for interval bounds, e.g. "2023-01-01 12:00".
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Closed time interval `[start, end]`.
///
/// A reversed interval (`start > end`) is empty and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: chrono::NaiveDateTime,
    pub end: chrono::NaiveDateTime,
}

impl Interval {
    pub fn new(start: chrono::NaiveDateTime, end: chrono::NaiveDateTime) -> Self {
        Interval { start, end }
    }

    /// Parses both bounds from `"YYYY-MM-DD HH:MM"` strings.
    pub fn parse(start: &str, end: &str) -> error::Result<Self> {
        Ok(Interval::new(parse_timestamp(start)?, parse_timestamp(end)?))
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, ts: chrono::NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.start.format(TIMESTAMP_FORMAT),
            self.end.format(TIMESTAMP_FORMAT)
        )
    }
}

pub fn parse_timestamp(s: &str) -> error::Result<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| error::Error::InvalidTimestamp(s.to_string()))
}

/// Visits every record whose timestamp lies in `interval`, in bucket key order.
///
/// Subtrees whose keys fall outside the interval's bucket range are skipped;
/// records inside boundary buckets are still checked against their full
/// timestamp, since a quarter may straddle the interval edge.
pub fn fold_records<'a, A>(
    index: &'a index::TimeIndex,
    interval: &Interval,
    seed: A,
    mut combine: impl FnMut(A, &'a record::Record) -> A,
) -> A {
    if interval.is_empty() {
        return seed;
    }
    let lo = index::BucketKey::of(interval.start);
    let hi = index::BucketKey::of(interval.end);
    let mut acc = seed;

    for (&y, year) in index.years().range(lo.year..=hi.year) {
        let first_year = y == lo.year;
        let last_year = y == hi.year;
        let m_lo = if first_year { lo.month } else { 1 };
        let m_hi = if last_year { hi.month } else { 12 };

        for (&m, month) in year.months.range(m_lo..=m_hi) {
            let first_month = first_year && m == lo.month;
            let last_month = last_year && m == hi.month;
            let d_lo = if first_month { lo.day } else { 1 };
            let d_hi = if last_month { hi.day } else { 31 };

            for (&d, day) in month.days.range(d_lo..=d_hi) {
                let q_lo = if first_month && d == lo.day { lo.quarter } else { index::DayQuarter::Night };
                let q_hi = if last_month && d == hi.day { hi.quarter } else { index::DayQuarter::Evening };

                for (_, quarter) in day.quarters.range(q_lo..=q_hi) {
                    for r in &quarter.records {
                        if interval.contains(r.timestamp()) {
                            acc = combine(acc, r);
                        }
                    }
                }
            }
        }
    }
    acc
}

/// Folds the selected channel's values over all records in `interval`.
pub fn range_fold<A>(
    index: &index::TimeIndex,
    interval: &Interval,
    channel: record::Channel,
    seed: A,
    mut combine: impl FnMut(A, f64) -> A,
) -> A {
    fold_records(index, interval, seed, |acc, r| combine(acc, r.value(channel)))
}

/// Sum of `channel` over `interval`; 0 when nothing matches.
pub fn calculate_sum(index: &index::TimeIndex, interval: &Interval, channel: record::Channel) -> f64 {
    range_fold(index, interval, channel, 0.0, |acc, v| acc + v)
}

pub fn match_count(index: &index::TimeIndex, interval: &Interval) -> usize {
    fold_records(index, interval, 0usize, |n, _| n + 1)
}

/// Mean of `channel` over `interval`.
///
/// Returns `None` when no record matches, since the mean of nothing is undefined.
pub fn calculate_average(
    index: &index::TimeIndex,
    interval: &Interval,
    channel: record::Channel,
) -> Option<f64> {
    let (sum, count) = range_fold(index, interval, channel, (0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// `sum(second) - sum(first)` for `channel`.
///
/// A positive result means the second range carried more energy.
pub fn compare_ranges(
    index: &index::TimeIndex,
    first: &Interval,
    second: &Interval,
    channel: record::Channel,
) -> f64 {
    calculate_sum(index, second, channel) - calculate_sum(index, first, channel)
}

/// Records in `interval` whose `channel` value lies within `value ± tolerance`,
/// sorted by timestamp (ties keep structural order).
pub fn search_records<'a>(
    index: &'a index::TimeIndex,
    value: f64,
    tolerance: f64,
    interval: &Interval,
    channel: record::Channel,
) -> Vec<&'a record::Record> {
    let lower = value - tolerance;
    let upper = value + tolerance;
    let mut found = fold_records(index, interval, Vec::new(), |mut acc, r| {
        let v = r.value(channel);
        if lower <= v && v <= upper {
            acc.push(r);
        }
        acc
    });
    found.sort_by_key(|r| r.timestamp());
    found
}

/// Per-channel sums over `interval`.
pub fn calculate_sums(index: &index::TimeIndex, interval: &Interval) -> record::ChannelValues {
    fold_records(index, interval, record::ChannelValues::default(), |acc, r| acc + r.values())
}

/// Per-channel means over `interval`; `None` when nothing matches.
pub fn calculate_averages(index: &index::TimeIndex, interval: &Interval) -> Option<record::ChannelValues> {
    let (sums, count) = fold_records(
        index,
        interval,
        (record::ChannelValues::default(), 0usize),
        |(acc, n), r| (acc + r.values(), n + 1),
    );
    if count == 0 {
        return None;
    }
    Some(record::ChannelValues::from_fn(|c| sums.get(c) / count as f64))
}

/// Per-channel `sum(second) - sum(first)`.
pub fn compare_all(index: &index::TimeIndex, first: &Interval, second: &Interval) -> record::ChannelValues {
    let a = calculate_sums(index, first);
    let b = calculate_sums(index, second);
    b.zip_with(&a, |x, y| x - y)
}
