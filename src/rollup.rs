use crate::index;
use crate::query;
use crate::record;

/// Bucket size for a rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Quarter,
}

impl std::str::FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" | "1d" => Ok(Granularity::Day),
            "quarter" | "6h" => Ok(Granularity::Quarter),
            other => Err(anyhow::anyhow!("Unknown granularity '{}', expected 'day' or 'quarter'", other)),
        }
    }
}

/// Aggregated view of one channel inside a single day or quarter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollupBar {
    pub date: chrono::NaiveDate,
    /// `None` for day-granularity bars.
    pub quarter: Option<index::DayQuarter>,
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl RollupBar {
    fn open(date: chrono::NaiveDate, quarter: Option<index::DayQuarter>, value: f64) -> Self {
        RollupBar {
            date,
            quarter,
            count: 1,
            sum: value,
            min: value,
            max: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn average(&self) -> f64 {
        self.sum / self.count as f64
    }
}

impl std::fmt::Display for RollupBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.quarter {
            Some(q) => format!("{} {}", self.date.format(record::DATE_FORMAT), q),
            None => self.date.format(record::DATE_FORMAT).to_string(),
        };
        write!(
            f,
            " - {}: n: {}, sum: {:.2}, avg: {:.2}, min: {:.2}, max: {:.2}",
            label,
            self.count,
            self.sum,
            self.average(),
            self.min,
            self.max,
        )
    }
}

/// Groups in-range records into day or quarter bars for `channel`.
///
/// Records arrive in bucket key order, so a bar is closed as soon as the
/// next record belongs to a different day (or quarter).
///
/// # Arguments
/// * `index` - Populated time index.
/// * `interval` - Closed interval to aggregate.
/// * `channel` - Channel to aggregate.
/// * `granularity` - Day or quarter bars.
///
/// # Returns
/// * `Vec<RollupBar>` - One bar per non-empty bucket, oldest first.
pub fn rollup(
    index: &index::TimeIndex,
    interval: &query::Interval,
    channel: record::Channel,
    granularity: Granularity,
) -> Vec<RollupBar> {
    let (mut bars, current) = query::fold_records(
        index,
        interval,
        (Vec::new(), None::<RollupBar>),
        |(mut bars, current), r| {
            let quarter = match granularity {
                Granularity::Day => None,
                Granularity::Quarter => Some(index::DayQuarter::of(r.time)),
            };
            let value = r.value(channel);
            let current = match current {
                Some(mut bar) if bar.date == r.date && bar.quarter == quarter => {
                    bar.push(value);
                    bar
                }
                Some(bar) => {
                    bars.push(bar);
                    RollupBar::open(r.date, quarter, value)
                }
                None => RollupBar::open(r.date, quarter, value),
            };
            (bars, Some(current))
        },
    );

    if let Some(bar) = current {
        bars.push(bar);
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: &str, time: &str, v: f64) -> record::Record {
        record::Record::parse(date, time, [v; 5]).unwrap()
    }

    fn sample() -> index::TimeIndex {
        vec![
            rec("2023-06-01", "05:00", 1.0),
            rec("2023-06-01", "12:10", 4.0),
            rec("2023-06-01", "12:40", 2.0),
            rec("2023-06-02", "19:00", 8.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn daily_bars() {
        let index = sample();
        let range = query::Interval::parse("2023-06-01 00:00", "2023-06-02 23:59").unwrap();
        let bars = rollup(&index, &range, record::Channel::Production, Granularity::Day);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].count, 3);
        assert_eq!(bars[0].sum, 7.0);
        assert_eq!(bars[0].min, 1.0);
        assert_eq!(bars[0].max, 4.0);
        assert_eq!(bars[1].count, 1);
        assert_eq!(bars[1].quarter, None);
    }

    #[test]
    fn quarter_bars_respect_interval() {
        let index = sample();
        let range = query::Interval::parse("2023-06-01 06:00", "2023-06-02 23:59").unwrap();
        let bars = rollup(&index, &range, record::Channel::Production, Granularity::Quarter);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].quarter, Some(index::DayQuarter::Afternoon));
        assert_eq!(bars[0].average(), 3.0);
        assert_eq!(bars[1].quarter, Some(index::DayQuarter::Evening));
    }

    #[test]
    fn empty_range_has_no_bars() {
        let index = sample();
        let range = query::Interval::parse("2024-01-01 00:00", "2024-01-02 00:00").unwrap();
        assert!(rollup(&index, &range, record::Channel::Load, Granularity::Day).is_empty());
    }

    #[test]
    fn parses_granularity() {
        assert_eq!("day".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!("quarter".parse::<Granularity>().unwrap(), Granularity::Quarter);
        assert!("week".parse::<Granularity>().is_err());
    }
}
