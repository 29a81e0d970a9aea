use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Look-back window used when counting views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Range {
    OneMinute,
    FiveMinute,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
}

/// Ranges reported when a caller does not ask for specific ones.
pub const DEFAULT_RANGES: &[Range] = &[
    Range::FiveMinute,
    Range::OneHour,
    Range::OneDay,
    Range::OneWeek,
    Range::OneMonth,
];

impl Range {
    pub const ALL: [Range; 6] = [
        Range::OneMinute,
        Range::FiveMinute,
        Range::OneHour,
        Range::OneDay,
        Range::OneWeek,
        Range::OneMonth,
    ];

    pub fn description(self) -> &'static str {
        match self {
            Range::OneMinute => "1 minute ago",
            Range::FiveMinute => "5 minutes ago",
            Range::OneHour => "1 hour ago",
            Range::OneDay => "1 day ago",
            Range::OneWeek => "1 week ago",
            Range::OneMonth => "1 month ago",
        }
    }

    /// A month is counted as 30 days.
    pub fn duration(self) -> TimeDelta {
        match self {
            Range::OneMinute => TimeDelta::minutes(1),
            Range::FiveMinute => TimeDelta::minutes(5),
            Range::OneHour => TimeDelta::hours(1),
            Range::OneDay => TimeDelta::days(1),
            Range::OneWeek => TimeDelta::days(7),
            Range::OneMonth => TimeDelta::days(30),
        }
    }

    /// Whether `timestamp` falls inside `[now - duration, now]`.
    pub fn contains(self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        timestamp <= now && timestamp >= now - self.duration()
    }

    /// Short name used on the command line (`1m`, `5m`, `1h`, `1d`, `7d`, `30d`).
    pub fn short_name(self) -> &'static str {
        match self {
            Range::OneMinute => "1m",
            Range::FiveMinute => "5m",
            Range::OneHour => "1h",
            Range::OneDay => "1d",
            Range::OneWeek => "7d",
            Range::OneMonth => "30d",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Range> {
        Range::ALL
            .into_iter()
            .find(|r| r.short_name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Number of views inside one range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCount {
    pub description: String,
    pub count: u64,
}

impl ViewCount {
    pub fn new(range: Range, count: u64) -> Self {
        Self {
            description: range.description().to_string(),
            count,
        }
    }
}

/// Count `timestamps` into one bucket per range, in `ranges` order.
pub(crate) fn tally<I>(timestamps: I, ranges: &[Range], now: DateTime<Utc>) -> Vec<ViewCount>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut counts = vec![0u64; ranges.len()];

    for ts in timestamps {
        for (slot, range) in counts.iter_mut().zip(ranges) {
            if range.contains(ts, now) {
                *slot += 1;
            }
        }
    }

    ranges
        .iter()
        .zip(counts)
        .map(|(range, count)| ViewCount::new(*range, count))
        .collect()
}

#[cfg(test)]
#[path = "range_tests.rs"]
mod tests;
