//! Trailing time window over the retained edge set.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Half-open interval `[gte, lte)` of currently retained edges, plus the
/// slide increment both bounds advance by each cycle.
///
/// An edge stays visible for at least the window size and at most the window
/// size plus one slide, because eviction runs only after the next batch has
/// been ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub gte: DateTime<Utc>,
    pub lte: DateTime<Utc>,
    pub slide: Duration,
}

impl TimeWindow {
    /// Initial window `[now - window_size, now)`.
    pub fn initial(now: DateTime<Utc>, window_size: Duration, slide: Duration) -> Self {
        Self {
            gte: now - window_size,
            lte: now,
            slide,
        }
    }

    /// The window one slide ahead of this one.
    pub fn advanced(&self) -> Self {
        Self {
            gte: self.gte + self.slide,
            lte: self.lte + self.slide,
            slide: self.slide,
        }
    }
}

/// RFC-3339 at second precision, the bit-exact form edges carry in their
/// `datetime` property and the sink compares cutoffs against.
pub fn to_sink_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn initial_and_advanced_bounds() {
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 0, 30, 0).unwrap();
        let w = TimeWindow::initial(now, Duration::minutes(10), Duration::minutes(10));
        assert_eq!(w.gte, Utc.with_ymd_and_hms(2023, 1, 1, 0, 20, 0).unwrap());
        assert_eq!(w.lte, now);

        let next = w.advanced();
        assert_eq!(next.gte, w.lte);
        assert_eq!(
            next.lte,
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 40, 0).unwrap()
        );
        assert_eq!(next.slide, w.slide);
    }

    #[test]
    fn sink_timestamp_is_second_precision_utc() {
        let t = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_sink_timestamp(t), "2023-01-01T00:00:00Z");
    }
}
