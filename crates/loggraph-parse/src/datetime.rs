//! Embedded-datetime recognition and RFC-3339 rewriting.

use chrono::{FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;

/// Rewrites the two recognized embedded patterns (`dd/Mon/yyyy:hh:mm:ss` and
/// `dd/Mon/yyyy/hh/mm/ss`, optionally followed by a `+hhmm` offset) to
/// RFC-3339 UTC at second precision.
///
/// A value matching neither pattern passes through unchanged with a warning;
/// such an edge never matches an eviction cutoff and stays visible for
/// triage instead of being silently dropped.
pub(crate) struct DatetimeRewriter {
    embedded: Regex,
    offset: Regex,
}

impl DatetimeRewriter {
    pub(crate) fn new() -> Self {
        Self {
            embedded: Regex::new(
                r"(\d{1,2})/([A-Za-z]{3})/(\d{4})[:/](\d{2})[:/](\d{2})[:/](\d{2})",
            )
            .unwrap(),
            offset: Regex::new(r"([+-])(\d{2})(\d{2})").unwrap(),
        }
    }

    /// Returns the rewritten value plus an optional warning for the caller
    /// to attach to the record.
    pub(crate) fn rewrite(&self, raw: &str) -> (String, Option<String>) {
        let Some(caps) = self.embedded.captures(raw) else {
            return (
                raw.to_string(),
                Some(format!("unrecognized datetime format: {raw:?}")),
            );
        };
        let canonical = format!(
            "{}/{}/{} {}:{}:{}",
            &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], &caps[6]
        );
        let Ok(naive) = NaiveDateTime::parse_from_str(&canonical, "%d/%b/%Y %H:%M:%S") else {
            return (
                raw.to_string(),
                Some(format!("unparseable datetime value: {raw:?}")),
            );
        };

        // A trailing +hhmm offset shifts the value; without one the line is
        // taken as UTC.
        let tail = &raw[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
        let utc = match self.offset.captures(tail) {
            Some(off) => {
                let sign = if &off[1] == "-" { -1 } else { 1 };
                let hours: i32 = off[2].parse().unwrap_or(0);
                let minutes: i32 = off[3].parse().unwrap_or(0);
                let seconds = sign * (hours * 3600 + minutes * 60);
                match FixedOffset::east_opt(seconds)
                    .and_then(|fo| fo.from_local_datetime(&naive).single())
                {
                    Some(t) => t.with_timezone(&Utc),
                    None => Utc.from_utc_datetime(&naive),
                }
            }
            None => Utc.from_utc_datetime(&naive),
        };

        (utc.to_rfc3339_opts(SecondsFormat::Secs, true), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_pattern_with_offset() {
        let rw = DatetimeRewriter::new();
        let (out, warn) = rw.rewrite("01/Jan/2023:00:00:00 +0000");
        assert_eq!(out, "2023-01-01T00:00:00Z");
        assert!(warn.is_none());
    }

    #[test]
    fn slash_pattern_without_offset() {
        let rw = DatetimeRewriter::new();
        let (out, warn) = rw.rewrite("26/Sep/2022/08/10/02");
        assert_eq!(out, "2022-09-26T08:10:02Z");
        assert!(warn.is_none());
    }

    #[test]
    fn nonzero_offset_is_applied() {
        let rw = DatetimeRewriter::new();
        let (out, _) = rw.rewrite("01/Jan/2023:02:00:00 +0200");
        assert_eq!(out, "2023-01-01T00:00:00Z");
    }

    #[test]
    fn unrecognized_value_passes_through_with_warning() {
        let rw = DatetimeRewriter::new();
        let (out, warn) = rw.rewrite("2022-04-03 14:01:17.678899");
        assert_eq!(out, "2022-04-03 14:01:17.678899");
        assert!(warn.is_some());
    }
}
