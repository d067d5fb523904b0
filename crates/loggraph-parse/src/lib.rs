//! Record parsing and identity normalization.
//!
//! `LineParser` turns one raw log line (text or JSON) into a
//! `CanonicalRecord`; `Normalizer` derives the two node identities and the
//! typed edge from that record. Both are pure: all side effects (sink calls,
//! reject routing) belong to the caller.

mod datetime;
mod json;
mod normalize;
mod scan;
mod text;

pub use normalize::Normalizer;

use datetime::DatetimeRewriter;
use loggraph_types::{CanonicalRecord, ParseError, RawLogLine};
use regex::Regex;
use scan::AddressScanner;

/// Parser over every supported line shape. Format detection runs once per
/// line: text lines are classified by their `<service>-server: ` marker (plus
/// the `STDERR` proxy variant), JSON objects by key lookup.
pub struct LineParser {
    marker: Regex,
    rewriter: DatetimeRewriter,
    scanner: AddressScanner,
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            marker: Regex::new(r"([a-z]+)-server: ").unwrap(),
            rewriter: DatetimeRewriter::new(),
            scanner: AddressScanner::new(),
        }
    }

    /// Parse one raw line. Either every required field comes back populated
    /// or the whole attempt fails; partial records are never emitted.
    pub fn parse(&self, raw: &RawLogLine) -> Result<CanonicalRecord, ParseError> {
        match raw {
            RawLogLine::Text(line) => self.parse_text(line),
            RawLogLine::Json(map) => self.parse_json(map),
        }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip surrounding double quotes from one extracted token.
fn trim_quotes(token: &str) -> &str {
    token.trim_matches('"')
}

/// Strip the surrounding `[...]` of a two-token datetime field.
fn trim_brackets(field: &str) -> &str {
    field.trim_start_matches('[').trim_end_matches(']')
}
