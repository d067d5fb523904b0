//! Positional parsing of the plain-text line formats.
//!
//! Three variants share the `<service>-server: ` marker: the storage tiers
//! (object/container/account) have one layout, the proxy tier has a normal
//! access layout and a positionally different STDERR layout with a degraded
//! fallback.

use crate::{trim_brackets, trim_quotes, LineParser};
use loggraph_types::{CanonicalRecord, LineFormat, ParseError};
use serde_json::Value;
use std::collections::HashMap;

/// Minimum whitespace-delimited tokens after the marker, per variant.
const STORAGE_MIN_TOKENS: usize = 18;
const PROXY_MIN_TOKENS: usize = 20;
const PROXY_ERROR_MIN_TOKENS: usize = 13;

impl LineParser {
    pub(crate) fn parse_text(&self, line: &str) -> Result<CanonicalRecord, ParseError> {
        let marker = self
            .marker
            .captures(line)
            .ok_or(ParseError::UnrecognizedShape)?;
        let service = marker
            .get(1)
            .map(|m| m.as_str())
            .ok_or(ParseError::UnrecognizedShape)?;
        // Syslog prefix: "Mon dd hh:mm:ss <host> <service>-server: ..."
        let destination = line
            .split_whitespace()
            .nth(3)
            .ok_or(ParseError::MissingField("destination_server"))?;
        let marker_end = marker.get(0).map(|m| m.end()).unwrap_or(0);

        match service {
            "object" | "container" | "account" => {
                self.parse_storage(&line[marker_end..], service, destination)
            }
            "proxy" if line.contains("STDERR") => self.parse_proxy_error(line, destination),
            "proxy" => self.parse_proxy(&line[marker_end..], destination),
            _ => Err(ParseError::UnrecognizedShape),
        }
    }

    /// object/container/account access layout: remote address, two dash
    /// fields, bracketed datetime pair, quoted method/path, status, length,
    /// referer pair, transaction id, user-agent pair, timing and server
    /// bookkeeping fields.
    fn parse_storage(
        &self,
        rest: &str,
        service: &str,
        destination: &str,
    ) -> Result<CanonicalRecord, ParseError> {
        let items: Vec<&str> = rest.split_whitespace().collect();
        if items.len() < STORAGE_MIN_TOKENS {
            return Err(ParseError::Truncated {
                expected: STORAGE_MIN_TOKENS,
                got: items.len(),
            });
        }

        let raw_datetime = format!("{} {}", items[3], items[4]);
        let (datetime, warning) = self.rewriter.rewrite(trim_brackets(&raw_datetime));
        let user_agent = trim_quotes(&format!("{} {}", items[12], items[13])).to_string();
        // The caller side is whatever software named itself in the
        // user-agent, stripped of any `-server` suffix.
        let source_service = trim_quotes(items[12])
            .split("-server")
            .next()
            .unwrap_or("")
            .to_string();

        let mut extras = HashMap::new();
        for (key, value) in [
            ("path", trim_quotes(items[6]).to_string()),
            ("status_int", items[7].to_string()),
            ("content_length", items[8].to_string()),
            (
                "referer",
                trim_quotes(&format!("{} {}", items[9], items[10])).to_string(),
            ),
            ("transaction_id", trim_quotes(items[11]).to_string()),
            ("user_agent", user_agent),
            ("request_time", items[14].to_string()),
            ("additional_info", trim_quotes(items[15]).to_string()),
            ("server_pid", items[16].to_string()),
            ("policy_index", items[17].to_string()),
        ] {
            extras.insert(key.to_string(), Value::String(value));
        }

        Ok(CanonicalRecord {
            format: LineFormat::TextObject,
            remote_addr: items[0].to_string(),
            destination_server: destination.to_string(),
            source_service,
            program_name: service.to_string(),
            method: Some(trim_quotes(items[5]).to_string()),
            datetime,
            message: "none".to_string(),
            extras,
            warnings: warning.into_iter().collect(),
        })
    }

    /// proxy-server normal access layout: 20 positional fields (21 with the
    /// trailing policy index, which older proxies omit).
    fn parse_proxy(&self, rest: &str, destination: &str) -> Result<CanonicalRecord, ParseError> {
        let items: Vec<&str> = rest.split_whitespace().collect();
        if items.len() < PROXY_MIN_TOKENS {
            return Err(ParseError::Truncated {
                expected: PROXY_MIN_TOKENS,
                got: items.len(),
            });
        }

        let (datetime, warning) = self.rewriter.rewrite(trim_brackets(items[2]));
        let user_agent = trim_quotes(items[8]).to_string();
        let source_service = user_agent.split("-server").next().unwrap_or("").to_string();

        let mut extras = HashMap::new();
        for (key, value) in [
            ("client_ip", items[0].to_string()),
            ("path", trim_quotes(items[4]).to_string()),
            ("protocol", trim_quotes(items[5]).to_string()),
            ("status_int", items[6].to_string()),
            ("referer", trim_quotes(items[7]).to_string()),
            ("user_agent", user_agent),
            ("auth_token", items[9].to_string()),
            ("bytes_recvd", items[10].to_string()),
            ("bytes_sent", items[11].to_string()),
            ("client_etag", items[12].to_string()),
            ("transaction_id", items[13].to_string()),
            ("headers", items[14].to_string()),
            ("request_time", items[15].to_string()),
            ("source", items[16].to_string()),
            ("log_info", items[17].to_string()),
            ("start_time", items[18].to_string()),
            ("end_time", items[19].to_string()),
            (
                "policy_index",
                items.get(20).copied().unwrap_or("-").to_string(),
            ),
        ] {
            extras.insert(key.to_string(), Value::String(value));
        }

        Ok(CanonicalRecord {
            format: LineFormat::TextProxy,
            remote_addr: items[1].to_string(),
            destination_server: destination.to_string(),
            source_service,
            program_name: "proxy".to_string(),
            method: Some(trim_quotes(items[3]).to_string()),
            datetime,
            message: "none".to_string(),
            extras,
            warnings: warning.into_iter().collect(),
        })
    }

    /// proxy STDERR layout. When even that layout does not hold, fall back
    /// to a degraded record carrying a best-effort scanned address and the
    /// raw message; its method stays undetermined, so it can never become an
    /// edge.
    fn parse_proxy_error(
        &self,
        line: &str,
        destination: &str,
    ) -> Result<CanonicalRecord, ParseError> {
        let rest = line
            .splitn(2, "STDERR: ")
            .nth(1)
            .ok_or(ParseError::UnrecognizedShape)?;
        let items: Vec<&str> = rest.split_whitespace().collect();

        if items.len() < PROXY_ERROR_MIN_TOKENS {
            return Ok(self.degraded_proxy_error(rest, destination));
        }

        let raw_datetime = format!("{} {}", items[3], items[4]);
        let (datetime, warning) = self.rewriter.rewrite(trim_brackets(&raw_datetime));

        let mut extras = HashMap::new();
        for (key, value) in [
            ("path", items[6].to_string()),
            ("protocol", trim_quotes(items[7]).to_string()),
            ("status_int", items[8].to_string()),
            (
                "transaction_id",
                trim_quotes(items[12]).trim_end_matches(')').to_string(),
            ),
        ] {
            extras.insert(key.to_string(), Value::String(value));
        }

        Ok(CanonicalRecord {
            format: LineFormat::TextProxyError,
            remote_addr: items[0].to_string(),
            destination_server: destination.to_string(),
            source_service: "none".to_string(),
            program_name: "proxy".to_string(),
            method: Some(trim_quotes(items[5]).to_string()),
            datetime,
            message: rest.to_string(),
            extras,
            warnings: warning.into_iter().collect(),
        })
    }

    fn degraded_proxy_error(&self, rest: &str, destination: &str) -> CanonicalRecord {
        let remote_addr = self
            .scanner
            .extract_address(rest)
            .unwrap_or_else(|| "-".to_string());
        CanonicalRecord {
            format: LineFormat::TextProxyError,
            remote_addr,
            destination_server: destination.to_string(),
            source_service: "none".to_string(),
            program_name: "proxy".to_string(),
            method: None,
            datetime: String::new(),
            message: rest.to_string(),
            extras: HashMap::new(),
            warnings: vec!["degraded proxy STDERR record: no positional layout".to_string()],
        }
    }
}
