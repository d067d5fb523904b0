//! Keyed extraction of JSON-tagged records.
//!
//! Shippers disagree on key names (`sysloghost` vs `host`, `programname` vs
//! `program_name`), so required fields are read through alias lists. All
//! remaining keys ride along opaquely as edge properties.

use crate::LineParser;
use loggraph_types::{CanonicalRecord, LineFormat, ParseError};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Keys never carried into edge properties: shipper metadata.
fn is_shipper_key(key: &str) -> bool {
    key.contains('@') || key == "tags"
}

fn coerce(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn get_aliased(
    map: &Map<String, Value>,
    aliases: &[&str],
    field: &'static str,
) -> Result<String, ParseError> {
    aliases
        .iter()
        .find_map(|k| map.get(*k))
        .map(coerce)
        .ok_or(ParseError::MissingField(field))
}

impl LineParser {
    pub(crate) fn parse_json(&self, map: &Map<String, Value>) -> Result<CanonicalRecord, ParseError> {
        let remote_addr = get_aliased(map, &["remote_addr"], "remote_addr")?;
        let destination_server = get_aliased(map, &["sysloghost", "host"], "destination_server")?;
        let program_name = get_aliased(map, &["program_name", "programname"], "program_name")?;
        let user_agent = get_aliased(map, &["user_agent"], "user_agent")?;
        let raw_datetime = get_aliased(map, &["datetime", "date_time"], "datetime")?;

        let (datetime, warning) = self.rewriter.rewrite(&raw_datetime);
        let method = map.get("method").map(coerce);
        let message = map
            .get("message")
            .map(coerce)
            .unwrap_or_else(|| "none".to_string());

        let mut extras: HashMap<String, Value> = HashMap::new();
        for (key, value) in map {
            if is_shipper_key(key) || key == "datetime" || key == "date_time" || key == "method" {
                continue;
            }
            if key == "user_agent" {
                // The user-agent may encode two tokens: agent name plus
                // transaction id. Keep the whole value when the split
                // does not hold.
                let mut parts = user_agent.splitn(2, ' ');
                match (parts.next(), parts.next()) {
                    (Some(agent), Some(id)) if !agent.is_empty() && !id.is_empty() => {
                        extras.insert(
                            "user_agent".to_string(),
                            Value::String(agent.to_string()),
                        );
                        extras.insert("user_agent_id".to_string(), Value::String(id.to_string()));
                    }
                    _ => {
                        extras.insert("user_agent".to_string(), Value::String(user_agent.clone()));
                    }
                }
                continue;
            }
            extras.insert(key.clone(), value.clone());
        }

        Ok(CanonicalRecord {
            format: LineFormat::Json,
            remote_addr,
            destination_server,
            // The caller side of a JSON record is whatever the user-agent
            // says; resolving it to a service abbreviation is the
            // normalizer's job.
            source_service: user_agent,
            program_name,
            method,
            datetime,
            message,
            extras,
            warnings: warning.into_iter().collect(),
        })
    }
}
