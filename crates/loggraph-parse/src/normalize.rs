//! Identity normalization: raw addresses to stable node identities, records
//! to labeled edges.

use loggraph_types::{
    CanonicalRecord, GraphEdge, IdentityError, IdentityTables, LineFormat, NodeIdentity,
    RecordError, UnknownServiceError,
};
use serde_json::Value;

/// Edge `message` properties are capped so free-text error dumps do not
/// bloat the sink.
const MESSAGE_CAP: usize = 90;

/// Derives node identities and edge labels from canonical records.
///
/// All lookup tables are injected at construction; normalization is a pure
/// function of the input and those tables, which is what makes nodes
/// naturally deduplicate across records naming the same endpoint.
pub struct Normalizer {
    tables: IdentityTables,
}

impl Normalizer {
    pub fn new(tables: IdentityTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &IdentityTables {
        &self.tables
    }

    /// Map a raw address to a sink-safe node identity: alias lookup, then
    /// hyphen substitution, then the `IP_` dot substitution for bare IPs.
    /// The `-` sentinel means no identity is available and the record must
    /// be treated as unprocessable.
    pub fn normalize_node(&self, raw: &str) -> Result<NodeIdentity, IdentityError> {
        if raw.is_empty() || raw == "-" {
            return Err(IdentityError(raw.to_string()));
        }
        let mut name = self
            .tables
            .alias(raw)
            .unwrap_or(raw)
            .replace('-', "_");
        if name.contains('.') {
            name = format!("IP_{}", name).replace('.', "_");
        }
        Ok(NodeIdentity::new(name))
    }

    /// Build the `{Source}_{Method}_{Destination}` edge for a record. An
    /// edge whose label carries the `none` sentinel is unprocessable and is
    /// never persisted.
    pub fn normalize_edge(&self, record: &CanonicalRecord) -> Result<GraphEdge, RecordError> {
        let method = self.method_of(record).unwrap_or("none");
        let (source, destination) = match record.format {
            // The JSON path sees arbitrary client software; unknown names
            // fall back to `S`.
            LineFormat::Json => (
                self.service_abbr_lenient(&record.source_service),
                self.service_abbr_lenient(&record.program_name),
            ),
            // The text path parses trusted server logs with a closed set of
            // service names; a miss there is a hard error for the line.
            _ => (
                self.service_abbr_strict(&record.source_service)?,
                self.service_abbr_strict(&record.program_name)?,
            ),
        };

        let label = format!("{}_{}_{}", source, method, destination);
        if label.split('_').any(|part| part == "none") {
            return Err(RecordError::UnlabeledEdge(label));
        }

        let mut properties = record.extras.clone();
        properties.insert("label".to_string(), Value::String(label.clone()));
        properties.insert(
            "type".to_string(),
            Value::String(if record.is_error_line() { "ERR" } else { "INFO" }.to_string()),
        );
        properties.insert(
            "datetime".to_string(),
            Value::String(record.datetime.clone()),
        );
        properties.insert("method".to_string(), Value::String(method.to_string()));
        properties.insert(
            "message".to_string(),
            Value::String(cap_message(&record.message)),
        );
        properties.insert(
            "remote_addr".to_string(),
            Value::String(record.remote_addr.clone()),
        );
        properties.insert(
            "destination_server".to_string(),
            Value::String(record.destination_server.clone()),
        );
        properties.insert(
            "program_name".to_string(),
            Value::String(record.program_name.clone()),
        );

        Ok(GraphEdge { label, properties })
    }

    /// Tie-break for the method: an explicit, recognized `method` field
    /// wins; otherwise the first table-order method occurring in the
    /// free-text message.
    fn method_of<'a>(&'a self, record: &'a CanonicalRecord) -> Option<&'a str> {
        record
            .method
            .as_deref()
            .filter(|m| self.tables.is_method(m))
            .or_else(|| self.tables.find_method_in(&record.message))
    }

    fn service_abbr_strict(&self, service: &str) -> Result<String, UnknownServiceError> {
        self.tables
            .abbreviation(service)
            .map(String::from)
            .ok_or_else(|| UnknownServiceError(service.to_string()))
    }

    /// Abbreviation for an arbitrary user-agent-shaped service name:
    /// `<svc>-server` maps through the table, `<svc>-updater` maps with a
    /// trailing `U`, anything else (including unmapped prefixes) is `S`.
    fn service_abbr_lenient(&self, service: &str) -> String {
        if let Some(abbr) = self.tables.abbreviation(service) {
            return abbr.to_string();
        }
        if service.contains("-server") {
            let prefix = service.split("-server").next().unwrap_or("");
            return match self.tables.abbreviation(prefix) {
                Some(abbr) => abbr.to_string(),
                None => {
                    tracing::warn!(service, "unmapped server name, defaulting to S");
                    "S".to_string()
                }
            };
        }
        if service.contains("-updater") {
            let prefix = service.split("-updater").next().unwrap_or("");
            return match self.tables.abbreviation(prefix) {
                Some(abbr) => format!("{}U", abbr),
                None => {
                    tracing::warn!(service, "unmapped updater name, defaulting to S");
                    "S".to_string()
                }
            };
        }
        "S".to_string()
    }
}

fn cap_message(message: &str) -> String {
    message.chars().take(MESSAGE_CAP).filter(|c| *c != '\'').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use loggraph_types::LineFormat;
    use std::collections::HashMap;

    fn normalizer() -> Normalizer {
        Normalizer::new(IdentityTables::default())
    }

    fn record(format: LineFormat) -> CanonicalRecord {
        CanonicalRecord {
            format,
            remote_addr: "10.0.0.1".to_string(),
            destination_server: "host1".to_string(),
            source_service: "object".to_string(),
            program_name: "proxy".to_string(),
            method: Some("GET".to_string()),
            datetime: "2023-01-01T00:00:00Z".to_string(),
            message: "none".to_string(),
            extras: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn aliased_address_maps_to_host_name() {
        let n = normalizer();
        // The aliased form wins over IP_ derivation; its own hyphens are
        // still substituted.
        assert_eq!(
            n.normalize_node("172.18.0.2").unwrap().as_str(),
            "m1_r1z1s48"
        );
    }

    #[test]
    fn unaliased_ip_gets_the_ip_prefix() {
        let n = normalizer();
        assert_eq!(n.normalize_node("10.0.0.1").unwrap().as_str(), "IP_10_0_0_1");
    }

    #[test]
    fn hostnames_get_hyphens_substituted() {
        let n = normalizer();
        assert_eq!(n.normalize_node("m9-r1z1s48").unwrap().as_str(), "m9_r1z1s48");
        assert_eq!(n.normalize_node("host1").unwrap().as_str(), "host1");
    }

    #[test]
    fn normalization_is_deterministic() {
        let n = normalizer();
        let a = n.normalize_node("10.0.0.1").unwrap();
        let b = n.normalize_node("10.0.0.1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sentinel_address_is_an_identity_error() {
        let n = normalizer();
        assert!(n.normalize_node("-").is_err());
        assert!(n.normalize_node("").is_err());
    }

    #[test]
    fn text_edge_label_assembles_from_tables() {
        let edge = normalizer().normalize_edge(&record(LineFormat::TextObject)).unwrap();
        assert_eq!(edge.label, "O_GET_P");
        assert_eq!(edge.properties["type"], "INFO");
        assert_eq!(edge.properties["datetime"], "2023-01-01T00:00:00Z");
    }

    #[test]
    fn text_path_unknown_service_is_a_hard_error() {
        let mut rec = record(LineFormat::TextProxy);
        rec.source_service = "mystery".to_string();
        let err = normalizer().normalize_edge(&rec).unwrap_err();
        assert!(matches!(err, RecordError::UnknownService(_)));
    }

    #[test]
    fn json_path_unknown_service_defaults_to_s() {
        let mut rec = record(LineFormat::Json);
        rec.source_service = "curl/7.68.0".to_string();
        rec.program_name = "proxy-server".to_string();
        let edge = normalizer().normalize_edge(&rec).unwrap();
        assert_eq!(edge.label, "S_GET_P");
    }

    #[test]
    fn json_updater_suffix_appends_u() {
        let mut rec = record(LineFormat::Json);
        rec.source_service = "container-updater".to_string();
        rec.program_name = "object-server".to_string();
        let edge = normalizer().normalize_edge(&rec).unwrap();
        assert_eq!(edge.label, "CU_GET_O");
    }

    #[test]
    fn method_falls_back_to_message_scan() {
        let mut rec = record(LineFormat::TextObject);
        rec.method = None;
        rec.message = "replicated then PUT /v1/a/c".to_string();
        let edge = normalizer().normalize_edge(&rec).unwrap();
        assert_eq!(edge.label, "O_PUT_P");
    }

    #[test]
    fn undetermined_method_makes_the_edge_unprocessable() {
        let mut rec = record(LineFormat::TextObject);
        rec.method = None;
        rec.message = "nothing verb-like here".to_string();
        let err = normalizer().normalize_edge(&rec).unwrap_err();
        assert!(matches!(err, RecordError::UnlabeledEdge(_)));
    }

    #[test]
    fn stderr_record_yields_err_type_but_none_source_rejects() {
        let mut rec = record(LineFormat::TextProxyError);
        rec.source_service = "none".to_string();
        let err = normalizer().normalize_edge(&rec).unwrap_err();
        // none-sourced error lines never persist as edges.
        assert!(matches!(err, RecordError::UnlabeledEdge(_)));
    }

    #[test]
    fn message_is_capped_and_stripped_of_quotes() {
        let mut rec = record(LineFormat::TextProxyError);
        rec.format = LineFormat::Json;
        rec.source_service = "object-server".to_string();
        rec.program_name = "proxy-server".to_string();
        rec.message = format!("it's {}", "x".repeat(200));
        let edge = normalizer().normalize_edge(&rec).unwrap();
        let message = edge.properties["message"].as_str().unwrap();
        assert!(message.len() <= 90);
        assert!(!message.contains('\''));
    }
}
