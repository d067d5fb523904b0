//! Static identity-normalization tables, injected into the normalizer at
//! construction so per-deployment and per-test substitution stays possible.

use std::collections::HashMap;

/// Alias, abbreviation, and method tables driving identity normalization.
///
/// `Default` carries the reference deployment: an eight-node storage cluster
/// behind one proxy tier, with the stock service abbreviations.
#[derive(Debug, Clone)]
pub struct IdentityTables {
    /// Raw address -> stable host name.
    aliases: HashMap<String, String>,
    /// Service name -> single-or-two-letter abbreviation.
    abbreviations: HashMap<String, String>,
    /// Recognized HTTP methods, in tie-break scan order.
    methods: Vec<String>,
}

impl IdentityTables {
    pub fn new(
        aliases: HashMap<String, String>,
        abbreviations: HashMap<String, String>,
        methods: Vec<String>,
    ) -> Self {
        Self {
            aliases,
            abbreviations,
            methods,
        }
    }

    /// Aliased host name for a raw address, when one is configured.
    pub fn alias(&self, raw: &str) -> Option<&str> {
        self.aliases.get(raw).map(|s| s.as_str())
    }

    /// Abbreviation for a service name, when one is configured.
    pub fn abbreviation(&self, service: &str) -> Option<&str> {
        self.abbreviations.get(service).map(|s| s.as_str())
    }

    /// Whether `method` is one of the recognized HTTP methods.
    pub fn is_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// First recognized method occurring in `message`, in table order.
    pub fn find_method_in(&self, message: &str) -> Option<&str> {
        self.methods
            .iter()
            .find(|m| message.contains(m.as_str()))
            .map(|m| m.as_str())
    }
}

impl Default for IdentityTables {
    fn default() -> Self {
        let aliases = [
            ("172.18.0.2", "m1-r1z1s48"),
            ("172.18.0.3", "m2-r1z1s48"),
            ("172.18.0.4", "m3-r1z1s48"),
            ("172.18.0.5", "m4-r1z1s48"),
            ("172.18.0.6", "m5-r1z1s48"),
            ("172.18.0.7", "m6-r1z1s48"),
            ("172.18.0.8", "m7-r1z1s48"),
            ("172.18.0.9", "m8-r1z1s48"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let abbreviations = [
            ("proxy", "P"),
            ("account", "A"),
            ("container", "C"),
            ("object", "O"),
            ("Swift", "S"),
            ("python-swiftclient-3.5.0", "S"),
            ("proxy-server", "P"),
            ("account-server", "A"),
            ("container-server", "C"),
            ("object-server", "O"),
            ("none", "none"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let methods = ["GET", "POST", "PUT", "HEAD", "DELETE", "COPY"]
            .into_iter()
            .map(String::from)
            .collect();

        Self::new(aliases, abbreviations, methods)
    }
}
