//! Best-effort address extraction from free-text messages.
//!
//! Used only by the degraded proxy-STDERR fallback, where no positional
//! field layout survives.

use regex::Regex;

pub(crate) struct AddressScanner {
    url: Regex,
    dotted: Regex,
}

impl AddressScanner {
    pub(crate) fn new() -> Self {
        Self {
            url: Regex::new(r"http://([^:/\s]+):(\d+)/").unwrap(),
            dotted: Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap(),
        }
    }

    /// First address found in `message`: the host of an `http://host:port/`
    /// URL wins over a bare dotted quad. The wildcard bind address
    /// `0.0.0.0` counts as no address.
    pub(crate) fn extract_address(&self, message: &str) -> Option<String> {
        let found = self
            .url
            .captures(message)
            .map(|c| c[1].to_string())
            .or_else(|| self.dotted.find(message).map(|m| m.as_str().to_string()))?;
        if found == "0.0.0.0" {
            return None;
        }
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_host_wins_over_bare_ip() {
        let scanner = AddressScanner::new();
        let msg = "ERROR with http://172.18.0.7:6200/sda1 from 10.0.0.9";
        assert_eq!(scanner.extract_address(msg).as_deref(), Some("172.18.0.7"));
    }

    #[test]
    fn falls_back_to_dotted_quad() {
        let scanner = AddressScanner::new();
        assert_eq!(
            scanner.extract_address("timeout talking to 10.0.0.9 (txn abc)"),
            Some("10.0.0.9".to_string())
        );
    }

    #[test]
    fn wildcard_and_absent_addresses_yield_none() {
        let scanner = AddressScanner::new();
        assert_eq!(scanner.extract_address("bound to 0.0.0.0"), None);
        assert_eq!(scanner.extract_address("no address in here"), None);
    }
}
