//! Elasticsearch-backed log source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loggraph_types::{to_sink_timestamp, LogSource, RawLogLine, SinkError};
use serde_json::{json, Value};

/// Pulls log batches from an Elasticsearch index written by the log shipper.
///
/// `fetch_batch` issues one `_search` with an `@timestamp` range filter over
/// the half-open interval `[gte, lte)` and yields each hit's `_source`
/// object as a JSON raw line.
pub struct ElasticLogSource {
    client: reqwest::Client,
    base_url: String,
    index: String,
    page_size: usize,
}

impl ElasticLogSource {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>, page_size: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            index: index.into(),
            page_size,
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            std::env::var("ELASTIC_URL").unwrap_or_else(|_| "http://localhost:9200".to_string());
        let index = std::env::var("ELASTIC_INDEX").unwrap_or_else(|_| "logstash-*".to_string());
        let page_size = std::env::var("ELASTIC_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);
        Self::new(base_url, index, page_size)
    }
}

#[async_trait]
impl LogSource for ElasticLogSource {
    async fn fetch_batch(
        &self,
        gte: DateTime<Utc>,
        lte: DateTime<Utc>,
    ) -> Result<Vec<RawLogLine>, SinkError> {
        let url = format!("{}/{}/_search", self.base_url, self.index);
        let body = json!({
            "size": self.page_size,
            "query": {
                "range": {
                    "@timestamp": {
                        "gte": to_sink_timestamp(gte),
                        "lt": to_sink_timestamp(lte),
                    }
                }
            }
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(SinkError::Http(format!(
                "elasticsearch returned {}: {}",
                status, text
            )));
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| SinkError::Protocol(e.to_string()))?;
        let hits = parsed["hits"]["hits"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut lines = Vec::with_capacity(hits.len());
        for hit in hits {
            match hit.get("_source") {
                Some(Value::Object(map)) => lines.push(RawLogLine::Json(map.clone())),
                Some(Value::String(s)) => lines.push(RawLogLine::Text(s.clone())),
                other => {
                    tracing::warn!(source = ?other, "skipping hit without a usable _source");
                }
            }
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn fetch_batch_sends_half_open_range_and_collects_sources() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/logstash-*/_search")
            .match_body(mockito::Matcher::PartialJson(json!({
                "query": { "range": { "@timestamp": {
                    "gte": "2022-09-10T08:00:00Z",
                    "lt": "2022-09-10T08:10:00Z",
                }}}
            })))
            .with_body(
                r#"{"hits":{"hits":[
                    {"_source":{"remote_addr":"172.17.0.1","host":"m1"}},
                    {"_source":{"remote_addr":"172.17.0.2","host":"m2"}}
                ]}}"#,
            )
            .create_async()
            .await;

        let source = ElasticLogSource::new(server.url(), "logstash-*", 10_000);
        let gte = Utc.with_ymd_and_hms(2022, 9, 10, 8, 0, 0).unwrap();
        let lte = Utc.with_ymd_and_hms(2022, 9, 10, 8, 10, 0).unwrap();
        let lines = source.fetch_batch(gte, lte).await.unwrap();

        assert_eq!(lines.len(), 2);
        assert!(matches!(&lines[0], RawLogLine::Json(map) if map["host"] == "m1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_failure_is_a_sink_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/logstash-*/_search")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let source = ElasticLogSource::new(server.url(), "logstash-*", 100);
        let gte = Utc.with_ymd_and_hms(2022, 9, 10, 8, 0, 0).unwrap();
        let lte = Utc.with_ymd_and_hms(2022, 9, 10, 8, 10, 0).unwrap();
        assert!(source.fetch_batch(gte, lte).await.is_err());
    }
}
