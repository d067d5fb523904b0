//! Neo4j-backed graph sink over the HTTP transactional Cypher endpoint.

use loggraph_types::{GraphEdge, GraphSink, NodeIdentity, SinkError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// Graph sink talking to Neo4j via `POST {base}/db/{database}/tx/commit`.
///
/// Node identifiers and edge labels arrive already normalized to the
/// identifier grammar (alphanumeric plus underscore), which is what lets the
/// relationship type be spliced into the Cypher text; everything else goes
/// through statement parameters.
pub struct Neo4jGraphSink {
    client: reqwest::Client,
    base_url: String,
    database: String,
    username: String,
    password: String,
}

impl Neo4jGraphSink {
    pub fn new(
        base_url: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("NEO4J_URL").unwrap_or_else(|_| "http://localhost:7474".to_string()),
            std::env::var("NEO4J_DATABASE").unwrap_or_else(|_| "neo4j".to_string()),
            std::env::var("NEO4J_USERNAME").unwrap_or_else(|_| "neo4j".to_string()),
            std::env::var("NEO4J_PASSWORD").unwrap_or_else(|_| "test".to_string()),
        )
    }

    async fn commit(&self, statements: Vec<Value>) -> Result<(), SinkError> {
        let url = format!("{}/db/{}/tx/commit", self.base_url, self.database);
        let body = json!({ "statements": statements });
        let res = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
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
                "neo4j returned {}: {}",
                status, text
            )));
        }

        let parsed: TxResponse =
            serde_json::from_str(&text).map_err(|e| SinkError::Protocol(e.to_string()))?;
        if let Some(err) = parsed.errors.first() {
            return Err(SinkError::Protocol(format!(
                "{}: {}",
                err.code, err.message
            )));
        }
        Ok(())
    }

    fn statement(cypher: impl Into<String>, parameters: Value) -> Value {
        json!({ "statement": cypher.into(), "parameters": parameters })
    }
}

#[async_trait]
impl GraphSink for Neo4jGraphSink {
    async fn create_node(&self, id: &NodeIdentity) -> Result<(), SinkError> {
        self.commit(vec![Self::statement(
            "CREATE (:node { name: $name })",
            json!({ "name": id.as_str() }),
        )])
        .await
    }

    async fn create_edge(
        &self,
        from: &NodeIdentity,
        to: &NodeIdentity,
        edge: &GraphEdge,
    ) -> Result<(), SinkError> {
        let cypher = format!(
            "MATCH (u:node {{ name: $from }}), (r:node {{ name: $to }}) \
             CREATE (u)-[:{} $props]->(r)",
            edge.label
        );
        self.commit(vec![Self::statement(
            cypher,
            json!({
                "from": from.as_str(),
                "to": to.as_str(),
                "props": edge.properties,
            }),
        )])
        .await
    }

    async fn delete_edges_older_than(&self, cutoff: &str) -> Result<(), SinkError> {
        self.commit(vec![Self::statement(
            "MATCH ()-[r]->() WHERE datetime(r.datetime) <= datetime($cutoff) DELETE r",
            json!({ "cutoff": cutoff }),
        )])
        .await
    }

    async fn clear(&self) -> Result<(), SinkError> {
        self.commit(vec![
            Self::statement("MATCH (a)-[r]->() DELETE a, r", json!({})),
            Self::statement("MATCH (a) DELETE a", json!({})),
        ])
        .await
    }
}
