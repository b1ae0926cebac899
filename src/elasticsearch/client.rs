//! Connection handling for the point index.

use anyhow::Result;
use chrono::{DateTime, Utc};
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::{DeleteByQueryParts, Elasticsearch};
use serde_json::{json, Value};
use url::Url;

/// Connection settings for the point index. Both binaries build one of these
/// from their CLI arguments and hand it to [`EsClient::connect`].
#[derive(Debug, Clone)]
pub struct EsConfig {
    /// Elasticsearch base URL, e.g. `http://localhost:9200`
    pub url: String,
    /// Name of the index holding point documents
    pub index: String,
}

/// Elasticsearch client bound to one point index.
#[derive(Clone)]
pub struct EsClient {
    client: Elasticsearch,
    pub index: String,
}

impl EsClient {
    /// Build a client from connection settings. Fails on an unparseable URL;
    /// no traffic is sent until the first request.
    pub fn connect(config: &EsConfig) -> Result<Self> {
        let url = Url::parse(&config.url)?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool).disable_proxy().build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            index: config.index.clone(),
        })
    }

    /// Raw Elasticsearch handle for building requests.
    pub fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Check that the cluster is reachable and not red.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .cluster()
            .health(elasticsearch::cluster::ClusterHealthParts::None)
            .send()
            .await?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        // The health endpoint answers 200 even for a red cluster
        let body = response.json::<Value>().await?;
        Ok(body["status"].as_str().map_or(false, |s| s != "red"))
    }

    /// Number of documents in the point index.
    pub async fn doc_count(&self) -> Result<u64> {
        let response = self
            .client
            .count(elasticsearch::CountParts::Index(&[&self.index]))
            .send()
            .await?;

        let body = response.json::<Value>().await?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }

    /// Delete documents for `source_file` indexed before `cutoff`, returning
    /// how many were removed.
    pub async fn delete_stale(&self, source_file: &str, cutoff: DateTime<Utc>) -> Result<u64> {
        let query = json!({
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "source_file": source_file } },
                        { "range": { "import_timestamp": { "lt": cutoff.to_rfc3339() } } }
                    ]
                }
            }
        });

        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[&self.index]))
            .body(query)
            .send()
            .await?;

        let body = response.json::<Value>().await?;
        Ok(body["deleted"].as_u64().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_unparseable_url() {
        let config = EsConfig {
            url: "not a url".to_string(),
            index: "points".to_string(),
        };

        assert!(EsClient::connect(&config).is_err());
    }

    #[test]
    fn test_connect_needs_no_running_cluster() {
        let config = EsConfig {
            url: "http://localhost:9200".to_string(),
            index: "points".to_string(),
        };

        let client = EsClient::connect(&config).unwrap();
        assert_eq!(client.index, "points");
    }
}
