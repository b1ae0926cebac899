//! Buffered bulk indexing.

use anyhow::{Context, Result};
use elasticsearch::http::request::JsonBody;
use elasticsearch::BulkParts;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::EsClient;
use crate::models::PointOfInterest;

/// Accumulates point documents and ships them in bulk requests of
/// `batch_size`. Call [`BulkIndexer::finish`] to flush the remainder.
pub struct BulkIndexer {
    client: EsClient,
    batch_size: usize,
    buffer: Vec<PointOfInterest>,
    indexed: usize,
    failed: usize,
}

impl BulkIndexer {
    pub fn new(client: EsClient, batch_size: usize) -> Self {
        Self {
            client,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            indexed: 0,
            failed: 0,
        }
    }

    /// Buffer a document, flushing once the batch is full.
    pub async fn add(&mut self, point: PointOfInterest) -> Result<()> {
        self.buffer.push(point);

        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }

        Ok(())
    }

    /// Send the buffered documents as one bulk request.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let docs = std::mem::take(&mut self.buffer);
        let count = docs.len();
        debug!("Flushing {} documents to Elasticsearch", count);

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(count * 2);
        for doc in docs {
            // Bare action line: ids are assigned by Elasticsearch
            body.push(json!({ "index": {} }).into());
            body.push(serde_json::to_value(&doc)?.into());
        }

        let response = self
            .client
            .client()
            .bulk(BulkParts::Index(&self.client.index))
            .body(body)
            .send()
            .await
            .context("Bulk request failed")?;

        let response_body = response.json::<Value>().await?;
        match failed_items(&response_body) {
            Some((failed, reason)) => {
                warn!(
                    "Bulk request had {} errors out of {} documents (first: {})",
                    failed, count, reason
                );
                self.failed += failed;
                self.indexed += count.saturating_sub(failed);
            }
            None => self.indexed += count,
        }

        self.buffer = Vec::with_capacity(self.batch_size);

        Ok(())
    }

    /// Flush the remainder and return (indexed, failed) counts.
    pub async fn finish(mut self) -> Result<(usize, usize)> {
        self.flush().await?;
        Ok((self.indexed, self.failed))
    }
}

/// Count rejected items in a bulk response, with the first error reason.
fn failed_items(response_body: &Value) -> Option<(usize, &str)> {
    if !response_body["errors"].as_bool().unwrap_or(false) {
        return None;
    }

    let mut failed = 0;
    let mut reason = "unknown";
    for item in response_body["items"].as_array()? {
        if let Some(error) = item["index"]["error"].as_object() {
            if failed == 0 {
                reason = error
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
            }
            failed += 1;
        }
    }

    if failed == 0 {
        return None;
    }

    Some((failed, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_items_counts_rejections() {
        let response = json!({
            "errors": true,
            "items": [
                { "index": { "status": 201 } },
                { "index": { "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "failed to parse field [loc]"
                } } },
                { "index": { "status": 400, "error": {
                    "type": "mapper_parsing_exception",
                    "reason": "another"
                } } }
            ]
        });

        let (failed, reason) = failed_items(&response).unwrap();
        assert_eq!(failed, 2);
        assert_eq!(reason, "failed to parse field [loc]");
    }

    #[test]
    fn test_failed_items_ignores_clean_response() {
        let response = json!({
            "errors": false,
            "items": [{ "index": { "status": 201 } }]
        });

        assert!(failed_items(&response).is_none());
    }
}
