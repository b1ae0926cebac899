//! Index schema management.

use anyhow::{Context, Result};
use elasticsearch::indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts};
use serde_json::Value;
use tracing::info;

use super::EsClient;

/// Index mapping embedded at compile time
const POINTS_MAPPING: &str = include_str!("../../schema/points_mapping.json");

fn points_mapping() -> Result<Value> {
    serde_json::from_str(POINTS_MAPPING).context("Failed to parse points_mapping.json")
}

async fn index_exists(client: &EsClient) -> Result<bool> {
    let response = client
        .client()
        .indices()
        .exists(IndicesExistsParts::Index(&[&client.index]))
        .send()
        .await?;

    Ok(response.status_code().is_success())
}

/// Create the point index with its geo mapping.
///
/// An existing index is left untouched unless `delete_existing` is set, in
/// which case it is dropped and rebuilt from the embedded mapping.
pub async fn create_index(client: &EsClient, delete_existing: bool) -> Result<()> {
    let es = client.client();

    if index_exists(client).await? {
        if !delete_existing {
            info!("Index {} already exists, skipping creation", client.index);
            return Ok(());
        }

        info!("Deleting existing index: {}", client.index);
        es.indices()
            .delete(IndicesDeleteParts::Index(&[&client.index]))
            .send()
            .await
            .context("Failed to delete existing index")?;
    }

    info!("Creating index: {}", client.index);
    let response = es
        .indices()
        .create(IndicesCreateParts::Index(&client.index))
        .body(points_mapping()?)
        .send()
        .await
        .context("Failed to create index")?;

    if !response.status_code().is_success() {
        let error_body = response.text().await?;
        anyhow::bail!("Index creation failed: {}", error_body);
    }

    info!("Index {} ready", client.index);
    Ok(())
}
