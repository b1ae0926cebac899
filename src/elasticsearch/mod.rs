//! Elasticsearch connection, schema, and bulk indexing.

mod bulk;
mod client;
mod schema;

pub use bulk::BulkIndexer;
pub use client::{EsClient, EsConfig};
pub use schema::create_index;
