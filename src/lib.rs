//! Tamarack - an HTTP facade over Elasticsearch geo-distance queries
//!
//! This library provides shared types and modules for the ingest and serve binaries.

pub mod bounds;
pub mod elasticsearch;
pub mod models;

pub use bounds::{BoundsError, BoundsQuery, DistanceUnit};
pub use models::{Location, PointOfInterest};
