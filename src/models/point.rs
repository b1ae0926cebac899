//! Point document structure for Elasticsearch indexing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GeoJSON point geometry. Elasticsearch accepts this form for `geo_point`
/// fields and echoes it back verbatim in `_source`, so the stored coordinate
/// order ([lon, lat]) is also the response order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub geo_type: String,
    pub coordinates: [f64; 2],
}

impl Location {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            geo_type: "Point".to_string(),
            coordinates: [lon, lat],
        }
    }
}

/// Main point document indexed into Elasticsearch.
///
/// Document ids are assigned by Elasticsearch at index time, so the struct
/// carries no id field of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointOfInterest {
    /// Display title
    pub title: String,

    /// Optional link associated with the point
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Point geometry for geospatial queries
    pub loc: Location,

    /// Seed file this document came from
    pub source_file: String,

    /// When the document was indexed; stale cleanup compares against this
    pub import_timestamp: DateTime<Utc>,
}

impl PointOfInterest {
    /// Create a new point document stamped with the current time.
    pub fn new(title: String, url: Option<String>, lon: f64, lat: f64, source_file: &str) -> Self {
        Self {
            title,
            url,
            loc: Location::new(lon, lat),
            source_file: source_file.to_string(),
            import_timestamp: Utc::now(),
        }
    }
}
