//! Seed CSV parsing.
//!
//! A seed file is a CSV with `title,url,lat,lon` headers describing points
//! to index. Files ending in `.gz` are decompressed transparently.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use serde::Deserialize;

use tamarack::models::PointOfInterest;

/// One row of a seed CSV. An empty `url` field becomes `None`.
#[derive(Debug, Deserialize)]
pub struct SeedRecord {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl SeedRecord {
    /// Convert to an indexable document. GeoJSON wants (lon, lat) order.
    pub fn into_point(self, source_file: &str) -> PointOfInterest {
        PointOfInterest::new(self.title, self.url, self.lon, self.lat, source_file)
    }
}

fn open_seed_file(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).context("Failed to open seed file")?;
    if path.extension().map_or(false, |e| e == "gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Read every record of a seed file, failing on the first malformed row.
pub fn read_seed_records(path: &Path) -> Result<Vec<SeedRecord>> {
    let reader = open_seed_file(path)?;
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut records = Vec::new();
    for (row, result) in csv_reader.deserialize().enumerate() {
        // Line 1 is the header row
        let record: SeedRecord =
            result.with_context(|| format!("Malformed seed record on line {}", row + 2))?;
        records.push(record);
    }

    Ok(records)
}
