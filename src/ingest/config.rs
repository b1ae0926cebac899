//! Import manifest loading.
//!
//! A manifest imports several seed files in one run:
//!
//! ```toml
//! [global]
//! es_url = "http://localhost:9200"
//! index = "points"
//!
//! [[datasets]]
//! name = "seattle-parks"
//! path = "seeds/seattle-parks.csv.gz"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Manifest {
    pub global: GlobalConfig,
    pub datasets: Vec<DatasetConfig>,
}

/// Connection settings shared by every dataset in the manifest.
#[derive(Debug, Deserialize, Clone)]
pub struct GlobalConfig {
    pub es_url: String,
    pub index: String,
}

/// One seed file to import.
#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub name: String,
    pub path: PathBuf,
}

impl Manifest {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read manifest file")?;
        let manifest: Manifest =
            toml::from_str(&content).context("Failed to parse manifest file")?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parses_datasets_in_order() {
        let manifest: Manifest = toml::from_str(
            r#"
            [global]
            es_url = "http://localhost:9200"
            index = "points"

            [[datasets]]
            name = "seattle-parks"
            path = "seeds/seattle-parks.csv.gz"

            [[datasets]]
            name = "trailheads"
            path = "seeds/trailheads.csv"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.global.index, "points");
        assert_eq!(manifest.datasets.len(), 2);
        assert_eq!(manifest.datasets[0].name, "seattle-parks");
        assert_eq!(
            manifest.datasets[1].path,
            PathBuf::from("seeds/trailheads.csv")
        );
    }
}
