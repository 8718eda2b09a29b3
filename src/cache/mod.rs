//! Disk Cache Module
//! Persists the observation table as CSV plus a JSON metadata sidecar so a
//! restart within the TTL does not refetch from the EPA API.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const DATA_FILE: &str = "epa_pollution_data.csv";
pub const METADATA_FILE: &str = "cache_metadata.json";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cache table error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Cache metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Sidecar describing the cached table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub timestamp: DateTime<Utc>,
    pub record_count: usize,
    pub years: String,
    /// Requested year window and parameters the table was fetched for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

/// Result of looking at the cache directory.
#[derive(Debug)]
pub enum CacheLookup {
    Fresh { df: DataFrame, metadata: CacheMetadata },
    Expired { age_days: i64 },
    Missing,
}

/// File-backed cache for the pollution table.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    ttl_days: i64,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, ttl_days: i64) -> Self {
        Self {
            dir: dir.into(),
            ttl_days,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn lookup(&self) -> Result<CacheLookup, CacheError> {
        self.lookup_at(Utc::now())
    }

    /// Check the cache as of `now`. Every column is read as text; callers
    /// cast the numeric ones.
    pub fn lookup_at(&self, now: DateTime<Utc>) -> Result<CacheLookup, CacheError> {
        let data_path = self.data_path();
        let metadata_path = self.metadata_path();
        if !data_path.exists() || !metadata_path.exists() {
            return Ok(CacheLookup::Missing);
        }

        let metadata: CacheMetadata = serde_json::from_str(&fs::read_to_string(&metadata_path)?)?;
        let age_days = (now - metadata.timestamp).num_days();
        if age_days >= self.ttl_days {
            return Ok(CacheLookup::Expired { age_days });
        }

        info!(
            "Loading cached data from {} ({} days old)",
            metadata.timestamp.format("%Y-%m-%d"),
            age_days
        );
        let df = LazyCsvReader::new(&data_path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        Ok(CacheLookup::Fresh { df, metadata })
    }

    /// Write the table and its metadata.
    pub fn store(
        &self,
        df: &mut DataFrame,
        years: String,
        plan: Option<String>,
    ) -> Result<CacheMetadata, CacheError> {
        fs::create_dir_all(&self.dir)?;

        let mut file = File::create(self.data_path())?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;

        let metadata = CacheMetadata {
            timestamp: Utc::now(),
            record_count: df.height(),
            years,
            plan,
        };
        fs::write(self.metadata_path(), serde_json::to_string_pretty(&metadata)?)?;

        info!("Cached data saved to {}", self.data_path().display());
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("year".into(), vec![2019i32, 2020]),
            Column::new("state".into(), vec!["06", "36"]),
            Column::new("value".into(), vec![12.5f64, 8.0]),
        ])
        .unwrap()
    }

    #[test]
    fn empty_dir_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), 365);
        assert!(matches!(cache.lookup().unwrap(), CacheLookup::Missing));
    }

    #[test]
    fn fresh_cache_keeps_leading_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("nested"), 365);
        let mut df = frame();
        let meta = cache.store(&mut df, "2019-2020".into(), None).unwrap();
        assert_eq!(meta.record_count, 2);

        match cache.lookup().unwrap() {
            CacheLookup::Fresh { df, metadata } => {
                assert_eq!(df.height(), 2);
                assert_eq!(metadata.years, "2019-2020");
                let states = df.column("state").unwrap().as_materialized_series().str().unwrap();
                assert_eq!(states.get(0), Some("06"));
            }
            other => panic!("expected fresh cache, got {other:?}"),
        }
    }

    #[test]
    fn old_cache_is_expired() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), 365);
        cache.store(&mut frame(), "2019-2020".into(), Some("2019-2020 88101".into())).unwrap();

        let later = Utc::now() + Duration::days(400);
        match cache.lookup_at(later).unwrap() {
            CacheLookup::Expired { age_days } => assert!(age_days >= 399),
            other => panic!("expected expiry, got {other:?}"),
        }
    }
}
