//! Persistent index of prior step outcomes.
//!
//! The index is a single JSON file mapping `"<step>_<fingerprint>"` to the
//! last successful result of that step under that configuration:
//!
//! ```json
//! {
//!   "atlas_3f9a0c1d22b4e6f7": {
//!     "timestamp": 1718031600.25,
//!     "result": {
//!       "step": "atlas",
//!       "success": true,
//!       "duration": 0.42,
//!       "message": "Step atlas completed successfully",
//!       "data": { "atlases_created": 2 },
//!       "errors": [],
//!       "warnings": []
//!     },
//!     "config_hash": "3f9a0c1d22b4e6f7"
//!   }
//! }
//! ```

use super::error::CacheError;
use super::result::StepResult;
use super::step::StepId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Cache index filename inside the cache directory.
pub const CACHE_INDEX_FILENAME: &str = "index.json";

/// One cached step outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub result: StepResult,
    pub config_hash: String,
}

/// Decides whether a cache entry can stand in for running its step.
pub trait StalenessPolicy: fmt::Debug {
    fn is_valid(&self, entry: &CacheEntry, fingerprint: &str) -> bool;
}

/// Every entry is stale; the cache only records history.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysStale;

impl StalenessPolicy for AlwaysStale {
    fn is_valid(&self, _entry: &CacheEntry, _fingerprint: &str) -> bool {
        false
    }
}

/// Entries are valid when they succeeded under the same configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintMatch;

impl StalenessPolicy for FingerprintMatch {
    fn is_valid(&self, entry: &CacheEntry, fingerprint: &str) -> bool {
        entry.result.success && entry.config_hash == fingerprint
    }
}

/// Configurable selection of a built-in staleness policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    AlwaysStale,
    FingerprintMatch,
}

impl CachePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachePolicy::AlwaysStale => "always_stale",
            CachePolicy::FingerprintMatch => "fingerprint_match",
        }
    }

    pub fn build(&self) -> Box<dyn StalenessPolicy> {
        match self {
            CachePolicy::AlwaysStale => Box::new(AlwaysStale),
            CachePolicy::FingerprintMatch => Box::new(FingerprintMatch),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('-', "_").as_str() {
            "always_stale" => Ok(CachePolicy::AlwaysStale),
            "fingerprint_match" => Ok(CachePolicy::FingerprintMatch),
            other => Err(format!("unknown cache policy '{}'", other)),
        }
    }
}

/// Key under which a step's result is stored.
pub fn cache_key(step: StepId, fingerprint: &str) -> String {
    format!("{}_{}", step, fingerprint)
}

fn now_epoch_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or_default()
}

/// In-memory view of the on-disk cache index.
#[derive(Debug, Clone)]
pub struct CacheIndex {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

impl CacheIndex {
    /// Empty index that will be written to `dir/index.json`.
    pub fn new(dir: &Path) -> Self {
        Self { path: dir.join(CACHE_INDEX_FILENAME), entries: BTreeMap::new() }
    }

    /// Read the index from `dir`.
    ///
    /// A missing, unreadable or corrupt file yields an empty index.
    pub fn load(dir: &Path) -> Self {
        let mut index = Self::new(dir);
        if !index.path.exists() {
            tracing::debug!(path = %index.path.display(), "no cache index, starting empty");
            return index;
        }

        match read_entries(&index.path) {
            Ok(entries) => {
                tracing::debug!(entries = entries.len(), "loaded cache index");
                index.entries = entries;
            }
            Err(e) => {
                tracing::warn!(
                    path = %index.path.display(),
                    error = %e,
                    "failed to load cache index, starting empty"
                );
            }
        }
        index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn get(&self, step: StepId, fingerprint: &str) -> Option<&CacheEntry> {
        self.entries.get(&cache_key(step, fingerprint))
    }

    /// Store `result`, replacing any previous entry for the same key.
    pub fn record(&mut self, fingerprint: &str, result: StepResult) {
        let entry = CacheEntry {
            timestamp: now_epoch_secs(),
            result,
            config_hash: fingerprint.to_string(),
        };
        self.entries.insert(cache_key(entry.result.step, fingerprint), entry);
    }

    /// Drop every entry for `step`, under any fingerprint.
    pub fn invalidate(&mut self, step: StepId) {
        self.entries.retain(|_, entry| entry.result.step != step);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn save(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, &self.entries)?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, CacheEntry>, CacheError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
