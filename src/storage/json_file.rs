//! Feature store backed by a JSON file on disk.

use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tokio::fs;
use tracing::{info, warn};

use super::{parse_features_document, FeatureSet, FeatureStore};
use crate::error::{FlagError, Result};
use crate::model::Feature;

/// Marker returned while the file does not exist.
pub const MISSING_FILE_ETAG: &str = "missing-file";

/// Upper bound on one read of the file.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads `{ "Features": [...] }` from a file on every call.
///
/// The file may contain comments and trailing commas, and property names are
/// matched in any case. A missing file is not an error: it reads as no
/// features with the [`MISSING_FILE_ETAG`] marker. Otherwise the marker is the
/// file's modification time, so an untouched file keeps its marker.
#[derive(Debug, Clone)]
pub struct JsonFileFeatureStore {
    path: PathBuf,
    timeout: Duration,
}

impl JsonFileFeatureStore {
    /// # Errors
    ///
    /// An empty or whitespace-only path is
    /// [`InvalidInput`](crate::error::ErrorType::InvalidInput).
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(FlagError::invalid_input("Feature file path must not be empty"));
        }
        Ok(Self {
            path,
            timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Sets how long one read may take before failing with a timeout error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn load(&self) -> Result<FeatureSet> {
        let metadata = match fs::metadata(&self.path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(self.missing()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(self.missing()),
            Err(e) => return Err(self.io_error(e)),
        };

        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        let features = parse_features_document(&text).map_err(|e| {
            FlagError::parse_error(format!("{}: {}", self.path.display(), e.message))
        })?;
        let etag = modified_etag(&metadata)?;

        info!(
            path = %self.path.display(),
            features = features.len(),
            etag = %etag,
            "Loaded features from file"
        );
        Ok(FeatureSet::new(features, etag))
    }

    fn missing(&self) -> FeatureSet {
        warn!(path = %self.path.display(), "Feature file not found");
        FeatureSet::new(Vec::new(), MISSING_FILE_ETAG)
    }

    fn io_error(&self, e: std::io::Error) -> FlagError {
        FlagError::io(format!("Failed to read {}: {}", self.path.display(), e))
    }
}

/// Modification time in nanoseconds since the Unix epoch.
fn modified_etag(metadata: &Metadata) -> Result<String> {
    let modified = metadata.modified()?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .map_err(|e| FlagError::io(format!("File modification time before epoch: {}", e)))?;
    Ok(since_epoch.as_nanos().to_string())
}

#[async_trait]
impl FeatureStore for JsonFileFeatureStore {
    async fn get_all(&self) -> Result<FeatureSet> {
        tokio::time::timeout(self.timeout, self.load())
            .await
            .map_err(|_| {
                FlagError::timeout(format!(
                    "Reading {} took longer than {:?}",
                    self.path.display(),
                    self.timeout
                ))
            })?
    }

    async fn get(&self, key: &str) -> Result<Option<Feature>> {
        let set = self.get_all().await?;
        Ok(set.find(key).cloned())
    }
}
