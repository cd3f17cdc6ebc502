use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

/// Failures while loading pretrained models or the requirement catalog at startup.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("unable to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog {path} could not be parsed: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("artifact {path} is inconsistent: {reason}")]
    Schema { path: PathBuf, reason: String },
}

impl ArtifactError {
    pub(crate) fn schema(path: &Path, reason: impl Into<String>) -> Self {
        Self::Schema {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Inference failures; fatal for the single item being scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("feature width mismatch: model expects {expected}, received {found}")]
    WidthMismatch { expected: usize, found: usize },
    #[error("encoder column `{0}` has no value in the feature row")]
    MissingColumn(String),
    #[error("classifier produced class index {index} but only {classes} labels are known")]
    UnknownClass { index: usize, classes: usize },
    #[error("model returned {found} scores for {expected} candidate pairs")]
    ScoreCountMismatch { expected: usize, found: usize },
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}
