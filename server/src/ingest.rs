use common::{ParseError, Replay, ReplayParser};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no replay file in request")]
    NoFile,
    #[error("uploaded replay file is empty")]
    EmptyUpload,
    #[error("failed to stage replay file")]
    Stage(#[source] std::io::Error),
    #[error("failed to parse replay")]
    Parse(#[from] ParseError),
    #[error("replay parsing task failed")]
    Worker(#[from] tokio::task::JoinError),
}

/// Stages uploaded replay bytes on disk and hands them to the parser.
///
/// The staged copy only lives as long as the [`NamedTempFile`] guard, so it
/// is removed on every return path.
pub struct ReplayIngestor {
    parser: Arc<dyn ReplayParser>,
    staging_dir: PathBuf,
}

impl ReplayIngestor {
    pub fn new(parser: Arc<dyn ReplayParser>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            parser,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Writes the bytes into a fresh `replay-*.rep` file in the staging dir
    pub fn stage(&self, bytes: &[u8]) -> Result<NamedTempFile, IngestError> {
        let mut staged = tempfile::Builder::new()
            .prefix("replay-")
            .suffix(".rep")
            .tempfile_in(&self.staging_dir)
            .map_err(IngestError::Stage)?;

        staged.write_all(bytes).map_err(IngestError::Stage)?;
        staged.flush().map_err(IngestError::Stage)?;

        debug!("Staged {} bytes at {:?}", bytes.len(), staged.path());
        Ok(staged)
    }

    /// Stages and parses synchronously
    pub fn ingest_blocking(&self, bytes: &[u8]) -> Result<Replay, IngestError> {
        if bytes.is_empty() {
            return Err(IngestError::EmptyUpload);
        }

        let staged = self.stage(bytes)?;
        let replay = self.parser.parse_file(staged.path())?;

        info!(
            "Parsed replay: map={}, version={}, players={}, commands={}",
            replay.header.map_name,
            replay.header.version,
            replay.header.players.len(),
            replay.commands.len()
        );
        Ok(replay)
    }

    /// Runs [`Self::ingest_blocking`] on the blocking thread pool
    pub async fn ingest(self: Arc<Self>, bytes: Vec<u8>) -> Result<Replay, IngestError> {
        tokio::task::spawn_blocking(move || self.ingest_blocking(&bytes)).await?
    }
}
