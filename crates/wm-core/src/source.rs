//! Migration script sources.
//!
//! A source hands out a fresh, lazy stream of lines each time it is asked,
//! so a script can be parsed once per run without ever being buffered
//! whole.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Lazy sequence of script lines without their terminators.
pub type LineStream = Pin<Box<dyn Stream<Item = io::Result<String>> + Send>>;

/// Provider of migration script lines.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Open the source and return its lines from the beginning.
    ///
    /// Fails with [`CoreError::SourceNotFound`] when the source does not
    /// exist.
    async fn lines(&self) -> CoreResult<LineStream>;

    /// Human-readable name for logs and error messages.
    fn describe(&self) -> String;
}

/// Migration script read from a file, one line at a time.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source for the script at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying script.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MigrationSource for FileSource {
    async fn lines(&self) -> CoreResult<LineStream> {
        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CoreError::SourceNotFound {
                    path: self.path.display().to_string(),
                }
            } else {
                CoreError::SourceIo {
                    path: self.path.display().to_string(),
                    source: e,
                }
            }
        })?;

        let lines = BufReader::new(file).lines();
        let stream = stream::unfold(lines, |mut lines| async move {
            match lines.next_line().await {
                Ok(Some(line)) => Some((Ok(line), lines)),
                Ok(None) => None,
                Err(e) => Some((Err(e), lines)),
            }
        });
        Ok(Box::pin(stream))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Migration script held in memory.
#[derive(Debug, Clone)]
pub struct StringSource {
    name: String,
    script: String,
}

impl StringSource {
    /// Create an in-memory source.
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            name: "<inline>".to_string(),
            script: script.into(),
        }
    }

    /// Override the name reported by [`MigrationSource::describe`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl MigrationSource for StringSource {
    async fn lines(&self) -> CoreResult<LineStream> {
        let lines: Vec<io::Result<String>> =
            self.script.lines().map(|l| Ok(l.to_string())).collect();
        Ok(Box::pin(stream::iter(lines)))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
