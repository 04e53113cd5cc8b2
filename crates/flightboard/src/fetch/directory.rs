//! Text source reading files from a local data directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use super::{Resource, TextSource};
use crate::error::{Error, Result};

/// Reads resources as `<data_dir>/<file name>`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    data_dir: PathBuf,
}

impl DirectorySource {
    /// Create a source over the given directory.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The directory being read.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of a resource.
    #[must_use]
    pub fn path_of(&self, resource: Resource) -> PathBuf {
        self.data_dir.join(resource.file_name())
    }
}

#[async_trait]
impl TextSource for DirectorySource {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn read_text(&self, resource: Resource) -> Result<String> {
        let path = self.path_of(resource);
        trace!(path = %path.display(), "Reading resource");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::fetch(resource, format!("{}: {e}", path.display())))
    }
}
