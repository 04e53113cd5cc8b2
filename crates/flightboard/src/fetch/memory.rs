//! In-memory text source.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Resource, TextSource};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    texts: HashMap<Resource, String>,
    reads: HashMap<Resource, usize>,
}

/// A text source backed by a shared map.
///
/// Clones share the same contents, so a test (or an embedding application)
/// can keep one handle to change what the board sees while the board polls
/// through another. A resource that is not present reads as a failure.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemorySource::set`].
    #[must_use]
    pub fn with(self, resource: Resource, text: impl Into<String>) -> Self {
        self.set(resource, text);
        self
    }

    /// Set the text of a resource.
    pub fn set(&self, resource: Resource, text: impl Into<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.texts.insert(resource, text.into());
        }
    }

    /// Make a resource unreadable.
    pub fn remove(&self, resource: Resource) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.texts.remove(&resource);
        }
    }

    /// Number of reads issued for a resource so far.
    #[must_use]
    pub fn reads(&self, resource: Resource) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.reads.get(&resource).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl TextSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read_text(&self, resource: Resource) -> Result<String> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| Error::internal("memory source lock poisoned"))?;
        *inner.reads.entry(resource).or_insert(0) += 1;
        inner
            .texts
            .get(&resource)
            .cloned()
            .ok_or_else(|| Error::fetch(resource, "not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_contents() {
        let source = MemorySource::new();
        let other = source.clone();
        other.set(Resource::EteText, "01:10");

        assert_eq!(source.read_text(Resource::EteText).await.unwrap(), "01:10");
        assert_eq!(other.reads(Resource::EteText), 1);
    }

    #[tokio::test]
    async fn test_missing_resource_fails() {
        let source = MemorySource::new();
        let err = source.read_text(Resource::FlightStatus).await.unwrap_err();
        assert!(err.is_fetch_error());
    }
}
