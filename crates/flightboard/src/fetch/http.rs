//! Text source reading from the board's static file server.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{trace, warn};

use super::{Resource, TextSource};
use crate::error::{Error, Result};

/// Upper bound on a single request, so a silent server only costs one cycle.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads resources as `GET <base_url>/data/<file name>`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// Create a source for a server root such as `http://localhost:8080`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to a default HTTP client: {e}");
                reqwest::Client::new()
            });
        Self::with_client(client, base_url)
    }

    /// Create a source reusing an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// URL of a resource.
    #[must_use]
    pub fn url_of(&self, resource: Resource) -> String {
        format!("{}/data/{}", self.base_url, resource.file_name())
    }
}

#[async_trait]
impl TextSource for HttpSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn read_text(&self, resource: Resource) -> Result<String> {
        let url = self.url_of(resource);
        trace!(%url, "Requesting resource");
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Error::fetch(
                resource,
                format!("HTTP error: {}", response.status()),
            ));
        }

        Ok(response.text().await?)
    }
}
