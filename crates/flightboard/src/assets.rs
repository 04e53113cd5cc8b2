//! Image base URL selection.

use serde::{Deserialize, Serialize};

/// Host name that selects the local asset server.
pub const LOCAL_HOST: &str = "localhost";

/// Where the board's images are served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBase {
    /// Base URL used when the board runs on `localhost`.
    pub local: String,
    /// Base URL used everywhere else.
    pub deployed: String,
}

impl Default for AssetBase {
    fn default() -> Self {
        Self {
            local: "http://localhost:8080".to_string(),
            deployed: "https://flight-info-board.vercel.app".to_string(),
        }
    }
}

impl AssetBase {
    /// Base URL for a board served from `host`.
    #[must_use]
    pub fn select(&self, host: &str) -> &str {
        if host == LOCAL_HOST {
            &self.local
        } else {
            &self.deployed
        }
    }

    /// Resolve an image path for a board served from `host`.
    #[must_use]
    pub fn resolve(&self, host: &str, path: &str) -> String {
        format!("{}{path}", self.select(host))
    }
}
