//! Client configuration.
//!
//! Defaults work out of the box; `~/.gtmos/config.json` overrides them,
//! and environment variables override the file. A malformed config file is
//! ignored with a warning rather than failing the session.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::auth::DraftTransition;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Backend base URL. The `/api` or `/demo` prefix is appended per
    /// request based on auth state.
    pub api_base_url: String,
    /// Explicit playground store path. `None` means
    /// `~/.gtmos/playground.db`.
    pub playground_db: Option<PathBuf>,
    /// Playground drafts older than this are swept at store open.
    pub draft_ttl_days: i64,
    /// What happens to playground drafts when the user signs in.
    pub draft_transition: DraftTransition,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            playground_db: None,
            draft_ttl_days: crate::drafts::DEFAULT_DRAFT_TTL_DAYS,
            draft_transition: DraftTransition::ClearOnLogin,
        }
    }
}

impl ClientConfig {
    /// Load configuration: defaults, then `~/.gtmos/config.json`, then
    /// `GTMOS_API_URL` / `GTMOS_PLAYGROUND_DB` environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file().unwrap_or_default();

        if let Ok(url) = std::env::var("GTMOS_API_URL") {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }
        if let Ok(path) = std::env::var("GTMOS_PLAYGROUND_DB") {
            if !path.is_empty() {
                config.playground_db = Some(PathBuf::from(path));
            }
        }
        config
    }

    fn from_file() -> Option<Self> {
        let path = dirs::home_dir()?.join(".gtmos").join("config.json");
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("ignoring malformed {}: {e}", path.display());
                None
            }
        }
    }
}
