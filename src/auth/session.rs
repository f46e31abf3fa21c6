//! Session token storage.
//!
//! The platform issues a short-lived access token and a longer-lived refresh
//! token on login. Both are opaque strings; no structure is assumed. They are
//! persisted under the same fixed key names the web client uses so a session
//! survives process restarts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Token file name in the data directory
const TOKENS_FILE: &str = "tokens.json";

/// The credentials of the one active session.
///
/// `refresh_token` is optional: the login endpoint does not always issue one,
/// and the expiry interceptor treats its absence as an unrecoverable 401.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl SessionTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

/// Durable storage for the session tokens.
///
/// The `ApiClient` only ever talks to this trait, so tests can substitute an
/// inspectable store. Writes replace both tokens wholesale; reads after
/// `clear` return `None`.
pub trait TokenStore: Send + Sync {
    fn read(&self) -> Result<Option<SessionTokens>>;
    fn save(&self, tokens: &SessionTokens) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// File-backed token store under the application data directory.
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn tokens_path(&self) -> PathBuf {
        self.dir.join(TOKENS_FILE)
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self) -> Result<Option<SessionTokens>> {
        let path = self.tokens_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let tokens: SessionTokens =
            serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(tokens))
    }

    fn save(&self, tokens: &SessionTokens) -> Result<()> {
        let path = self.tokens_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;
        std::fs::write(path, contents).context("Failed to write token file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.tokens_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_returns_none_when_never_saved() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn save_then_read_round_trips_both_tokens() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());

        let tokens = SessionTokens::new("A1", Some("R1".to_string()));
        store.save(&tokens).unwrap();
        assert_eq!(store.read().unwrap(), Some(tokens.clone()));

        // A second store over the same directory sees the same session,
        // i.e. tokens survive a process restart.
        let reopened = FileTokenStore::new(dir.path().to_path_buf());
        assert_eq!(reopened.read().unwrap(), Some(tokens));
    }

    #[test]
    fn save_replaces_the_session_wholesale() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());

        store
            .save(&SessionTokens::new("A1", Some("R1".to_string())))
            .unwrap();
        store
            .save(&SessionTokens::new("A2", Some("R1".to_string())))
            .unwrap();

        let tokens = store.read().unwrap().unwrap();
        assert_eq!(tokens.access_token, "A2");
        assert_eq!(tokens.refresh_token.as_deref(), Some("R1"));
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());

        store
            .save(&SessionTokens::new("A1", Some("R1".to_string())))
            .unwrap();
        store.clear().unwrap();
        assert!(store.read().unwrap().is_none());

        // Clearing an already-empty store succeeds.
        store.clear().unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn on_disk_format_uses_the_fixed_key_names() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());
        store
            .save(&SessionTokens::new("A1", Some("R1".to_string())))
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join(TOKENS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["token"], "A1");
        assert_eq!(value["refreshToken"], "R1");
    }

    #[test]
    fn parses_session_without_refresh_token() {
        let tokens: SessionTokens = serde_json::from_str(r#"{"token":"A1"}"#).unwrap();
        assert_eq!(tokens.access_token, "A1");
        assert!(tokens.refresh_token.is_none());
    }
}
