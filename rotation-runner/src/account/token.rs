//! Refresh-token storage.

use super::AccountError;
use std::path::{Path, PathBuf};

/// Opaque credential storage. The token is never inspected, only passed on.
pub trait TokenStore: Send + Sync {
    fn get_token(&self) -> Result<String, AccountError>;
    fn put_token(&self, token: &str) -> Result<(), AccountError>;
}

/// A token kept as the sole content of a text file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get_token(&self) -> Result<String, AccountError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            AccountError::TokenStore(format!("read {}: {e}", self.path.display()))
        })?;
        let token = content.trim();
        if token.is_empty() {
            return Err(AccountError::TokenStore(format!(
                "{} is empty",
                self.path.display()
            )));
        }
        Ok(token.to_string())
    }

    /// Written to a sibling temp file, then renamed over the original.
    fn put_token(&self, token: &str) -> Result<(), AccountError> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, format!("{token}\n"))
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| AccountError::TokenStore(format!("write {}: {e}", self.path.display())))
    }
}
