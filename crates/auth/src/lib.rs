use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Key under which a profile's bot token is stored.
pub fn token_key(profile: &str) -> String {
    format!("{profile}:bot-token")
}

/// Bot tokens kept in a JSON file readable only by the owner.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at `<dir>/credentials`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::at(dir.as_ref().join("credentials"))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_secret(&self, account: &str, secret: &str) -> Result<()> {
        let mut creds = self.read()?;
        creds.insert(account.to_string(), secret.to_string());
        self.write(&creds)
    }

    pub fn get_secret(&self, account: &str) -> Result<Option<String>> {
        Ok(self.read()?.remove(account))
    }

    /// Remove a secret. Returns whether one was stored.
    pub fn delete_secret(&self, account: &str) -> Result<bool> {
        let mut creds = self.read()?;
        let removed = creds.remove(account).is_some();
        if removed {
            self.write(&creds)?;
        }
        Ok(removed)
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Unable to read credentials at {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed credentials file {}", self.path.display()))
    }

    fn write(&self, creds: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let file = options
            .open(&self.path)
            .with_context(|| format!("Unable to write credentials to {}", self.path.display()))?;
        serde_json::to_writer_pretty(file, creds)?;

        debug!(path = %self.path.display(), entries = creds.len(), "Credentials saved");
        Ok(())
    }
}
