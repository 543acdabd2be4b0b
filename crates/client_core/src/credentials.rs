use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use shared::domain::UserProfile;

use crate::CredentialStore;

/// Signed-in profile kept as a JSON file, written by the sign-in flow.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create profile directory '{}'", parent.display())
            })?;
        }
        let raw = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write profile '{}'", self.path.display()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_profile(&self) -> Result<Option<UserProfile>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read profile '{}'", self.path.display()))
            }
        };
        let profile = serde_json::from_str(&raw)
            .with_context(|| format!("malformed profile '{}'", self.path.display()))?;
        Ok(Some(profile))
    }

    fn clear_profile(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove profile '{}'", self.path.display())),
        }
    }
}
