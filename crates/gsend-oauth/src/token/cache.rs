//! On-disk token cache.
//!
//! The cache holds one [`Credential`] as a versioned JSON record:
//!
//! ```text
//! {"version":1,"token":{...},"client_id":"...","client_secret":"...","token_uri":"..."}
//! ```
//!
//! The file is a bearer credential and is replaced atomically with an
//! owner-only copy on Unix. Writers are not coordinated; the last write wins.

use super::Credential;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Record layout version written by this build.
pub const CACHE_VERSION: u32 = 1;

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct CacheRecord {
    version: u32,
    #[serde(flatten)]
    credential: Credential,
}

/// Token cache file.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Creates a cache backed by `path`. Nothing is touched until
    /// [`load`](Self::load) or [`save`](Self::save).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached credential, or `None` when no cache file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, is not valid
    /// JSON, or was written with a different record version.
    pub fn load(&self) -> Result<Option<Credential>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cached token");
                return Ok(None);
            }
            Err(e) => return Err(Error::file(&self.path, e)),
        };

        let header: VersionHeader = serde_json::from_str(&content)?;
        if header.version != CACHE_VERSION {
            return Err(Error::UnsupportedCacheVersion {
                found: header.version,
                expected: CACHE_VERSION,
            });
        }

        let record: CacheRecord = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), "Loaded cached token");
        Ok(Some(record.credential))
    }

    /// Replaces the cache with `credential`, creating parent directories
    /// as needed.
    ///
    /// The record is written to a temporary file in the same directory,
    /// restricted to the owner and renamed over the cache, so readers see
    /// either the old record or the new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| Error::file(dir, e))?;

        let record = CacheRecord {
            version: CACHE_VERSION,
            credential: credential.clone(),
        };
        let content = serde_json::to_string_pretty(&record)?;

        let mut file = NamedTempFile::new_in(dir).map_err(|e| Error::file(dir, e))?;
        restrict_to_owner(file.as_file()).map_err(|e| Error::file(&self.path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| Error::file(&self.path, e))?;
        file.as_file()
            .sync_all()
            .map_err(|e| Error::file(&self.path, e))?;
        file.persist(&self.path)
            .map_err(|e| Error::file(&self.path, e.error))?;

        debug!(path = %self.path.display(), "Saved token cache");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_to_owner(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::token::Token;
    use chrono::{Duration, Utc};

    fn credential() -> Credential {
        Credential {
            token: Token::new("ya29.a", "Bearer")
                .with_refresh_token("1//r")
                .with_expires_at(Utc::now() + Duration::hours(1))
                .with_scope("https://mail.google.com/"),
            client_id: "cid".into(),
            client_secret: Some("cs".into()),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        }
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("gmail_token.json"));
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("nested/.gmail/gmail_token.json"));
        let credential = credential();

        cache.save(&credential).unwrap();
        assert_eq!(cache.load().unwrap(), Some(credential));
    }

    #[test]
    fn test_saved_record_is_versioned() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        cache.save(&credential()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
        assert_eq!(json["version"], CACHE_VERSION);
        assert_eq!(json["token"]["access_token"], "ya29.a");
        assert_eq!(json["client_id"], "cid");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, r#"{"version": 7, "anything": true}"#).unwrap();

        let err = TokenCache::new(&path).load().unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedCacheVersion { found: 7, expected: CACHE_VERSION }
        ));
    }

    #[test]
    fn test_garbage_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, b"\x80\x04\x95 not json").unwrap();

        assert!(TokenCache::new(&path).load().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        cache.save(&credential()).unwrap();

        let mode = fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_tightens_existing_world_readable_cache() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let cache = TokenCache::new(&path);
        let credential = credential();
        cache.save(&credential).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(cache.load().unwrap(), Some(credential));
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        cache.save(&credential()).unwrap();
        cache.save(&credential()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("token.json")]);
    }
}
