//! On-disk cache of the session cookies.
//!
//! A fresh process can reuse the cookies of the previous run and skip one
//! bootstrap. The file is advisory: a missing or unreadable cache only costs a
//! bootstrap.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default cache location, relative to the working directory.
pub const DEFAULT_COOKIE_CACHE: &str = ".nse/cookies.json";

#[derive(Debug, Serialize, Deserialize)]
struct CachedCookies {
    cookies: Vec<String>,
    saved_at: DateTime<Utc>,
}

/// JSON file holding `name=value` cookie pairs and the time they were saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieCache {
    path: PathBuf,
}

impl CookieCache {
    /// Cache backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached cookies.
    ///
    /// # Errors
    /// Returns `CookieCache` if the file is missing or not valid JSON.
    pub fn load(&self) -> Result<(Vec<String>, DateTime<Utc>), Error> {
        let data = fs::read_to_string(&self.path)
            .map_err(|e| Error::CookieCache(format!("{}: {e}", self.path.display())))?;
        let cached: CachedCookies = serde_json::from_str(&data)
            .map_err(|e| Error::CookieCache(format!("{}: {e}", self.path.display())))?;
        Ok((cached.cookies, cached.saved_at))
    }

    /// Overwrites the cache, creating parent directories.
    ///
    /// # Errors
    /// Returns `CookieCache` if the file cannot be written.
    pub fn store(&self, cookies: &[String]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::CookieCache(format!("{}: {e}", parent.display())))?;
        }
        let cached = CachedCookies {
            cookies: cookies.to_vec(),
            saved_at: Utc::now(),
        };
        let data = serde_json::to_string_pretty(&cached)
            .map_err(|e| Error::CookieCache(e.to_string()))?;
        fs::write(&self.path, data)
            .map_err(|e| Error::CookieCache(format!("{}: {e}", self.path.display())))
    }
}
