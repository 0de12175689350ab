//! Versioned cache of the world content database.
//!
//! Bungie publishes static definitions (activities, modes, classes) as a
//! per-locale zipped SQLite database. The cache keeps exactly one extracted
//! copy on disk, replaces it wholesale when the manifest advertises a new
//! archive, and serves keyed lookups against it without any network I/O.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::de::DeserializeOwned;

use crate::archive::ArchiveError;
use crate::bungie::{BungieApi, BungieError};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("manifest fetch failed: {0}")]
    Manifest(#[source] BungieError),

    #[error("manifest has no world content for locale {0:?}")]
    MissingLocale(String),

    #[error("manifest advertised an unusable world content path {0:?}")]
    BadArchivePath(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("cache write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("no world content database cached yet")]
    NotCached,

    #[error("world content database error: {0}")]
    Table(#[from] rusqlite::Error),

    #[error("no {table} row for id {id}")]
    RecordNotFound { table: &'static str, id: i32 },

    #[error("failed to decode {table} row {id}: {source}")]
    Decode {
        table: &'static str,
        id: i32,
        #[source]
        source: serde_json::Error,
    },
}

pub struct ManifestCache {
    api: Arc<dyn BungieApi>,
    dir: PathBuf,
    locale: String,
    /// Basename of the database `ensure_fresh` last confirmed or installed.
    /// Lookups prefer it over a directory scan, so a superseded file whose
    /// delete failed can never be served by accident.
    current: Mutex<Option<String>>,
}

impl ManifestCache {
    pub fn new(api: Arc<dyn BungieApi>, dir: PathBuf, locale: String) -> Self {
        Self {
            api,
            dir,
            locale,
            current: Mutex::new(None),
        }
    }

    /// Check the manifest and replace the cached database if it is stale.
    ///
    /// A cache hit costs one manifest call and a directory listing. On a
    /// miss the new archive entry is extracted next to the old file and
    /// renamed into place before the old one is deleted, so a concurrent
    /// reader holding the old file open keeps reading consistent data.
    /// Deleting superseded files is best-effort: lookups open by exact
    /// name, so a stale leftover is tolerable and only logged.
    pub async fn ensure_fresh(&self) -> Result<(), CacheError> {
        let manifest = self.api.get_manifest().await.map_err(CacheError::Manifest)?;

        let remote_path = manifest
            .mobile_world_content_paths
            .get(&self.locale)
            .ok_or_else(|| CacheError::MissingLocale(self.locale.clone()))?;

        let file_name = Path::new(remote_path)
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| CacheError::BadArchivePath(remote_path.clone()))?;

        let target = self.dir.join(file_name);
        if target.exists() {
            tracing::debug!("world content {} is current", file_name);
            *self.current.lock() = Some(file_name.to_owned());
            return Ok(());
        }

        fs::create_dir_all(&self.dir).map_err(CacheError::Write)?;

        tracing::info!("downloading world content {}", file_name);
        let mut archive = self.api.get_content_archive(remote_path).await?;

        let staging = self.dir.join(format!("{file_name}.part"));
        let result = (|| {
            let mut out = fs::File::create(&staging).map_err(CacheError::Write)?;
            let written = archive.extract_entry(file_name, &mut out)?;
            out.sync_all().map_err(CacheError::Write)?;
            tracing::debug!("extracted {} bytes to {}", written, staging.display());
            Ok(())
        })();
        if let Err(e) = result {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        fs::rename(&staging, &target).map_err(CacheError::Write)?;
        tracing::info!("world content {} installed", file_name);
        *self.current.lock() = Some(file_name.to_owned());

        self.remove_superseded(file_name);
        Ok(())
    }

    fn remove_superseded(&self, keep: &str) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_name().and_then(OsStr::to_str) == Some(keep) {
                continue;
            }
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(
                    "failed to remove superseded cache file {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    /// The current database: the name `ensure_fresh` confirmed, or failing
    /// that whatever the directory holds. No metadata is stored anywhere.
    fn current_database(&self) -> Result<PathBuf, CacheError> {
        if let Some(name) = self.current.lock().as_deref() {
            let path = self.dir.join(name);
            if path.is_file() {
                return Ok(path);
            }
        }

        let entries = fs::read_dir(&self.dir).map_err(|_| CacheError::NotCached)?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "content") {
                return Ok(path);
            }
        }
        Err(CacheError::NotCached)
    }

    /// Look up one record by table and hash. Local disk only; freshness is
    /// solely `ensure_fresh`'s concern.
    ///
    /// The API reports hashes as unsigned 32-bit values while the database
    /// keys rows by their two's-complement signed reinterpretation, so the
    /// hash is normalized before the query.
    pub fn lookup<T: DeserializeOwned>(&self, table: &'static str, hash: u32) -> Result<T, CacheError> {
        let database = self.current_database()?;
        let conn = Connection::open_with_flags(&database, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        #[allow(clippy::cast_possible_wrap)]
        let id = hash as i32;

        let row: Option<Vec<u8>> = conn
            .query_row(
                &format!("SELECT json FROM {table} WHERE id = ?1"),
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let json = row.ok_or(CacheError::RecordNotFound { table, id })?;
        serde_json::from_slice(&json).map_err(|source| CacheError::Decode { table, id, source })
    }
}
