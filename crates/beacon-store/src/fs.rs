//! Filesystem-backed document store.
//!
//! Layout under the store root:
//! - `.beacon/store.yml`: store metadata
//! - `records/<name>/record.yml`: one directory per source key
//! - `preferences/<name>.yml`: recipient preferences
//! - `deliveries.ndjson`: append-only delivery log
//! - `feed/<name>.ndjson`: append-only in-app feed per user
//!
//! `<name>` is the slug of the key followed by a digest of the exact key, so
//! keys that slug alike still get their own files. File IO runs on the
//! blocking pool.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::store::{DeliveryLog, FeedStore, PreferenceStore, RecordStore};
use async_trait::async_trait;
use beacon_core::{DeliveryLogEntry, DerivedRecord, FeedEntry, RecipientPreference};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use slug::slugify;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Directory name for store metadata.
const BEACON_DIR: &str = ".beacon";
/// Metadata file name.
const CONFIG_FILE: &str = "store.yml";
const RECORDS_DIR: &str = "records";
const RECORD_FILE: &str = "record.yml";
const PREFERENCES_DIR: &str = "preferences";
const FEED_DIR: &str = "feed";
const DELIVERIES_FILE: &str = "deliveries.ndjson";

/// Prefix of staging entries; names produced by `file_name` never start with it.
const STAGING_PREFIX: &str = ".tmp-";
const SLUG_MAX: usize = 48;
const DIGEST_CHARS: usize = 16;

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// On-disk name for a key: readable slug plus a digest of the exact key.
fn file_name(key: &str) -> String {
    let slug: String = slugify(key).chars().take(SLUG_MAX).collect();
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("{slug}-{}", &digest[..DIGEST_CHARS])
}

fn staging_name(label: &str) -> String {
    format!(
        "{STAGING_PREFIX}{}-{}-{label}",
        std::process::id(),
        STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Run blocking file IO off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
}

/// Paths and synchronous operations under a store root.
#[derive(Debug, Clone)]
struct Layout {
    root: PathBuf,
}

impl Layout {
    fn records_dir(&self) -> PathBuf {
        self.root.join(RECORDS_DIR)
    }

    fn record_dir(&self, source_key: &str) -> PathBuf {
        self.records_dir().join(file_name(source_key))
    }

    fn preference_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join(PREFERENCES_DIR)
            .join(format!("{}.yml", file_name(user_id)))
    }

    fn feed_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join(FEED_DIR)
            .join(format!("{}.ndjson", file_name(user_id)))
    }

    fn deliveries_path(&self) -> PathBuf {
        self.root.join(DELIVERIES_FILE)
    }

    fn read_record(dir: &Path) -> Result<DerivedRecord> {
        let content = fs::read_to_string(dir.join(RECORD_FILE))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn find_record(&self, source_key: &str) -> Result<Option<DerivedRecord>> {
        let dir = self.record_dir(source_key);
        if !dir.join(RECORD_FILE).exists() {
            return Ok(None);
        }

        let record = Self::read_record(&dir)?;
        Ok((record.source_key == source_key).then_some(record))
    }

    /// Stage the record in a private directory, then rename it into place.
    ///
    /// Renaming a directory fails when the target holds a record and replaces
    /// it when the target is empty, so a key is either fully stored or free.
    fn insert_record(&self, record: &DerivedRecord) -> Result<()> {
        let records_dir = self.records_dir();
        fs::create_dir_all(&records_dir)?;

        let staging = records_dir.join(staging_name(&record.id));
        let staged = fs::create_dir(&staging)
            .map_err(StoreError::from)
            .and_then(|()| Ok(serde_yaml::to_string(record)?))
            .and_then(|yaml| Ok(fs::write(staging.join(RECORD_FILE), yaml)?));
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        match fs::rename(&staging, self.record_dir(&record.source_key)) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                match e.kind() {
                    ErrorKind::AlreadyExists | ErrorKind::DirectoryNotEmpty => {
                        Err(StoreError::Conflict(record.source_key.clone()))
                    }
                    _ => Err(e.into()),
                }
            }
        }
    }

    fn list_records(&self) -> Result<Vec<DerivedRecord>> {
        let records_dir = self.records_dir();
        if !records_dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&records_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir()
                || entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX)
            {
                continue;
            }

            match Self::read_record(&entry.path()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Failed to read record, skipping");
                }
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn get_preference(&self, user_id: &str) -> Result<Option<RecipientPreference>> {
        let path = self.preference_path(user_id);
        if !path.exists() {
            return Ok(None);
        }

        let preference: RecipientPreference = serde_yaml::from_str(&fs::read_to_string(&path)?)?;
        Ok((preference.user_id == user_id).then_some(preference))
    }

    fn put_preference(&self, preference: &RecipientPreference) -> Result<()> {
        let dir = self.root.join(PREFERENCES_DIR);
        fs::create_dir_all(&dir)?;

        let staging = dir.join(staging_name("pref"));
        let written = fs::write(&staging, serde_yaml::to_string(preference)?)
            .and_then(|()| fs::rename(&staging, self.preference_path(&preference.user_id)));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }
}

fn append_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let line = format!("{}\n", serde_json::to_string(value)?);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut values = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        values.push(serde_json::from_str(&line)?);
    }
    Ok(values)
}

/// A document store rooted at a directory.
#[derive(Debug)]
pub struct FsStore {
    layout: Layout,
    config: StoreConfig,
}

impl FsStore {
    /// Initialize a new store at the given path.
    ///
    /// # Errors
    /// Returns error if a store already exists or IO fails.
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let beacon_dir = root.join(BEACON_DIR);

        if beacon_dir.exists() {
            return Err(StoreError::StoreExists(root));
        }

        fs::create_dir_all(&beacon_dir)?;
        for dir in [RECORDS_DIR, PREFERENCES_DIR, FEED_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }

        let config = StoreConfig::default();
        fs::write(beacon_dir.join(CONFIG_FILE), serde_yaml::to_string(&config)?)?;

        info!(path = %root.display(), "Initialized store");

        Ok(Self {
            layout: Layout { root },
            config,
        })
    }

    /// Open an existing store.
    ///
    /// # Errors
    /// Returns error if the store doesn't exist or its metadata is invalid.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let config_path = root.join(BEACON_DIR).join(CONFIG_FILE);

        if !config_path.exists() {
            return Err(StoreError::StoreNotFound(root));
        }

        let config: StoreConfig = serde_yaml::from_str(&fs::read_to_string(&config_path)?)?;

        debug!(path = %root.display(), "Opened store");

        Ok(Self {
            layout: Layout { root },
            config,
        })
    }

    /// Open the store, initializing it first if needed.
    ///
    /// # Errors
    /// Returns error if IO fails.
    pub fn open_or_init(path: impl AsRef<Path>) -> Result<Self> {
        match Self::open(&path) {
            Err(StoreError::StoreNotFound(_)) => Self::init(path),
            other => other,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.layout.root
    }

    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }
}

#[async_trait]
impl RecordStore for FsStore {
    async fn find_by_source_key(&self, source_key: &str) -> Result<Option<DerivedRecord>> {
        let layout = self.layout.clone();
        let source_key = source_key.to_string();
        blocking(move || layout.find_record(&source_key)).await
    }

    async fn insert_record(&self, record: &DerivedRecord) -> Result<()> {
        let layout = self.layout.clone();
        let owned = record.clone();
        blocking(move || layout.insert_record(&owned)).await?;

        info!(source_key = %record.source_key, id = %record.id, "Stored derived record");
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<DerivedRecord>> {
        let layout = self.layout.clone();
        blocking(move || layout.list_records()).await
    }
}

#[async_trait]
impl PreferenceStore for FsStore {
    async fn get_preference(&self, user_id: &str) -> Result<Option<RecipientPreference>> {
        let layout = self.layout.clone();
        let user_id = user_id.to_string();
        blocking(move || layout.get_preference(&user_id)).await
    }

    async fn put_preference(&self, preference: &RecipientPreference) -> Result<()> {
        preference.validate()?;

        let layout = self.layout.clone();
        let owned = preference.clone();
        blocking(move || layout.put_preference(&owned)).await?;

        debug!(user_id = %preference.user_id, "Stored preference");
        Ok(())
    }
}

#[async_trait]
impl DeliveryLog for FsStore {
    async fn append_delivery(&self, entry: &DeliveryLogEntry) -> Result<()> {
        let path = self.layout.deliveries_path();
        let owned = entry.clone();
        blocking(move || append_line(&path, &owned)).await?;

        debug!(id = %entry.id, success = entry.success, "Appended delivery log entry");
        Ok(())
    }

    async fn recent_deliveries(&self, limit: usize) -> Result<Vec<DeliveryLogEntry>> {
        let path = self.layout.deliveries_path();
        let entries: Vec<DeliveryLogEntry> = blocking(move || read_lines(&path)).await?;
        Ok(entries.into_iter().rev().take(limit).collect())
    }
}

#[async_trait]
impl FeedStore for FsStore {
    async fn push_feed(&self, entry: &FeedEntry) -> Result<()> {
        let dir = self.layout.root.join(FEED_DIR);
        let path = self.layout.feed_path(&entry.user_id);
        let owned = entry.clone();
        blocking(move || {
            fs::create_dir_all(&dir)?;
            append_line(&path, &owned)
        })
        .await
    }

    async fn feed_for(&self, user_id: &str) -> Result<Vec<FeedEntry>> {
        let path = self.layout.feed_path(user_id);
        let entries: Vec<FeedEntry> = blocking(move || read_lines(&path)).await?;
        Ok(entries
            .into_iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .collect())
    }
}
