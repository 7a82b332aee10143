use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

use super::error::Result;
use super::keys::{encode_file_key, encode_file_prefix, encode_response_key};
use super::pruning::{PruneStats, prune_stale};
use crate::handlers::{CourseId, ModuleId};

/// Cached web-service reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub value: Value,
    pub cached_at: i64,
    #[serde(default)]
    pub stale: bool,
    #[serde(default)]
    pub stale_since: Option<i64>,
}

/// Index entry for a downloaded module file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub url: String,
    pub storage_key: String,
    pub timemodified: Option<i64>,
    pub size: u64,
    pub downloaded_at: i64,
    #[serde(default)]
    pub prefetched: bool,
    #[serde(default)]
    pub stale: bool,
    #[serde(default)]
    pub stale_since: Option<i64>,
}

impl FileEntry {
    /// Still usable for a file with the given modification time
    pub fn is_current(&self, timemodified: Option<i64>) -> bool {
        !self.stale && self.timemodified == timemodified
    }
}

pub(crate) fn now_secs() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Fjall-backed cache for web-service replies and the downloaded-file index
#[derive(Clone)]
pub struct CacheStore {
    keyspace: Keyspace,
    responses: PartitionHandle,
    files: PartitionHandle,
    metadata: PartitionHandle,
}

impl CacheStore {
    /// Open or create a cache at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening cache at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let responses = keyspace.open_partition("responses", PartitionCreateOptions::default())?;
        let files = keyspace.open_partition("files", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            responses,
            files,
            metadata,
        })
    }

    pub fn get_response(&self, cache_key: &str) -> Result<Option<CachedEntry>> {
        match self.responses.get(encode_response_key(cache_key))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Store a fresh reply, replacing any stale one
    pub fn put_response(&self, cache_key: &str, value: &Value) -> Result<()> {
        let entry = CachedEntry {
            value: value.clone(),
            cached_at: now_secs(),
            stale: false,
            stale_since: None,
        };
        self.responses
            .insert(encode_response_key(cache_key), serde_json::to_vec(&entry)?)?;
        debug!(cache_key, "Cached response");
        Ok(())
    }

    /// Mark a reply stale. Returns whether an entry existed.
    ///
    /// The stale value is kept so it can still be served when the site is
    /// unreachable.
    pub fn invalidate_response(&self, cache_key: &str) -> Result<bool> {
        let key = encode_response_key(cache_key);
        let Some(raw) = self.responses.get(&key)? else {
            return Ok(false);
        };

        let mut entry: CachedEntry = serde_json::from_slice(&raw)?;
        if !entry.stale {
            entry.stale = true;
            entry.stale_since = Some(now_secs());
            self.responses.insert(key, serde_json::to_vec(&entry)?)?;
        }
        debug!(cache_key, "Invalidated response");
        Ok(true)
    }

    pub fn record_file(
        &self,
        component: &str,
        course_id: CourseId,
        module_id: ModuleId,
        entry: &FileEntry,
    ) -> Result<()> {
        let key = encode_file_key(component, course_id, module_id, &entry.url);
        self.files.insert(key, serde_json::to_vec(entry)?)?;
        Ok(())
    }

    pub fn file_entry(
        &self,
        component: &str,
        course_id: CourseId,
        module_id: ModuleId,
        url: &str,
    ) -> Result<Option<FileEntry>> {
        match self
            .files
            .get(encode_file_key(component, course_id, module_id, url))?
        {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All indexed files of one module in one course
    pub fn files_for(
        &self,
        component: &str,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        for item in self
            .files
            .prefix(encode_file_prefix(component, course_id, module_id))
        {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }

    /// Mark every file of one module in one course stale. Returns how many
    /// changed.
    pub fn invalidate_files(
        &self,
        component: &str,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<usize> {
        let now = now_secs();
        let mut changed = Vec::new();

        for item in self
            .files
            .prefix(encode_file_prefix(component, course_id, module_id))
        {
            let (key, value) = item?;
            let mut entry: FileEntry = serde_json::from_slice(&value)?;
            if !entry.stale {
                entry.stale = true;
                entry.stale_since = Some(now);
                changed.push((key, entry));
            }
        }

        for (key, entry) in &changed {
            self.files.insert(key.clone(), serde_json::to_vec(entry)?)?;
        }

        debug!(
            component,
            course_id,
            module_id,
            count = changed.len(),
            "Invalidated module files"
        );
        Ok(changed.len())
    }

    /// Remove stale entries that have been stale for longer than `retention_days`
    pub fn prune_stale(&self, retention_days: u32) -> Result<PruneStats> {
        info!(retention_days, "Pruning stale cache entries");
        let stats = prune_stale(
            &self.keyspace,
            &self.responses,
            &self.files,
            &self.metadata,
            retention_days,
        )?;
        info!("Pruning completed: {:?}", stats);
        Ok(stats)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();

        for item in self.responses.iter() {
            let (_, value) = item?;
            let entry: CachedEntry = serde_json::from_slice(&value)?;
            stats.response_count += 1;
            if entry.stale {
                stats.stale_responses += 1;
            }
        }

        for item in self.files.iter() {
            let (_, value) = item?;
            let entry: FileEntry = serde_json::from_slice(&value)?;
            stats.file_count += 1;
            if entry.stale {
                stats.stale_files += 1;
            }
        }

        Ok(stats)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub response_count: usize,
    pub stale_responses: usize,
    pub file_count: usize,
    pub stale_files: usize,
}
