use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::http::HttpClient;
use super::{DownloadError, DownloadSummary};
use crate::cache::{CacheStore, FileEntry};
use crate::cache::store::now_secs;
use crate::config::ByteSize;
use crate::handlers::{CourseId, ExternalFile, ModuleDescriptor, ModuleDownloader, ModuleId};
use crate::observability::Metrics;
use crate::storage::StorageClient;

/// Downloads module files into storage and keeps the file index current
pub struct FileDownloader {
    http: HttpClient,
    storage: StorageClient,
    cache: CacheStore,
    token: Option<String>,
    max_file_bytes: ByteSize,
    metrics: Arc<Metrics>,
}

impl FileDownloader {
    pub fn new(
        http: HttpClient,
        storage: StorageClient,
        cache: CacheStore,
        token: Option<String>,
        max_file_bytes: ByteSize,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            http,
            storage,
            cache,
            token,
            max_file_bytes,
            metrics,
        }
    }

    /// URL to request for a site file.
    ///
    /// With a token, `pluginfile.php` links go through the web-service
    /// variant and carry the token as a query parameter.
    pub fn request_url(&self, fileurl: &str) -> Result<Url, DownloadError> {
        let mut url =
            Url::parse(fileurl).map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", fileurl, e)))?;

        let Some(token) = &self.token else {
            return Ok(url);
        };
        if !url.path().contains("/pluginfile.php") {
            return Ok(url);
        }

        if !url.path().contains("/webservice/pluginfile.php") {
            let path = url.path().replacen("/pluginfile.php", "/webservice/pluginfile.php", 1);
            url.set_path(&path);
        }
        url.query_pairs_mut().append_pair("token", token);

        Ok(url)
    }

    /// Object key: `{component}/{course_id}/{module_id}/{storage_name}`
    pub fn storage_key(
        component: &str,
        course_id: CourseId,
        module_id: ModuleId,
        file: &ExternalFile,
    ) -> String {
        format!(
            "{}/{}/{}/{}",
            component,
            course_id,
            module_id,
            file.storage_name()
        )
    }

    fn check_size(&self, file: &ExternalFile, size: u64) -> Result<(), DownloadError> {
        let limit = self.max_file_bytes.as_u64();
        if size > limit {
            return Err(DownloadError::TooLarge {
                url: file.fileurl.clone(),
                size,
                limit,
            });
        }
        Ok(())
    }

    async fn is_up_to_date(
        &self,
        component: &str,
        course_id: CourseId,
        module_id: ModuleId,
        file: &ExternalFile,
    ) -> Result<bool, DownloadError> {
        match self
            .cache
            .file_entry(component, course_id, module_id, &file.fileurl)?
        {
            Some(entry) if entry.is_current(file.timemodified) => {
                Ok(self.storage.exists(&entry.storage_key).await?)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ModuleDownloader for FileDownloader {
    async fn download_files(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
        component: &str,
        files: Vec<ExternalFile>,
        prefetch: bool,
    ) -> Result<DownloadSummary, DownloadError> {
        let module_id = module.id();
        let mut summary = DownloadSummary::default();
        let mut seen = HashSet::new();

        for file in files {
            if !seen.insert(file.fileurl.clone()) {
                continue;
            }

            if self.is_up_to_date(component, course_id, module_id, &file).await? {
                debug!(module_id, url = %file.fileurl, "File unchanged, skipping");
                summary.skipped += 1;
                self.metrics.file_skipped();
                continue;
            }

            if let Some(size) = file.filesize {
                self.check_size(&file, size)?;
            }

            let url = self.request_url(&file.fileurl)?;
            let bytes = self.http.download(url.as_str(), &file.fileurl).await?;
            let size = bytes.len() as u64;
            self.check_size(&file, size)?;

            let storage_key = Self::storage_key(component, course_id, module_id, &file);
            self.storage.put(&storage_key, bytes).await?;

            self.cache.record_file(
                component,
                course_id,
                module_id,
                &FileEntry {
                    url: file.fileurl.clone(),
                    storage_key,
                    timemodified: file.timemodified,
                    size,
                    downloaded_at: now_secs(),
                    prefetched: prefetch,
                    stale: false,
                    stale_since: None,
                },
            )?;

            summary.downloaded += 1;
            summary.bytes += size;
            self.metrics.file_downloaded();
        }

        info!(
            module_id,
            course_id,
            component,
            prefetch,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            size = %ByteSize(summary.bytes),
            "Module files stored"
        );

        Ok(summary)
    }
}
