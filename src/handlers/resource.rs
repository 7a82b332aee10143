use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::traits::ModuleDownloader;
use super::types::{ContentRecord, CourseId, ExternalFile, ModuleDescriptor, files_in_html};
use crate::download::{DownloadError, DownloadSummary};

/// Shared behaviour of resource-like handlers
///
/// A resource handler's offline copy is the module's content files plus its
/// intro files. Type-specific handlers compose this with their own fetches.
#[derive(Clone)]
pub struct ResourcePrefetch {
    component: String,
    downloader: Arc<dyn ModuleDownloader>,
}

impl ResourcePrefetch {
    pub fn new(component: impl Into<String>, downloader: Arc<dyn ModuleDownloader>) -> Self {
        Self {
            component: component.into(),
            downloader,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Every file needed for an offline copy, using descriptor data only
    pub fn module_files(&self, module: &ModuleDescriptor) -> Vec<ExternalFile> {
        let mut files = Self::resolve_intro_files(module, None);
        files.extend(module.content_files());
        dedup_by_url(files)
    }

    pub async fn download_module_files_and_intro(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
        prefetch: bool,
    ) -> Result<DownloadSummary, DownloadError> {
        let files = self.module_files(module);
        debug!(
            module_id = module.id(),
            course_id,
            files = files.len(),
            prefetch,
            "Downloading module files"
        );

        self.downloader
            .download_files(module, course_id, &self.component, files, prefetch)
            .await
    }

    /// Merge the intro files known from the descriptor with those of the full
    /// record, when one is available.
    ///
    /// Order: descriptor intro files, record intro files, then files embedded in
    /// the intro HTML. Duplicates (same URL) keep their first position.
    pub fn resolve_intro_files(
        module: &ModuleDescriptor,
        record: Option<&ContentRecord>,
    ) -> Vec<ExternalFile> {
        let mut files: Vec<ExternalFile> = module.intro_files().to_vec();

        if let Some(record) = record {
            if let Some(introfiles) = &record.introfiles {
                files.extend(introfiles.iter().cloned());
            }
        }

        if let Some(html) = module.description() {
            files.extend(files_in_html(html));
        }
        if let Some(html) = record.and_then(|r| r.intro.as_deref()) {
            files.extend(files_in_html(html));
        }

        dedup_by_url(files)
    }
}

fn dedup_by_url(files: Vec<ExternalFile>) -> Vec<ExternalFile> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|file| seen.insert(file.fileurl.clone()))
        .collect()
}
