use async_trait::async_trait;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

use super::resource::ResourcePrefetch;
use super::suppress::ignore_errors;
use super::traits::{ContentService, HandlerError, ModuleDownloader, PrefetchHandler};
use super::types::{CourseId, ExternalFile, ModuleDescriptor, ModuleId, UpdateSignature};
use crate::observability::Metrics;

pub const BOOK_COMPONENT: &str = "mmaModBook";

static BOOK_UPDATES: LazyLock<UpdateSignature> = LazyLock::new(|| {
    UpdateSignature::new("^configuration$|^.*files$|^entries$")
        .expect("book update signature is valid")
});

/// Prefetch handler for books
///
/// A book's offline copy is its chapter files plus intro files. The book
/// metadata endpoint is missing on some site versions, so that fetch is only
/// ever used as a best-effort enrichment.
pub struct BookPrefetchHandler {
    base: ResourcePrefetch,
    content: Arc<dyn ContentService>,
    metrics: Arc<Metrics>,
}

impl BookPrefetchHandler {
    pub const NAME: &'static str = "AddonModBook";
    pub const MOD_NAME: &'static str = "book";

    pub fn new(
        downloader: Arc<dyn ModuleDownloader>,
        content: Arc<dyn ContentService>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            base: ResourcePrefetch::new(BOOK_COMPONENT, downloader),
            content,
            metrics,
        }
    }
}

#[async_trait]
impl PrefetchHandler for BookPrefetchHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn mod_name(&self) -> &str {
        Self::MOD_NAME
    }

    fn component(&self) -> &str {
        self.base.component()
    }

    fn update_signature(&self) -> &UpdateSignature {
        &BOOK_UPDATES
    }

    async fn download_or_prefetch(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
        prefetch: bool,
    ) -> Result<(), HandlerError> {
        let files = self
            .base
            .download_module_files_and_intro(module, course_id, prefetch);
        let book = ignore_errors(self.content.fetch_content(course_id, module.id()));

        let (files, book) = tokio::join!(files, book);

        if book.is_none() {
            self.metrics.optional_fetch_absorbed();
        }
        let summary = files?;

        info!(
            module_id = module.id(),
            course_id,
            prefetch,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            metadata = book.is_some(),
            "Book downloaded"
        );

        Ok(())
    }

    async fn get_intro_files(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
    ) -> Vec<ExternalFile> {
        let book = ignore_errors(self.content.fetch_content(course_id, module.id())).await;
        if book.is_none() {
            self.metrics.optional_fetch_absorbed();
            debug!(
                module_id = module.id(),
                course_id, "Resolving intro files from module data only"
            );
        }

        ResourcePrefetch::resolve_intro_files(module, book.as_ref())
    }

    async fn invalidate_content(
        &self,
        module_id: ModuleId,
        course_id: CourseId,
    ) -> Result<(), HandlerError> {
        self.content.invalidate(module_id, course_id).await?;
        self.metrics.invalidation();
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool, HandlerError> {
        Ok(self.content.is_plugin_enabled().await?)
    }
}
