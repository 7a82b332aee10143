use async_trait::async_trait;
use thiserror::Error;

use super::types::{
    ContentRecord, CourseId, ExternalFile, ModuleDescriptor, ModuleId, UpdateSignature,
};
use crate::content::ServiceError;
use crate::download::{DownloadError, DownloadSummary};

/// Handler errors
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("module download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("content service failed: {0}")]
    Content(#[from] ServiceError),
}

/// Prefetch handler for one content type
///
/// The coordinator looks handlers up by [`mod_name`](Self::mod_name) and drives
/// them through this contract. `get_intro_files` cannot fail; every other
/// operation surfaces only the failures that matter for an offline copy.
#[async_trait]
pub trait PrefetchHandler: Send + Sync {
    /// Unique handler name
    fn name(&self) -> &str;

    /// Content type served (e.g. `book`)
    fn mod_name(&self) -> &str;

    /// Namespace for stored files and cache entries
    fn component(&self) -> &str;

    /// Update events that invalidate this handler's cached content
    fn update_signature(&self) -> &UpdateSignature;

    /// Download every file of the module and warm type-specific metadata.
    ///
    /// `prefetch` only changes scheduling priority downstream.
    async fn download_or_prefetch(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
        prefetch: bool,
    ) -> Result<(), HandlerError>;

    /// Files shown in the module preview
    async fn get_intro_files(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
    ) -> Vec<ExternalFile>;

    /// Mark cached data of one module stale
    async fn invalidate_content(
        &self,
        module_id: ModuleId,
        course_id: CourseId,
    ) -> Result<(), HandlerError>;

    /// Whether the content type is enabled on the connected site
    async fn is_enabled(&self) -> Result<bool, HandlerError>;
}

/// Site-backed metadata service for one content type
#[async_trait]
pub trait ContentService: Send + Sync {
    async fn fetch_content(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<ContentRecord, ServiceError>;

    /// Idempotent; affects only the given (module, course) pair
    async fn invalidate(&self, module_id: ModuleId, course_id: CourseId) -> Result<(), ServiceError>;

    async fn is_plugin_enabled(&self) -> Result<bool, ServiceError>;
}

/// Generic file download machinery shared by resource handlers
#[async_trait]
pub trait ModuleDownloader: Send + Sync {
    async fn download_files(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
        component: &str,
        files: Vec<ExternalFile>,
        prefetch: bool,
    ) -> Result<DownloadSummary, DownloadError>;
}
