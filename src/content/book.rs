use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::ServiceError;
use crate::cache::CacheStore;
use crate::handlers::{BOOK_COMPONENT, ContentRecord, ContentService, CourseId, ModuleId};
use crate::ws::{SiteInfo, WsClient, WsWarning};

pub const GET_BOOKS_FUNCTION: &str = "mod_book_get_books_by_courses";

#[derive(Debug, Deserialize)]
struct BooksReply {
    #[serde(default)]
    books: Vec<ContentRecord>,
    #[serde(default)]
    warnings: Vec<WsWarning>,
}

/// Book metadata service
///
/// Records are cached per (course, module), filled from one listing call per
/// course. When the site cannot be reached a stale cached record is served
/// instead of failing.
pub struct BookService {
    ws: WsClient,
    cache: CacheStore,
    site_info: OnceCell<SiteInfo>,
}

impl BookService {
    pub fn new(ws: WsClient, cache: CacheStore) -> Self {
        Self {
            ws,
            cache,
            site_info: OnceCell::new(),
        }
    }

    pub fn cache_key(course_id: CourseId, module_id: ModuleId) -> String {
        format!("{}:book:{}:{}", BOOK_COMPONENT, course_id, module_id)
    }

    /// Fetch the course's book listing and cache every book in it.
    ///
    /// The site only lists books per course, so one call fills the cache
    /// for all books of the course and later modules are served locally.
    async fn fetch_from_site(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<ContentRecord, ServiceError> {
        let reply: BooksReply = self
            .ws
            .call(
                GET_BOOKS_FUNCTION,
                &[("courseids[0]".to_string(), course_id.to_string())],
            )
            .await?;

        for warning in &reply.warnings {
            debug!(
                course_id,
                code = %warning.warningcode,
                message = %warning.message,
                "Book listing warning"
            );
        }

        let mut requested = None;
        for book in reply.books.into_iter().filter(|b| b.course == course_id) {
            self.cache.put_response(
                &Self::cache_key(course_id, book.coursemodule),
                &serde_json::to_value(&book)?,
            )?;
            if book.coursemodule == module_id {
                requested = Some(book);
            }
        }
        debug!(course_id, "Cached course book listing");

        requested.ok_or(ServiceError::NotFound {
            course_id,
            module_id,
        })
    }
}

#[async_trait]
impl ContentService for BookService {
    async fn fetch_content(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<ContentRecord, ServiceError> {
        let key = Self::cache_key(course_id, module_id);
        let cached = self.cache.get_response(&key)?;

        if let Some(entry) = &cached {
            if !entry.stale {
                debug!(course_id, module_id, "Book served from cache");
                return Ok(serde_json::from_value(entry.value.clone())?);
            }
        }

        let error = match self.fetch_from_site(course_id, module_id).await {
            Ok(record) => return Ok(record),
            Err(e) => e,
        };

        match cached {
            Some(entry) if !error.is_unavailable() => {
                warn!(course_id, module_id, error = %error, "Site unreachable, serving stale book");
                Ok(serde_json::from_value(entry.value)?)
            }
            _ => Err(error),
        }
    }

    async fn invalidate(&self, module_id: ModuleId, course_id: CourseId) -> Result<(), ServiceError> {
        let had_record = self
            .cache
            .invalidate_response(&Self::cache_key(course_id, module_id))?;
        let files = self
            .cache
            .invalidate_files(BOOK_COMPONENT, course_id, module_id)?;

        debug!(module_id, course_id, had_record, files, "Book invalidated");
        Ok(())
    }

    async fn is_plugin_enabled(&self) -> Result<bool, ServiceError> {
        let info = self
            .site_info
            .get_or_try_init(|| self.ws.get_site_info())
            .await?;
        Ok(info.can_download_files())
    }
}
