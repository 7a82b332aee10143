//! Site-backed content services
//!
//! A content service fetches type-specific metadata for a module, answers
//! whether the type is enabled on the site and invalidates what it cached.

mod book;

pub use book::{BookService, GET_BOOKS_FUNCTION};

use thiserror::Error;

use crate::cache::CacheError;
use crate::handlers::{CourseId, ModuleId};
use crate::ws::WsError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no content for module {module_id} in course {course_id}")]
    NotFound {
        course_id: CourseId,
        module_id: ModuleId,
    },

    #[error("web service error: {0}")]
    Ws(#[from] WsError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("malformed cached content: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ServiceError {
    /// The site does not offer the endpoint at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ServiceError::Ws(e) if e.is_unavailable())
    }
}
