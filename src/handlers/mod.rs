//! Prefetch handlers
//!
//! Each content type plugs into the offline coordinator through a
//! [`PrefetchHandler`]. Handlers are constructed once at startup and looked up
//! by content type in a [`HandlerRegistry`].
//!
//! ## Key Components
//!
//! - [`PrefetchHandler`] - Contract every content type implements
//! - [`ResourcePrefetch`] - Shared file download and intro resolution
//! - [`BookPrefetchHandler`] - Handler for books
//! - [`ignore_errors`] - Turns an optional fetch failure into `None`
//!
//! ## Example
//!
//! ```rust,ignore
//! use coursefetch::handlers::HandlerRegistry;
//!
//! let handler = registry.get(module.modname())?;
//! if handler.is_enabled().await? {
//!     handler.download_or_prefetch(&module, course_id, true).await?;
//! }
//! ```

mod book;
mod registry;
mod resource;
mod suppress;
mod traits;
pub(crate) mod types;

pub use book::{BOOK_COMPONENT, BookPrefetchHandler};
pub use registry::{HandlerRegistry, RegistryError};
pub use resource::ResourcePrefetch;
pub use suppress::ignore_errors;
pub use traits::{ContentService, HandlerError, ModuleDownloader, PrefetchHandler};
pub use types::{
    ContentRecord, CourseId, ExternalFile, ModuleContent, ModuleDescriptor, ModuleId,
    UpdateSignature, files_in_html,
};
