//! Site web-service access
//!
//! Thin typed layer over the REST endpoint. Caching lives in
//! [`crate::cache`]; this module only talks to the network.

mod client;
mod error;
mod models;

pub use client::WsClient;
pub use error::{Result, WsError};
pub use models::{CourseSection, SiteInfo, WsWarning};
