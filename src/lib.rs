pub mod app;
pub mod cache;
pub mod config;
pub mod content;
pub mod coordinator;
pub mod download;
pub mod handlers;
pub mod observability;
pub mod storage;
pub mod ws;
