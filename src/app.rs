use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::cache::{CacheError, CacheStore};
use crate::config::Config;
use crate::content::BookService;
use crate::coordinator::PrefetchCoordinator;
use crate::download::{DownloadError, FileDownloader, HttpClient};
use crate::handlers::{BookPrefetchHandler, HandlerRegistry};
use crate::observability::Metrics;
use crate::storage::{StorageClient, StorageError};
use crate::ws::{WsClient, WsError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("cache setup failed: {0}")]
    Cache(#[from] CacheError),
    #[error("storage setup failed: {0}")]
    Storage(#[from] StorageError),
    #[error("web service client setup failed: {0}")]
    Ws(#[from] WsError),
    #[error("download client setup failed: {0}")]
    Download(#[from] DownloadError),
}

/// Process-wide wiring: every handler and collaborator is built once here
#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub ws: WsClient,
    pub cache: CacheStore,
    pub registry: Arc<HandlerRegistry>,
    pub coordinator: PrefetchCoordinator,
    pub metrics: Arc<Metrics>,
}

impl App {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let metrics = Arc::new(Metrics::new());
        let cache = CacheStore::open(&config.cache.path)?;
        let storage = StorageClient::from_config(&config.storage)?;
        let ws = WsClient::new(&config.site.url, config.site.token.clone(), &config.http)?;

        let downloader = Arc::new(FileDownloader::new(
            HttpClient::new(&config.http)?,
            storage,
            cache.clone(),
            ws.token().map(str::to_string),
            config.download.max_file_bytes,
            metrics.clone(),
        ));

        let mut registry = HandlerRegistry::new();
        if config.handler_enabled(BookPrefetchHandler::MOD_NAME) {
            let books = Arc::new(BookService::new(ws.clone(), cache.clone()));
            registry.register(Arc::new(BookPrefetchHandler::new(
                downloader,
                books,
                metrics.clone(),
            )));
        }
        info!(handlers = registry.len(), site = %ws.site_url(), "Application ready");

        let registry = Arc::new(registry);
        let coordinator = PrefetchCoordinator::new(registry.clone(), metrics.clone());

        Ok(Self {
            config: Arc::new(config),
            ws,
            cache,
            registry,
            coordinator,
            metrics,
        })
    }
}
