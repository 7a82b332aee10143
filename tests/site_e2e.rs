//! End-to-end tests against an embedded mock site
//!
//! The mock serves the web-service REST endpoint and `webservice/pluginfile.php`
//! on an ephemeral port, so the full path runs: site info, course listing,
//! book metadata, file download, storage and cache bookkeeping.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use bytes::Bytes;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use coursefetch::app::App;
use coursefetch::config::{Config, StorageProvider};
use coursefetch::content::BookService;
use coursefetch::coordinator::{ModuleOutcome, SkipReason};
use coursefetch::handlers::PrefetchHandler;

const TOKEN: &str = "secret";
const CHAPTER_HTML: &str = "<h1>Chapter 1</h1>";

/// Behaviour switches and call counters for the mock site
struct MockSite {
    base_url: String,
    books_available: bool,
    download_files: u8,
    second_book: bool,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockSite {
    fn hit(&self, name: &str) {
        *self.calls.lock().unwrap().entry(name.to_string()).or_default() += 1;
    }

    fn hits(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    fn site_info(&self) -> Value {
        json!({
            "sitename": "Mock School",
            "release": "3.5",
            "downloadfiles": self.download_files,
            "functions": [{"name": "core_course_get_contents", "version": "3.5"}]
        })
    }

    fn course_contents(&self) -> Value {
        let mut contents = self.first_section();
        if self.second_book {
            contents[0]["modules"]
                .as_array_mut()
                .unwrap()
                .push(json!({"id": 44, "name": "Glossary book", "modname": "book"}));
        }
        contents
    }

    fn first_section(&self) -> Value {
        json!([{
            "id": 1,
            "name": "Week 1",
            "modules": [
                {
                    "id": 42,
                    "name": "Handbook",
                    "modname": "book",
                    "contents": [
                        {"type": "content", "filename": "structure", "content": "[]"},
                        {
                            "type": "file",
                            "filename": "index.html",
                            "filepath": "/1/",
                            "fileurl": format!("{}/pluginfile.php/9/mod_book/chapter/1/index.html", self.base_url),
                            "filesize": CHAPTER_HTML.len(),
                            "timemodified": 1700000000
                        }
                    ]
                },
                {"id": 43, "name": "News", "modname": "forum"}
            ]
        }])
    }

    fn books(&self) -> Value {
        if !self.books_available {
            return json!({
                "exception": "moodle_exception",
                "errorcode": "invalidfunction",
                "message": "endpoint not found"
            });
        }
        let mut books = json!({
            "books": [{
                "id": 7,
                "coursemodule": 42,
                "course": 101,
                "name": "Handbook",
                "intro": format!(
                    "<p><img src=\"{}/pluginfile.php/9/mod_book/intro/cover.png\"></p>",
                    self.base_url
                ),
                "numbering": 1
            }],
            "warnings": []
        });
        if self.second_book {
            books["books"]
                .as_array_mut()
                .unwrap()
                .push(json!({"id": 8, "coursemodule": 44, "course": 101, "name": "Glossary book"}));
        }
        books
    }
}

async fn rest(
    State(site): State<Arc<MockSite>>,
    Form(params): Form<HashMap<String, String>>,
) -> Json<Value> {
    let function = params.get("wsfunction").cloned().unwrap_or_default();
    site.hit(&function);

    if params.get("wstoken").map(String::as_str) != Some(TOKEN) {
        return Json(json!({"exception": "moodle_exception", "errorcode": "invalidtoken", "message": "Invalid token"}));
    }

    Json(match function.as_str() {
        "core_webservice_get_site_info" => site.site_info(),
        "core_course_get_contents" => site.course_contents(),
        "mod_book_get_books_by_courses" => site.books(),
        _ => json!({"exception": "moodle_exception", "errorcode": "invalidfunction", "message": "unknown"}),
    })
}

async fn pluginfile(
    State(site): State<Arc<MockSite>>,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Bytes, StatusCode> {
    site.hit("pluginfile");
    if query.get("token").map(String::as_str) != Some(TOKEN) {
        return Err(StatusCode::FORBIDDEN);
    }
    if path.ends_with("index.html") {
        Ok(Bytes::from_static(CHAPTER_HTML.as_bytes()))
    } else {
        Ok(Bytes::from_static(b"\x89PNG"))
    }
}

async fn start_mock_site(books_available: bool, download_files: u8) -> Arc<MockSite> {
    start_mock_site_with(books_available, download_files, false).await
}

/// Start the mock site on an ephemeral port
async fn start_mock_site_with(
    books_available: bool,
    download_files: u8,
    second_book: bool,
) -> Arc<MockSite> {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let bound_addr = listener.local_addr().unwrap();

    let site = Arc::new(MockSite {
        base_url: format!("http://{}", bound_addr),
        books_available,
        download_files,
        second_book,
        calls: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        .route("/webservice/rest/server.php", post(rest))
        .route("/webservice/pluginfile.php/{*path}", get(pluginfile))
        .with_state(site.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    site
}

fn app_for(site: &MockSite, temp_dir: &TempDir) -> App {
    let mut config = Config::default();
    config.site.url = site.base_url.clone();
    config.site.token = Some(TOKEN.to_string());
    config.cache.path = temp_dir.path().join("cache");
    config.storage.provider = StorageProvider::Local;
    config.storage.root = temp_dir.path().join("files");
    config.http.max_retries = 1;
    App::new(config).unwrap()
}

async fn course_modules(app: &App) -> Vec<coursefetch::handlers::ModuleDescriptor> {
    app.ws
        .get_course_contents(101)
        .await
        .unwrap()
        .into_iter()
        .flat_map(|s| s.modules)
        .collect()
}

#[tokio::test]
async fn test_course_sync_stores_book_files() {
    let site = start_mock_site(true, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(&site, &temp_dir);

    let modules = course_modules(&app).await;
    let report = app.coordinator.prefetch_course(&modules, 101, true).await;

    assert_eq!(
        report.outcomes,
        vec![
            (42, ModuleOutcome::Downloaded),
            (43, ModuleOutcome::Skipped(SkipReason::NoHandler)),
        ]
    );

    let stored = temp_dir.path().join("files/mmaModBook/101/42/1/index.html");
    assert_eq!(std::fs::read_to_string(stored).unwrap(), CHAPTER_HTML);

    let entry = app
        .cache
        .file_entry(
            "mmaModBook",
            101,
            42,
            &format!("{}/pluginfile.php/9/mod_book/chapter/1/index.html", site.base_url),
        )
        .unwrap()
        .unwrap();
    assert!(entry.prefetched);
    assert_eq!(entry.timemodified, Some(1700000000));

    let book = app
        .cache
        .get_response(&BookService::cache_key(101, 42))
        .unwrap()
        .unwrap();
    assert!(!book.stale);
    assert_eq!(site.hits("mod_book_get_books_by_courses"), 1);
}

#[tokio::test]
async fn test_sync_succeeds_without_book_endpoint() {
    let site = start_mock_site(false, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(&site, &temp_dir);

    let modules = course_modules(&app).await;
    let report = app.coordinator.prefetch_course(&modules, 101, true).await;

    assert_eq!(report.downloaded(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(app.metrics.snapshot().optional_fetch_absorbed, 1);
    assert!(temp_dir.path().join("files/mmaModBook/101/42/1/index.html").exists());
}

#[tokio::test]
async fn test_second_sync_skips_unchanged_files() {
    let site = start_mock_site(true, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(&site, &temp_dir);

    let modules = course_modules(&app).await;
    app.coordinator.prefetch_course(&modules, 101, true).await;
    app.coordinator.prefetch_course(&modules, 101, true).await;

    let metrics = app.metrics.snapshot();
    assert_eq!(metrics.files_downloaded, 1);
    assert_eq!(metrics.files_skipped, 1);
    assert_eq!(site.hits("pluginfile"), 1);
    // Site info is fetched once per process
    assert_eq!(site.hits("core_webservice_get_site_info"), 1);
}

#[tokio::test]
async fn test_invalidation_forces_refetch() {
    let site = start_mock_site(true, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(&site, &temp_dir);

    let modules = course_modules(&app).await;
    app.coordinator.prefetch_course(&modules, 101, true).await;

    let invalidated = app
        .coordinator
        .refresh_if_updated(42, "book", 101, &["introfiles"])
        .await
        .unwrap();
    assert!(invalidated);

    app.coordinator.prefetch_course(&modules, 101, true).await;

    assert_eq!(site.hits("pluginfile"), 2);
    assert_eq!(site.hits("mod_book_get_books_by_courses"), 2);
    assert_eq!(app.metrics.snapshot().invalidations, 1);
}

#[tokio::test]
async fn test_intro_files_include_book_intro_images() {
    let site = start_mock_site(true, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(&site, &temp_dir);

    let modules = course_modules(&app).await;
    let files = app.coordinator.intro_files(&modules[0], 101).await;

    let urls: Vec<_> = files.iter().map(|f| f.fileurl.as_str()).collect();
    assert_eq!(
        urls,
        vec![format!("{}/pluginfile.php/9/mod_book/intro/cover.png", site.base_url)]
    );
}

#[tokio::test]
async fn test_site_without_downloads_disables_books() {
    let site = start_mock_site(true, 0).await;
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(&site, &temp_dir);

    let modules = course_modules(&app).await;
    let report = app.coordinator.prefetch_course(&modules, 101, true).await;

    assert_eq!(
        report.outcomes[0],
        (42, ModuleOutcome::Skipped(SkipReason::Disabled))
    );
    assert_eq!(site.hits("pluginfile"), 0);
    assert_eq!(site.hits("mod_book_get_books_by_courses"), 0);
}

#[tokio::test]
async fn test_one_listing_call_per_course() {
    let site = start_mock_site_with(true, 1, true).await;
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(&site, &temp_dir);

    let modules = course_modules(&app).await;
    let report = app.coordinator.prefetch_course(&modules, 101, true).await;

    assert_eq!(report.downloaded(), 2);
    assert_eq!(site.hits("mod_book_get_books_by_courses"), 1);
    for module_id in [42, 44] {
        let entry = app
            .cache
            .get_response(&BookService::cache_key(101, module_id))
            .unwrap()
            .unwrap();
        assert!(!entry.stale);
    }
}

#[tokio::test]
async fn test_same_module_in_two_courses_stored_apart() {
    let site = start_mock_site(true, 1).await;
    let temp_dir = TempDir::new().unwrap();
    let app = app_for(&site, &temp_dir);

    let modules = course_modules(&app).await;
    app.coordinator.prefetch_course(&modules, 101, true).await;
    app.coordinator.prefetch_course(&modules, 102, true).await;

    app.registry
        .get("book")
        .unwrap()
        .invalidate_content(42, 101)
        .await
        .unwrap();

    let url = format!("{}/pluginfile.php/9/mod_book/chapter/1/index.html", site.base_url);
    let own = app.cache.file_entry("mmaModBook", 101, 42, &url).unwrap().unwrap();
    let other = app.cache.file_entry("mmaModBook", 102, 42, &url).unwrap().unwrap();
    assert!(own.stale);
    assert!(!other.stale);
    assert!(temp_dir.path().join("files/mmaModBook/101/42/1/index.html").exists());
    assert!(temp_dir.path().join("files/mmaModBook/102/42/1/index.html").exists());
}
