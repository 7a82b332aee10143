//! Registry and coordinator behaviour with recording handlers

use async_trait::async_trait;
use std::sync::{Arc, LazyLock, Mutex};

use coursefetch::content::ServiceError;
use coursefetch::coordinator::{ModuleOutcome, PrefetchCoordinator, SkipReason};
use coursefetch::handlers::{
    CourseId, ExternalFile, HandlerError, HandlerRegistry, ModuleDescriptor, ModuleId,
    PrefetchHandler, UpdateSignature,
};
use coursefetch::observability::Metrics;

static PAGE_UPDATES: LazyLock<UpdateSignature> =
    LazyLock::new(|| UpdateSignature::new("^configuration$|^.*files$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    IsEnabled,
    Download(ModuleId, bool),
    IntroFiles(ModuleId),
    Invalidate(ModuleId, CourseId),
}

/// Handler that records every call made on it
struct RecordingHandler {
    mod_name: &'static str,
    enabled: Result<bool, ()>,
    fail_download: bool,
    calls: Mutex<Vec<Call>>,
}

impl RecordingHandler {
    fn new(mod_name: &'static str, enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            mod_name,
            enabled: Ok(enabled),
            fail_download: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn broken_enablement(mod_name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            mod_name,
            enabled: Err(()),
            fail_download: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing_download(mod_name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            mod_name,
            enabled: Ok(true),
            fail_download: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PrefetchHandler for RecordingHandler {
    fn name(&self) -> &str {
        "Recording"
    }

    fn mod_name(&self) -> &str {
        self.mod_name
    }

    fn component(&self) -> &str {
        "mmaModRecording"
    }

    fn update_signature(&self) -> &UpdateSignature {
        &PAGE_UPDATES
    }

    async fn download_or_prefetch(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
        prefetch: bool,
    ) -> Result<(), HandlerError> {
        self.record(Call::Download(module.id(), prefetch));
        if self.fail_download {
            return Err(HandlerError::Content(ServiceError::NotFound {
                course_id,
                module_id: module.id(),
            }));
        }
        Ok(())
    }

    async fn get_intro_files(&self, module: &ModuleDescriptor, _course_id: CourseId) -> Vec<ExternalFile> {
        self.record(Call::IntroFiles(module.id()));
        module.intro_files().to_vec()
    }

    async fn invalidate_content(&self, module_id: ModuleId, course_id: CourseId) -> Result<(), HandlerError> {
        self.record(Call::Invalidate(module_id, course_id));
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool, HandlerError> {
        self.record(Call::IsEnabled);
        self.enabled.map_err(|_| {
            HandlerError::Content(ServiceError::NotFound {
                course_id: 0,
                module_id: 0,
            })
        })
    }
}

fn coordinator(handlers: &[Arc<RecordingHandler>]) -> (PrefetchCoordinator, Arc<Metrics>) {
    let mut registry = HandlerRegistry::new();
    for handler in handlers {
        registry.register(handler.clone());
    }
    let metrics = Arc::new(Metrics::new());
    (
        PrefetchCoordinator::new(Arc::new(registry), metrics.clone()),
        metrics,
    )
}

#[tokio::test]
async fn test_disabled_handler_only_sees_enablement_check() {
    let handler = RecordingHandler::new("book", false);
    let (coordinator, _) = coordinator(&[handler.clone()]);

    let module = ModuleDescriptor::new(42, "book");
    let outcome = coordinator.prefetch_module(&module, 101, true).await;
    let files = coordinator.intro_files(&module, 101).await;

    assert_eq!(outcome, ModuleOutcome::Skipped(SkipReason::Disabled));
    assert!(files.is_empty());
    assert!(handler.calls().iter().all(|c| *c == Call::IsEnabled));
}

#[tokio::test]
async fn test_failed_enablement_check_skips_handler() {
    let handler = RecordingHandler::broken_enablement("book");
    let (coordinator, _) = coordinator(&[handler.clone()]);

    let module = ModuleDescriptor::new(42, "book");
    let outcome = coordinator.prefetch_module(&module, 101, true).await;

    assert_eq!(outcome, ModuleOutcome::Skipped(SkipReason::Disabled));
    assert_eq!(handler.calls(), vec![Call::IsEnabled]);
}

#[tokio::test]
async fn test_unknown_content_type_is_skipped() {
    let (coordinator, metrics) = coordinator(&[RecordingHandler::new("book", true)]);

    let module = ModuleDescriptor::new(5, "quiz");
    let outcome = coordinator.prefetch_module(&module, 101, true).await;

    assert_eq!(outcome, ModuleOutcome::Skipped(SkipReason::NoHandler));
    assert_eq!(metrics.snapshot().modules_skipped, 1);
}

#[tokio::test]
async fn test_course_run_checks_enablement_once_per_handler() {
    let book = RecordingHandler::new("book", true);
    let page = RecordingHandler::new("page", false);
    let (coordinator, metrics) = coordinator(&[book.clone(), page.clone()]);

    let modules = vec![
        ModuleDescriptor::new(1, "book"),
        ModuleDescriptor::new(2, "page"),
        ModuleDescriptor::new(3, "book"),
        ModuleDescriptor::new(4, "forum"),
        ModuleDescriptor::new(5, "page"),
    ];
    let report = coordinator.prefetch_course(&modules, 101, false).await;

    assert_eq!(report.course_id, 101);
    assert_eq!(report.downloaded(), 2);
    assert_eq!(report.skipped(), 3);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        book.calls(),
        vec![
            Call::IsEnabled,
            Call::Download(1, false),
            Call::Download(3, false)
        ]
    );
    assert_eq!(page.calls(), vec![Call::IsEnabled]);
    assert_eq!(metrics.snapshot().modules_downloaded, 2);
}

#[tokio::test]
async fn test_course_run_continues_after_module_failure() {
    let book = RecordingHandler::failing_download("book");
    let (coordinator, metrics) = coordinator(&[book.clone()]);

    let modules = vec![ModuleDescriptor::new(1, "book"), ModuleDescriptor::new(2, "book")];
    let report = coordinator.prefetch_course(&modules, 101, true).await;

    assert_eq!(report.failed(), 2);
    assert!(matches!(report.outcomes[0].1, ModuleOutcome::Failed(_)));
    assert_eq!(metrics.snapshot().modules_failed, 2);
}

#[tokio::test]
async fn test_refresh_invalidates_only_on_matching_update() {
    let book = RecordingHandler::new("book", true);
    let (coordinator, _) = coordinator(&[book.clone()]);

    let unrelated = coordinator
        .refresh_if_updated(42, "book", 101, &["grades"])
        .await
        .unwrap();
    let matching = coordinator
        .refresh_if_updated(42, "book", 101, &["grades", "introfiles"])
        .await
        .unwrap();
    let no_handler = coordinator
        .refresh_if_updated(42, "quiz", 101, &["configuration"])
        .await
        .unwrap();

    assert!(!unrelated);
    assert!(matching);
    assert!(!no_handler);
    assert_eq!(book.calls(), vec![Call::Invalidate(42, 101)]);
}

#[tokio::test]
async fn test_intro_files_from_enabled_handler() {
    let book = RecordingHandler::new("book", true);
    let (coordinator, _) = coordinator(&[book.clone()]);

    let file = ExternalFile::from_url("https://moodle.test/pluginfile.php/9/mod_book/intro/a.png");
    let module = ModuleDescriptor::new(42, "book").with_intro_files(vec![file.clone()]);

    assert_eq!(coordinator.intro_files(&module, 101).await, vec![file]);
    assert_eq!(book.calls(), vec![Call::IsEnabled, Call::IntroFiles(42)]);
}
