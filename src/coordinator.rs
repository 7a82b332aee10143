//! Course-level prefetch driver
//!
//! Looks handlers up by content type, gates them on enablement and runs their
//! downloads one module at a time. A disabled handler, or one whose
//! enablement check fails, is skipped without any further calls.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::handlers::{
    CourseId, ExternalFile, HandlerError, HandlerRegistry, ModuleDescriptor, ModuleId,
    PrefetchHandler,
};
use crate::observability::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoHandler,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    Downloaded,
    Skipped(SkipReason),
    Failed(String),
}

/// Result of one course run
#[derive(Debug, Clone)]
pub struct CourseReport {
    pub session_id: Uuid,
    pub course_id: CourseId,
    pub outcomes: Vec<(ModuleId, ModuleOutcome)>,
}

impl CourseReport {
    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, ModuleOutcome::Downloaded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ModuleOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ModuleOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ModuleOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

#[derive(Clone)]
pub struct PrefetchCoordinator {
    registry: Arc<HandlerRegistry>,
    metrics: Arc<Metrics>,
}

impl PrefetchCoordinator {
    pub fn new(registry: Arc<HandlerRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { registry, metrics }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Enablement with failures treated as disabled
    pub async fn handler_enabled(&self, handler: &dyn PrefetchHandler) -> bool {
        match handler.is_enabled().await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(handler = handler.name(), error = %e, "Enablement check failed, skipping handler");
                false
            }
        }
    }

    pub async fn prefetch_module(
        &self,
        module: &ModuleDescriptor,
        course_id: CourseId,
        prefetch: bool,
    ) -> ModuleOutcome {
        let Ok(handler) = self.registry.get(module.modname()) else {
            return self.skip(SkipReason::NoHandler);
        };
        if !self.handler_enabled(handler.as_ref()).await {
            return self.skip(SkipReason::Disabled);
        }
        self.download(handler.as_ref(), module, course_id, prefetch).await
    }

    /// Prefetch every module of a course, checking each handler once
    pub async fn prefetch_course(
        &self,
        modules: &[ModuleDescriptor],
        course_id: CourseId,
        prefetch: bool,
    ) -> CourseReport {
        let session_id = Uuid::now_v7();
        let span = info_span!("prefetch_course", %session_id, course_id);

        async move {
            let mut enabled: HashMap<String, bool> = HashMap::new();
            let mut outcomes = Vec::with_capacity(modules.len());

            for module in modules {
                let Ok(handler) = self.registry.get(module.modname()) else {
                    outcomes.push((module.id(), self.skip(SkipReason::NoHandler)));
                    continue;
                };

                let is_enabled = match enabled.get(handler.mod_name()) {
                    Some(&known) => known,
                    None => {
                        let checked = self.handler_enabled(handler.as_ref()).await;
                        enabled.insert(handler.mod_name().to_string(), checked);
                        checked
                    }
                };

                let outcome = if is_enabled {
                    self.download(handler.as_ref(), module, course_id, prefetch).await
                } else {
                    self.skip(SkipReason::Disabled)
                };
                outcomes.push((module.id(), outcome));
            }

            let report = CourseReport {
                session_id,
                course_id,
                outcomes,
            };
            info!(
                downloaded = report.downloaded(),
                skipped = report.skipped(),
                failed = report.failed(),
                "Course prefetch finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Invalidate a module when any update name matches its handler's signature.
    ///
    /// Returns whether the module was invalidated.
    pub async fn refresh_if_updated<S: AsRef<str> + Sync>(
        &self,
        module_id: ModuleId,
        modname: &str,
        course_id: CourseId,
        update_names: &[S],
    ) -> Result<bool, HandlerError> {
        let Ok(handler) = self.registry.get(modname) else {
            return Ok(false);
        };
        if !handler.update_signature().matches_any(update_names) {
            return Ok(false);
        }

        handler.invalidate_content(module_id, course_id).await?;
        info!(module_id, course_id, modname, "Module invalidated by update");
        Ok(true)
    }

    /// Preview files for a module; empty when no enabled handler serves it
    pub async fn intro_files(&self, module: &ModuleDescriptor, course_id: CourseId) -> Vec<ExternalFile> {
        let Ok(handler) = self.registry.get(module.modname()) else {
            return Vec::new();
        };
        if !self.handler_enabled(handler.as_ref()).await {
            return Vec::new();
        }
        handler.get_intro_files(module, course_id).await
    }

    async fn download(
        &self,
        handler: &dyn PrefetchHandler,
        module: &ModuleDescriptor,
        course_id: CourseId,
        prefetch: bool,
    ) -> ModuleOutcome {
        match handler.download_or_prefetch(module, course_id, prefetch).await {
            Ok(()) => {
                self.metrics.module_downloaded();
                ModuleOutcome::Downloaded
            }
            Err(e) => {
                warn!(module_id = module.id(), course_id, error = %e, "Module prefetch failed");
                self.metrics.module_failed();
                ModuleOutcome::Failed(e.to_string())
            }
        }
    }

    fn skip(&self, reason: SkipReason) -> ModuleOutcome {
        self.metrics.module_skipped();
        ModuleOutcome::Skipped(reason)
    }
}
