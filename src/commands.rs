use tracing::info;

use crate::cli::{ModuleArgs, RefreshArgs, SyncArgs};
use coursefetch::app::App;
use coursefetch::coordinator::ModuleOutcome;
use coursefetch::handlers::{CourseId, ModuleDescriptor};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

async fn course_modules(app: &App, course_id: CourseId) -> Result<Vec<ModuleDescriptor>, AnyError> {
    let sections = app.ws.get_course_contents(course_id).await?;
    Ok(sections.into_iter().flat_map(|s| s.modules).collect())
}

/// Descriptor from the course listing, or a bare one when the listing lacks it
async fn find_module(app: &App, args: &ModuleArgs) -> Result<ModuleDescriptor, AnyError> {
    let found = course_modules(app, args.course)
        .await?
        .into_iter()
        .find(|m| m.id() == args.module);

    Ok(found.unwrap_or_else(|| ModuleDescriptor::new(args.module, args.modname.clone())))
}

pub async fn sync(app: &App, args: SyncArgs) -> Result<(), AnyError> {
    let modules = course_modules(app, args.course).await?;
    info!(course_id = args.course, modules = modules.len(), "Fetched course contents");

    let report = app
        .coordinator
        .prefetch_course(&modules, args.course, !args.now)
        .await;
    app.cache.persist()?;

    for (module_id, outcome) in &report.outcomes {
        match outcome {
            ModuleOutcome::Downloaded => println!("{module_id}\tdownloaded"),
            ModuleOutcome::Skipped(reason) => println!("{module_id}\tskipped ({reason:?})"),
            ModuleOutcome::Failed(error) => println!("{module_id}\tfailed: {error}"),
        }
    }
    println!(
        "session {}: {} downloaded, {} skipped, {} failed",
        report.session_id,
        report.downloaded(),
        report.skipped(),
        report.failed()
    );

    if report.failed() > 0 {
        return Err(format!("{} module(s) failed", report.failed()).into());
    }
    Ok(())
}

pub async fn intro(app: &App, args: ModuleArgs) -> Result<(), AnyError> {
    let module = find_module(app, &args).await?;
    let files = app.coordinator.intro_files(&module, args.course).await;
    println!("{}", serde_json::to_string_pretty(&files)?);
    Ok(())
}

pub async fn invalidate(app: &App, args: ModuleArgs) -> Result<(), AnyError> {
    let handler = app.registry.get(&args.modname)?;
    handler.invalidate_content(args.module, args.course).await?;
    app.cache.persist()?;
    println!("invalidated module {} in course {}", args.module, args.course);
    Ok(())
}

pub async fn refresh(app: &App, args: RefreshArgs) -> Result<(), AnyError> {
    let module = &args.module;
    let invalidated = app
        .coordinator
        .refresh_if_updated(module.module, &module.modname, module.course, args.updates.as_slice())
        .await?;
    app.cache.persist()?;

    if invalidated {
        println!("module {} invalidated", module.module);
    } else {
        println!("module {} unaffected", module.module);
    }
    Ok(())
}

pub async fn handlers(app: &App) -> Result<(), AnyError> {
    for handler in app.registry.handlers() {
        let enabled = app.coordinator.handler_enabled(handler.as_ref()).await;
        println!(
            "{}\t{}\tcomponent={}\tupdates={}\tenabled={}",
            handler.mod_name(),
            handler.name(),
            handler.component(),
            handler.update_signature().as_str(),
            enabled
        );
    }
    Ok(())
}

pub fn prune(app: &App) -> Result<(), AnyError> {
    let stats = app.cache.prune_stale(app.config.cache.retention_days)?;
    println!(
        "pruned {} responses, {} files",
        stats.responses_pruned, stats.files_pruned
    );
    Ok(())
}

pub fn show_config(app: &App) -> Result<(), AnyError> {
    print!("{}", toml::to_string_pretty(app.config.as_ref())?);
    Ok(())
}
