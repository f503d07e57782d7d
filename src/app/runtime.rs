use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use clip_archiver::Database;
use clip_archiver::api::{ApiEndpoints, Authenticator, HelixClient};
use clip_archiver::download::{
    DownloadOrchestrator, DownloadRequest, HttpClient, HttpSettings, StreamlinkCli,
    TwoTierDownloader,
};
use clip_archiver::harvest::{HarvestPlan, Harvester};
use clip_archiver::paths::PathResolver;
use clip_archiver::sidecar::export_sidecars;
use clip_archiver::store::{ClipStore, DownloadStatus, Namespace, YearMonth};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config_manager, context::RunContext, exit_handler, progress_manager, terminal};
use crate::app_config::load_config;
use crate::cli::Args;

pub(crate) async fn run_archiver() -> Result<ProcessExit> {
    let args = Args::parse();
    let loaded = load_config(args.config.as_deref())?;
    let file_config = loaded.config.as_ref();

    terminal::init_tracing(terminal::default_log_level(
        args.quiet,
        args.verbose,
        file_config.and_then(|config| config.verbosity),
    ));
    debug!("CLI arguments parsed");
    if let Some(path) = &loaded.path {
        info!(path = %path.display(), "Loaded config file");
    }

    let settings = config_manager::resolve_settings(&args, file_config)?;
    settings.log_summary();

    let ctx = build_context(settings, args.quiet).await?;
    let exit = run_phases(&ctx).await;
    ctx.db.close().await;
    exit
}

/// Opens storage, authenticates and resolves the account. Every failure
/// here is a startup validation error.
async fn build_context(settings: config_manager::Settings, quiet: bool) -> Result<RunContext> {
    let db = Database::with_options(&settings.database, settings.db_options)
        .await
        .with_context(|| format!("Failed to open database '{}'", settings.database.display()))?;
    let store = ClipStore::new(db.clone());

    let http = HttpSettings::with_proxy(settings.proxy.clone());
    let defaults = ApiEndpoints::default();
    let endpoints = ApiEndpoints {
        api_base: settings.api_base.clone().unwrap_or(defaults.api_base),
        auth_base: settings.auth_base.clone().unwrap_or(defaults.auth_base),
    };

    let credentials = Authenticator::new(&http, &endpoints)?
        .authenticate(&settings.client_id, &settings.client_secret)
        .await
        .context("Authentication failed")?;
    let helix = HelixClient::with_endpoints(credentials, &http, &endpoints)?;
    let account = helix
        .resolve_account(&settings.streamer)
        .await
        .with_context(|| format!("Could not resolve account '{}'", settings.streamer))?;
    let namespace = Namespace::parse(&account.login)
        .with_context(|| format!("Account login '{}' is not a valid key", account.login))?;
    store
        .ensure_namespace(&namespace)
        .await
        .context("Failed to register namespace")?;
    info!(
        login = %account.login,
        display_name = %account.display_name,
        broadcaster_id = %account.broadcaster_id,
        "Account resolved"
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing current work");
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        quiet,
        terminal::is_dumb_terminal(),
    );

    Ok(RunContext {
        settings,
        db,
        store,
        http,
        helix,
        account,
        namespace,
        progress: Arc::new(progress_manager::TerminalProgress::new(use_spinner)),
        interrupted,
    })
}

async fn run_phases(ctx: &RunContext) -> Result<ProcessExit> {
    let settings = &ctx.settings;

    if !settings.skip_harvest {
        harvest(ctx).await?;
    }
    if interrupted(ctx) {
        warn!("Interrupted. Run again with --resume to continue.");
        return Ok(ProcessExit::Success);
    }

    let mut exit = ProcessExit::Success;
    if settings.download {
        exit = download(ctx).await?;
    }
    if interrupted(ctx) {
        warn!("Interrupted. Run again to download the remaining clips.");
        return Ok(exit);
    }

    if settings.export_json {
        export(ctx).await?;
    }
    log_store_summary(ctx).await;
    Ok(exit)
}

async fn log_store_summary(ctx: &RunContext) {
    let mut counts = Vec::with_capacity(3);
    for status in [
        DownloadStatus::Unattempted,
        DownloadStatus::Downloaded,
        DownloadStatus::Pending,
    ] {
        match ctx.store.count_by_status(&ctx.namespace, status).await {
            Ok(count) => counts.push(count),
            Err(e) => {
                debug!(error = %e, "Could not read store summary");
                return;
            }
        }
    }
    info!(
        namespace = %ctx.namespace,
        unattempted = counts[0],
        downloaded = counts[1],
        pending = counts[2],
        "Stored clips"
    );
}

fn interrupted(ctx: &RunContext) -> bool {
    ctx.interrupted.load(Ordering::SeqCst)
}

async fn harvest(ctx: &RunContext) -> Result<()> {
    let start = if ctx.settings.resume {
        ctx.store.latest_created_window(&ctx.namespace).await
    } else {
        YearMonth::EPOCH
    };
    let plan = HarvestPlan::through_now(start);
    info!(from = %plan.start(), until = %plan.until(), "Reading clips from server");

    let harvester = Harvester::new(
        Arc::new(ctx.helix.clone()),
        Arc::new(ctx.store.clone()),
        ctx.account.broadcaster_id.clone(),
        ctx.settings.read_size,
        Arc::clone(&ctx.progress),
    );
    let stats = harvester
        .run(&ctx.namespace, &plan, Arc::clone(&ctx.interrupted))
        .await?;
    info!(
        clips = stats.clips(),
        windows = stats.windows(),
        failed_windows = stats.failed_windows(),
        "Total clips with duplicates"
    );
    Ok(())
}

async fn download(ctx: &RunContext) -> Result<ProcessExit> {
    let settings = &ctx.settings;
    let Some(target_dir) = settings.download_directory.clone() else {
        return Ok(ProcessExit::Success);
    };
    tokio::fs::create_dir_all(&target_dir)
        .await
        .with_context(|| format!("Failed to create '{}'", target_dir.display()))?;

    let resolver = StreamlinkCli::discover(settings.streamlink_path.clone(), settings.proxy.clone());
    if resolver.program().is_none() {
        warn!("streamlink not found; clips will be fetched from their asset URLs only");
    }
    let downloader = TwoTierDownloader::new(Arc::new(resolver), HttpClient::new(&ctx.http)?);
    let orchestrator = DownloadOrchestrator::new(
        Arc::new(ctx.store.clone()),
        Arc::new(downloader),
        PathResolver::new(settings.utc_offset),
        Arc::clone(&ctx.progress),
    );

    let request = DownloadRequest {
        target_dir,
        concurrency: settings.concurrency,
        save_sidecar: settings.save_json,
        force_redownload: settings.force_download,
        min_view: settings.min_view,
        max_count: settings.max_clips,
    };
    let stats = orchestrator
        .run(&ctx.namespace, &request, Arc::clone(&ctx.interrupted))
        .await?;

    info!(
        downloaded = stats.downloaded(),
        failed = stats.failed(),
        not_started = stats.not_started(),
        total = stats.total(),
        "Download complete"
    );
    Ok(exit_handler::determine_exit_outcome(
        stats.downloaded(),
        stats.failed(),
    ))
}

async fn export(ctx: &RunContext) -> Result<()> {
    let Some(target_dir) = ctx.settings.download_directory.as_deref() else {
        return Ok(());
    };
    let records = ctx.store.completed_records(&ctx.namespace).await?;
    debug!(records = records.len(), "Exporting sidecars");

    let stats = export_sidecars(
        &records,
        target_dir,
        &PathResolver::new(ctx.settings.utc_offset),
    )
    .await;
    info!(
        written = stats.written(),
        failed = stats.failed(),
        "JSON export complete"
    );
    Ok(())
}
