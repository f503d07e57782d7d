//! Configuration lifecycle: merge CLI values over the config file and defaults,
//! then validate the result before any network traffic.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{FixedOffset, Local, Offset};
use clip_archiver::db::DatabaseOptions;
use clip_archiver::download::DEFAULT_CONCURRENCY;
use clip_archiver::harvest::DEFAULT_PAGE_SIZE;
use tracing::info;

use crate::app_config::FileConfig;
use crate::cli::Args;

/// Database file used when none is configured.
pub(crate) const DEFAULT_DATABASE: &str = "clips.sqlite3";

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) streamer: String,
    pub(crate) database: PathBuf,
    pub(crate) download_directory: Option<PathBuf>,
    pub(crate) read_size: u32,
    pub(crate) proxy: Option<String>,
    pub(crate) concurrency: usize,
    pub(crate) min_view: i64,
    pub(crate) max_clips: i64,
    pub(crate) save_json: bool,
    pub(crate) force_download: bool,
    pub(crate) streamlink_path: Option<PathBuf>,
    pub(crate) utc_offset: FixedOffset,
    pub(crate) db_options: DatabaseOptions,
    pub(crate) skip_harvest: bool,
    pub(crate) resume: bool,
    pub(crate) download: bool,
    pub(crate) export_json: bool,
    pub(crate) api_base: Option<String>,
    pub(crate) auth_base: Option<String>,
}

impl Settings {
    /// Logs the resolved settings with secrets hidden.
    pub(crate) fn log_summary(&self) {
        info!(
            database = %self.database.display(),
            client_id = "HIDDEN",
            client_secret = "HIDDEN",
            streamer = %self.streamer,
            read_size = self.read_size,
            proxy = if self.proxy.is_some() { "HIDDEN" } else { "NOT SET" },
            "Init parameters"
        );
        if self.download {
            info!(
                download_directory = ?self.download_directory,
                save_json = self.save_json,
                force_download = self.force_download,
                min_view = self.min_view,
                max_clips = self.max_clips,
                concurrency = self.concurrency,
                utc_offset = %self.utc_offset,
                "Download parameters"
            );
        }
    }
}

/// Applies precedence (command line > config file > default) and validates.
pub(crate) fn resolve_settings(args: &Args, file: Option<&FileConfig>) -> Result<Settings> {
    let file = file.cloned().unwrap_or_default();

    let client_id = required(args.client_id.clone().or(file.client_id), "client id")?;
    let client_secret = required(
        args.client_secret.clone().or(file.client_secret),
        "client secret",
    )?;
    let streamer = required(args.streamer.clone().or(file.streamer), "streamer")?;

    let database = args
        .database
        .clone()
        .or(file.database)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
    if database.as_os_str().is_empty() {
        bail!("Database path must not be empty");
    }

    let download_directory = args
        .download_directory
        .clone()
        .or(file.download_directory)
        .filter(|dir| !dir.as_os_str().is_empty());
    if (args.download || args.export_json) && download_directory.is_none() {
        bail!("A download directory is required with --download or --export-json (use -o)");
    }

    let utc_offset = match args.utc_offset.as_deref().or(file.utc_offset.as_deref()) {
        Some(raw) => parse_utc_offset(raw)?,
        None => Local::now().offset().fix(),
    };

    let defaults = DatabaseOptions::default();
    let db_options = DatabaseOptions {
        max_connections: file.db_max_connections.unwrap_or(defaults.max_connections),
        busy_timeout_ms: file.db_busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
    };

    Ok(Settings {
        client_id,
        client_secret,
        streamer,
        database,
        download_directory,
        read_size: args.read_size.or(file.read_size).unwrap_or(DEFAULT_PAGE_SIZE),
        proxy: args
            .proxy
            .clone()
            .or(file.proxy)
            .filter(|proxy| !proxy.trim().is_empty()),
        concurrency: args
            .concurrency
            .or(file.concurrency)
            .map_or(DEFAULT_CONCURRENCY, usize::from),
        min_view: args.min_view.or(file.min_view).unwrap_or(0),
        max_clips: args.max_clips.or(file.max_clips).unwrap_or(0),
        save_json: args.save_json || file.save_json.unwrap_or(false),
        force_download: args.force_download || file.force_download.unwrap_or(false),
        streamlink_path: args.streamlink_path.clone().or(file.streamlink_path),
        utc_offset,
        db_options,
        skip_harvest: args.skip_harvest,
        resume: args.resume,
        download: args.download,
        export_json: args.export_json,
        api_base: args.api_base.clone(),
        auth_base: args.auth_base.clone(),
    })
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("Missing {name}: pass it on the command line or set it in the config file"),
    }
}

/// Parses `+HH:MM` / `-HH:MM` (or `Z`) into a fixed offset.
pub(crate) fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).context("invalid zero offset");
    }
    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => bail!("Invalid UTC offset '{raw}': expected +HH:MM or -HH:MM"),
    };
    let Some((hours, minutes)) = rest.split_once(':') else {
        bail!("Invalid UTC offset '{raw}': expected +HH:MM or -HH:MM");
    };
    let hours: i32 = hours
        .parse()
        .with_context(|| format!("Invalid hours in UTC offset '{raw}'"))?;
    let minutes: i32 = minutes
        .parse()
        .with_context(|| format!("Invalid minutes in UTC offset '{raw}'"))?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        bail!("UTC offset '{raw}' is out of range");
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("UTC offset '{raw}' is out of range"))
}
