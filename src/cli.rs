//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Harvest clip metadata for an account and archive the videos.
///
/// Values given on the command line override the config file, which
/// overrides built-in defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "clip-archiver")]
#[command(author, version, about)]
pub struct Args {
    /// Use the existing database without fetching clip metadata
    #[arg(short = 'n', long)]
    pub skip_harvest: bool,

    /// Start the harvest at the month of the newest stored clip
    #[arg(short = 'r', long)]
    pub resume: bool,

    /// Download clips recorded in the database
    #[arg(short = 'd', long)]
    pub download: bool,

    /// Write a JSON file next to each downloaded clip
    #[arg(short = 'j', long)]
    pub save_json: bool,

    /// Download again even if a clip is marked as downloaded
    #[arg(short = 'f', long)]
    pub force_download: bool,

    /// Write JSON files for every downloaded clip in the database
    #[arg(short = 'e', long)]
    pub export_json: bool,

    /// Application client id
    #[arg(long)]
    pub client_id: Option<String>,

    /// Application client secret
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Database file path
    #[arg(short = 'b', long)]
    pub database: Option<PathBuf>,

    /// Login name or numeric broadcaster id of the account
    #[arg(short = 's', long)]
    pub streamer: Option<String>,

    /// Directory clips are saved under
    #[arg(short = 'o', long)]
    pub download_directory: Option<PathBuf>,

    /// Minimum view count to download
    #[arg(short = 'm', long, value_parser = clap::value_parser!(i64).range(0..))]
    pub min_view: Option<i64>,

    /// Maximum number of clips to download in one run (0 = no limit)
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    pub max_clips: Option<i64>,

    /// Clips requested per page (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub read_size: Option<u32>,

    /// Concurrent downloads (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Proxy URL for API requests, asset downloads and streamlink
    #[arg(long)]
    pub proxy: Option<String>,

    /// Path to the streamlink executable (default: search PATH)
    #[arg(long)]
    pub streamlink_path: Option<PathBuf>,

    /// Offset used for dates in output paths, e.g. +09:00 (default: local)
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    /// Config file (default: $XDG_CONFIG_HOME/clip-archiver/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, hide = true)]
    pub api_base: Option<String>,

    /// Override the authentication base URL
    #[arg(long, hide = true)]
    pub auth_base: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
