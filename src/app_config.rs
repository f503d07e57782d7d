//! Config file loading for CLI defaults.
//!
//! The file is a flat list of `key = value` lines. Strings are
//! double-quoted, booleans are `true`/`false`, integers are bare. `#` starts
//! a comment outside strings and a `[settings]` header is accepted.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

const APP_DIR: &str = "clip-archiver";
const CONFIG_FILE_NAME: &str = "config.toml";
const SECTION_HEADER: &str = "[settings]";

/// File configuration; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Login name or numeric broadcaster id.
    pub streamer: Option<String>,
    pub database: Option<PathBuf>,
    pub download_directory: Option<PathBuf>,
    /// Clips per listing page.
    pub read_size: Option<u32>,
    pub proxy: Option<String>,
    pub concurrency: Option<u8>,
    pub min_view: Option<i64>,
    /// Download cap per run; 0 means unlimited.
    pub max_clips: Option<i64>,
    pub save_json: Option<bool>,
    pub force_download: Option<bool>,
    pub streamlink_path: Option<PathBuf>,
    /// `+HH:MM` or `-HH:MM`.
    pub utc_offset: Option<String>,
    pub verbosity: Option<VerbositySetting>,
    /// Database pool max connections (1..=20).
    pub db_max_connections: Option<u32>,
    /// Database busy timeout in milliseconds.
    pub db_busy_timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(read_size) = self.read_size
            && !(1..=100).contains(&read_size)
        {
            bail!("Invalid config value for `read_size`: {read_size}. Expected range: 1..=100");
        }
        if let Some(concurrency) = self.concurrency
            && !(1..=100).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=100");
        }
        if let Some(value) = self.db_max_connections
            && !(1..=20).contains(&value)
        {
            bail!("Invalid config value for `db_max_connections`: {value}. Expected range: 1..=20");
        }
        if let Some(value) = self.db_busy_timeout_ms
            && value > 120_000
        {
            bail!("Invalid config value for `db_busy_timeout_ms`: {value}. Expected range: 0..=120000");
        }
        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log level used when neither `RUST_LOG` nor `-v`/`-q` is given.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose | Self::Debug => "debug",
            Self::Quiet => "error",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Path that was read, if any.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/clip-archiver/config.toml`
/// 2. `$HOME/.config/clip-archiver/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(APP_DIR)
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads `explicit` (which must exist) or the default config file if present.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file '{}' does not exist", path.display());
        }
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(load_file_config(path)?),
        });
    }

    match resolve_default_config_path() {
        Some(path) if path.exists() => {
            let config = load_file_config(&path)?;
            Ok(LoadedConfig {
                path: Some(path),
                config: Some(config),
            })
        }
        _ => Ok(LoadedConfig::default()),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() || line == SECTION_HEADER {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "client_id" => cfg.client_id = Some(parse_string_literal(value).with_context(invalid)?),
            "client_secret" => {
                cfg.client_secret = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "streamer" => cfg.streamer = Some(parse_string_literal(value).with_context(invalid)?),
            "database" => {
                cfg.database = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "download_directory" => {
                cfg.download_directory = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "read_size" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.read_size = Some(u32::try_from(parsed).with_context(invalid)?);
            }
            "proxy" => cfg.proxy = Some(parse_string_literal(value).with_context(invalid)?),
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.concurrency = Some(u8::try_from(parsed).with_context(invalid)?);
            }
            "min_view" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.min_view = Some(i64::try_from(parsed).with_context(invalid)?);
            }
            "max_clips" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.max_clips = Some(i64::try_from(parsed).with_context(invalid)?);
            }
            "save_json" => cfg.save_json = Some(parse_boolean(value).with_context(invalid)?),
            "force_download" => {
                cfg.force_download = Some(parse_boolean(value).with_context(invalid)?);
            }
            "streamlink_path" => {
                cfg.streamlink_path = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "utc_offset" => {
                cfg.utc_offset = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            "db_max_connections" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.db_max_connections = Some(u32::try_from(parsed).with_context(invalid)?);
            }
            "db_busy_timeout_ms" => {
                cfg.db_busy_timeout_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
