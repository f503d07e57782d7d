use crate::app_config::VerbositySetting;

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_use_spinner(
    stderr_is_terminal: bool,
    quiet: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Default level when `RUST_LOG` is unset: `-q`/`-v` flags first, then the
/// config file verbosity, then `info`.
pub(crate) fn default_log_level(
    quiet: bool,
    verbose: u8,
    configured: Option<VerbositySetting>,
) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => configured.map_or("info", VerbositySetting::log_level),
        1 => "debug",
        _ => "trace",
    }
}

pub(crate) fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level_precedence() {
        assert_eq!(default_log_level(true, 0, Some(VerbositySetting::Debug)), "error");
        assert_eq!(default_log_level(false, 1, Some(VerbositySetting::Quiet)), "debug");
        assert_eq!(default_log_level(false, 2, None), "trace");
        assert_eq!(default_log_level(false, 0, Some(VerbositySetting::Quiet)), "error");
        assert_eq!(default_log_level(false, 0, None), "info");
    }

    #[test]
    fn test_should_use_spinner() {
        assert!(should_use_spinner(true, false, false));
        assert!(!should_use_spinner(false, false, false));
        assert!(!should_use_spinner(true, true, false));
        assert!(!should_use_spinner(true, false, true));
    }
}
