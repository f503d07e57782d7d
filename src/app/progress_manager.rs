//! Terminal progress (spinner and bar) for harvest and download runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use clip_archiver::progress::{ItemProgress, ProgressReporter};
use clip_archiver::store::YearMonth;
use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);

/// Renders library progress events on stderr.
///
/// When disabled every event is dropped, so logs stay readable on
/// non-terminals and with `--quiet`.
pub(crate) struct TerminalProgress {
    enabled: bool,
    bar: Mutex<Option<ProgressBar>>,
    harvested: AtomicUsize,
}

impl TerminalProgress {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bar: Mutex::new(None),
            harvested: AtomicUsize::new(0),
        }
    }

    fn with_bar(&self, create: impl FnOnce() -> ProgressBar, update: impl FnOnce(&ProgressBar)) {
        if !self.enabled {
            return;
        }
        if let Ok(mut slot) = self.bar.lock() {
            let bar = slot.get_or_insert_with(create);
            update(bar);
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(TICK);
    spinner
}

fn bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_bar} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(TICK);
    bar
}

impl ProgressReporter for TerminalProgress {
    fn begin(&self, total: usize) {
        if !self.enabled {
            return;
        }
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.take() {
                previous.finish_and_clear();
            }
            *slot = Some(bar(total));
        }
    }

    fn window_started(&self, window: YearMonth) {
        let harvested = self.harvested.load(Ordering::Relaxed);
        self.with_bar(spinner, |bar| {
            bar.set_message(format!("Harvesting {window} ({harvested} clips so far)"));
        });
    }

    fn clips_harvested(&self, count: usize) {
        let harvested = self.harvested.fetch_add(count, Ordering::Relaxed) + count;
        self.with_bar(spinner, |bar| {
            bar.set_message(format!("Harvesting ({harvested} clips so far)"));
        });
    }

    fn item_finished(&self, item: &ItemProgress<'_>) {
        self.with_bar(
            || bar(0),
            |bar| {
                bar.inc(1);
                bar.set_message(format!(
                    "{} {} {} ({})",
                    item.account, item.created_at, item.clip_id, item.status
                ));
            },
        );
    }

    fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_and_clear();
        }
    }
}
