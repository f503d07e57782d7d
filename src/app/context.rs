//! Shared runtime context built once startup validation has passed.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clip_archiver::Database;
use clip_archiver::api::{Account, HelixClient};
use clip_archiver::download::HttpSettings;
use clip_archiver::progress::ProgressReporter;
use clip_archiver::store::{ClipStore, Namespace};

use crate::app::config_manager::Settings;

/// Collaborators handed to each phase instead of living in globals.
pub(crate) struct RunContext {
    pub(crate) settings: Settings,
    pub(crate) db: Database,
    pub(crate) store: ClipStore,
    pub(crate) http: HttpSettings,
    pub(crate) helix: HelixClient,
    pub(crate) account: Account,
    pub(crate) namespace: Namespace,
    pub(crate) progress: Arc<dyn ProgressReporter>,
    pub(crate) interrupted: Arc<AtomicBool>,
}
