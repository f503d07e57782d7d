//! Shared User-Agent string for API and asset HTTP clients.

/// Project URL advertised in the User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/fierce/clip-archiver";

/// User-Agent sent on every outbound HTTP request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("clip-archiver/{version} (+{PROJECT_UA_URL})")
}
