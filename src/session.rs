//! Session guard.
//!
//! Authenticated actions start with [`require_session`]; any 401 ends in
//! [`end_session`]. There is no token refresh.

use std::time::Duration;

use tracing::{error, warn};

use crate::context::AdminContext;
use crate::outcome::{Navigation, Notice, Outcome};
use crate::storage;

pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

/// The stored token, or an immediate redirect to the login view.
pub fn require_session(ctx: &AdminContext) -> Result<String, Navigation> {
    ctx.token().ok_or_else(|| {
        warn!("no session token, redirecting to login");
        Navigation::Login {
            after: Duration::ZERO,
        }
    })
}

/// Outcome for an action attempted without a session.
pub fn login_required<V>(navigation: Navigation) -> Outcome<V> {
    Outcome::navigate(navigation)
}

/// Tear down the session after a 401: clear every session key, warn, and
/// schedule the login redirect after the configured delay.
pub fn end_session<V>(ctx: &AdminContext) -> Outcome<V> {
    if let Err(e) = storage::clear_session(&ctx.db) {
        error!(error = %e, "failed to clear session after 401");
    }
    warn!("backend rejected the token, session ended");
    Outcome::notice(Notice::warning(SESSION_EXPIRED)).with_navigation(Navigation::Login {
        after: ctx.config.redirect_delay,
    })
}
