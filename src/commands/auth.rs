//! Login, logout and session verification.

use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use crate::api::ApiRequest;
use crate::context::AdminContext;
use crate::error::{ApiError, ValidationError};
use crate::models::Session;
use crate::normalize;
use crate::outcome::{Navigation, Notice, Outcome};
use crate::session::{end_session, login_required, require_session};
use crate::storage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginView {
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// The backend accepted the token.
    Valid { display_name: String },
    /// The backend could not be asked; the user may continue.
    Offline { display_name: String },
}

fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::new("Enter your email and password"));
    }
    Ok(())
}

/// `POST /login`; stores the session and navigates to the dashboard.
pub async fn login(ctx: &AdminContext, email: &str, password: &str) -> Outcome<LoginView> {
    if let Err(e) = validate_credentials(email, password) {
        return Outcome::notice(Notice::warning(e.to_string()));
    }

    let request = ApiRequest::post(
        "/login",
        json!({ "email": email.trim(), "password": password }),
    );
    let body = match ctx.call_anonymous(request).await {
        Ok(body) => body,
        Err(e) if e.is_connectivity() => {
            warn!(error = %e, "login: backend unreachable");
            return Outcome::notice(Notice::error(
                "Cannot connect to the server. Check that the backend is running.",
            ));
        }
        Err(ApiError::Unauthorized) => {
            return Outcome::notice(Notice::error("Invalid email or password"));
        }
        Err(ApiError::Server { message, .. }) => return Outcome::notice(Notice::error(message)),
        Err(e) => {
            warn!(error = %e, "login failed");
            return Outcome::notice(Notice::error("Login failed"));
        }
    };

    let Some((token, user)) = normalize::login_response(&body) else {
        warn!("login response carried no token");
        return Outcome::notice(Notice::error("Login failed"));
    };
    let session = Session { token, user };
    if let Err(e) = storage::save_session(&ctx.db, &session) {
        return Outcome::notice(Notice::error(format!("Could not store the session: {e}")));
    }

    let display_name = session
        .user
        .as_ref()
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| "Administrator".to_string());
    let role = storage::role(&ctx.db).unwrap_or_default();
    info!(role = %role, "login succeeded");
    Outcome::view(LoginView { display_name, role })
        .with_notice(Notice::success("Welcome"))
        .with_navigation(Navigation::Dashboard)
}

/// Best-effort `POST /logout`, then clear the session and go to login.
pub async fn logout(ctx: &AdminContext) -> Outcome<()> {
    if storage::has_session(&ctx.db) {
        if let Err(e) = ctx.call(ApiRequest::new(reqwest::Method::POST, "/logout")).await {
            warn!(error = %e, "logout request failed, clearing session anyway");
        }
    }
    if let Err(e) = storage::clear_session(&ctx.db) {
        warn!(error = %e, "failed to clear session on logout");
    }
    Outcome::navigate(Navigation::Login {
        after: Duration::ZERO,
    })
}

fn stored_display_name(ctx: &AdminContext) -> String {
    storage::user(&ctx.db)
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| "Administrator".to_string())
}

/// Verify the stored token with `GET /check-auth`.
pub async fn check_auth(ctx: &AdminContext) -> Outcome<AuthStatus> {
    if let Err(navigation) = require_session(ctx) {
        return login_required(navigation);
    }
    match ctx.call(ApiRequest::get("/check-auth")).await {
        Ok(_) => Outcome::view(AuthStatus::Valid {
            display_name: stored_display_name(ctx),
        }),
        Err(ApiError::Unauthorized) => end_session(ctx),
        Err(e) => {
            warn!(error = %e, "could not verify session, continuing offline");
            Outcome::view(AuthStatus::Offline {
                display_name: stored_display_name(ctx),
            })
            .with_notice(Notice::warning("Could not verify the session with the server"))
        }
    }
}
