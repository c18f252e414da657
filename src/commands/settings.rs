//! Site configuration: opening hours, open days and closed dates.

use tracing::{error, warn};

use crate::api::ApiRequest;
use crate::context::AdminContext;
use crate::error::ApiError;
use crate::models::SiteConfig;
use crate::normalize;
use crate::outcome::{Notice, Outcome};
use crate::session::end_session;

use super::ensure_session;

/// Local store key of the last saved configuration.
pub const KEY_SITE_CONFIG: &str = "site_config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Remote,
    Local,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfigView {
    pub config: SiteConfig,
    pub source: ConfigSource,
}

/// Split a comma-separated closed-dates input, dropping empty parts.
pub fn parse_closed_dates(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a configuration from form input. Blank times are unset; days
/// outside 0..=6 are dropped.
pub fn config_from_input(
    open_time: &str,
    close_time: &str,
    open_days: &[u8],
    closed_dates: &str,
) -> SiteConfig {
    let time = |s: &str| Some(s.trim().to_string()).filter(|t| !t.is_empty());
    let mut days: Vec<u8> = open_days.iter().copied().filter(|d| *d <= 6).collect();
    days.sort_unstable();
    days.dedup();
    SiteConfig {
        open_time: time(open_time),
        close_time: time(close_time),
        open_days: days,
        closed_dates: parse_closed_dates(closed_dates),
    }
}

fn read_local(ctx: &AdminContext) -> Option<SiteConfig> {
    let raw = match ctx.db.read(KEY_SITE_CONFIG) {
        Ok(v) => v?,
        Err(e) => {
            warn!(error = %e, "failed to read local site config");
            return None;
        }
    };
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| warn!(error = %e, "local site config is not valid JSON"))
        .ok()?;
    normalize::site_config(&value)
}

/// `GET /site-config`, then the locally saved copy, then the default.
pub async fn load_site_config(ctx: &AdminContext) -> Outcome<SiteConfigView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    match ctx.call(ApiRequest::get("/site-config")).await {
        Ok(body) => {
            if let Some(config) = normalize::site_config(&body) {
                return Outcome::view(SiteConfigView {
                    config,
                    source: ConfigSource::Remote,
                });
            }
            warn!("site config response is not an object, using local copy");
        }
        Err(ApiError::Unauthorized) => return end_session(ctx),
        Err(e) => warn!(error = %e, "site config unavailable from API, using local copy"),
    }

    let view = match read_local(ctx) {
        Some(config) => SiteConfigView {
            config,
            source: ConfigSource::Local,
        },
        None => SiteConfigView {
            config: SiteConfig::default(),
            source: ConfigSource::Default,
        },
    };
    Outcome::view(view)
}

/// `POST /site-config`. Any failure other than 401 keeps the configuration
/// locally.
pub async fn save_site_config(ctx: &AdminContext, config: &SiteConfig) -> Outcome<SiteConfigView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    let payload = match serde_json::to_value(config) {
        Ok(v) => v,
        Err(e) => return Outcome::notice(Notice::error(format!("Invalid configuration: {e}"))),
    };

    match ctx.call(ApiRequest::post("/site-config", payload.clone())).await {
        Ok(_) => Outcome::view(SiteConfigView {
            config: config.clone(),
            source: ConfigSource::Remote,
        })
        .with_notice(Notice::success("Configuration saved")),
        Err(ApiError::Unauthorized) => end_session(ctx),
        Err(e) => {
            error!(error = %e, "saving site config failed, keeping it locally");
            if let Err(store_err) = ctx.db.write(KEY_SITE_CONFIG, &payload.to_string()) {
                return Outcome::notice(Notice::error(format!(
                    "Could not save the configuration: {store_err}"
                )));
            }
            Outcome::view(SiteConfigView {
                config: config.clone(),
                source: ConfigSource::Local,
            })
            .with_notice(Notice::warning("Configuration saved locally (API error)"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::NoticeLevel;
    use crate::storage;
    use crate::testing::test_context;
    use reqwest::Method;
    use serde_json::json;

    #[test]
    fn test_parse_closed_dates() {
        assert_eq!(
            parse_closed_dates(" 2026-12-25, ,2027-01-01 ,"),
            vec!["2026-12-25".to_string(), "2027-01-01".to_string()]
        );
        assert!(parse_closed_dates("  ").is_empty());
    }

    #[test]
    fn test_config_from_input() {
        let config = config_from_input("", " 23:00 ", &[5, 1, 9, 1], "2026-12-25");
        assert_eq!(config.open_time, None);
        assert_eq!(config.close_time.as_deref(), Some("23:00"));
        assert_eq!(config.open_days, vec![1, 5]);
        assert_eq!(config.closed_dates, vec!["2026-12-25".to_string()]);
    }

    #[tokio::test]
    async fn test_load_falls_back_to_default() {
        let (ctx, _fake) = test_context();
        let view = load_site_config(&ctx).await.view.unwrap();
        assert_eq!(view.source, ConfigSource::Default);
        assert_eq!(view.config.open_days, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(view.config.closed_dates.is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_persists_locally_and_load_reads_it() {
        let (ctx, fake) = test_context();
        fake.respond(
            Method::POST,
            "/site-config",
            Err(ApiError::Server { status: 500, message: "boom".into() }),
        );
        let config = config_from_input("11:00", "23:00", &[1, 2, 3], "2026-12-25");

        let saved = save_site_config(&ctx, &config).await;
        assert_eq!(saved.notice_level(), Some(NoticeLevel::Warning));
        assert_eq!(
            fake.last_body(&Method::POST, "/site-config"),
            Some(json!({
                "open_time": "11:00", "close_time": "23:00",
                "open_days": [1, 2, 3], "closed_dates": ["2026-12-25"]
            }))
        );

        let loaded = load_site_config(&ctx).await.view.unwrap();
        assert_eq!(loaded.source, ConfigSource::Local);
        assert_eq!(loaded.config, config);
    }

    #[tokio::test]
    async fn test_save_401_tears_down() {
        let (ctx, fake) = test_context();
        fake.respond(Method::POST, "/site-config", Err(ApiError::Unauthorized));
        let outcome = save_site_config(&ctx, &SiteConfig::default()).await;
        assert!(outcome.redirects_to_login());
        assert!(!storage::has_session(&ctx.db));
        assert!(ctx.db.read(KEY_SITE_CONFIG).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_prefers_remote() {
        let (ctx, fake) = test_context();
        fake.respond(
            Method::GET,
            "/site-config",
            Ok(json!({"open_time": "10:00", "open_days": [0, 6], "closed_dates": []})),
        );
        let view = load_site_config(&ctx).await.view.unwrap();
        assert_eq!(view.source, ConfigSource::Remote);
        assert_eq!(view.config.open_days, vec![0, 6]);
    }

    #[tokio::test]
    async fn test_load_partial_remote_config_keeps_every_day_open() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/site-config", Ok(json!({"open_time": "11:00"})));
        let view = load_site_config(&ctx).await.view.unwrap();
        assert_eq!(view.source, ConfigSource::Remote);
        assert_eq!(view.config.open_time.as_deref(), Some("11:00"));
        assert_eq!(view.config.open_days, vec![0, 1, 2, 3, 4, 5, 6]);
    }
}
