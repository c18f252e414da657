//! Dashboard section: KPIs, recent orders, order detail and the periodic
//! refresh loop.

use std::sync::Arc;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiRequest;
use crate::context::AdminContext;
use crate::error::ApiError;
use crate::models::{DashboardStats, Order};
use crate::normalize;
use crate::outcome::{Notice, Outcome};
use crate::session::end_session;

use super::{ensure_session, failure, Section};

#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub sales_today: f64,
    pub sales_trend: String,
    pub orders_today: i64,
    pub orders_trend: String,
    /// `HH:00`, or `--:--` when unknown.
    pub peak_hour: String,
    pub peak_orders: f64,
    /// Product name, or `-` when unknown.
    pub top_product: String,
    pub top_sales: f64,
}

impl Kpis {
    pub fn from_stats(stats: &DashboardStats) -> Self {
        let (peak_hour, peak_orders) = match &stats.peak_hour {
            Some(p) => (format!("{:02}:00", p.hour), p.total),
            None => ("--:--".to_string(), 0.0),
        };
        let (top_product, top_sales) = match &stats.top_product {
            Some(t) => (t.name.clone(), t.total),
            None => ("-".to_string(), 0.0),
        };
        Self {
            sales_today: stats.sales_today,
            sales_trend: sales_trend_label(stats),
            orders_today: stats.orders_today,
            orders_trend: format!("{}% vs yesterday", stats.orders_trend),
            peak_hour,
            peak_orders,
            top_product,
            top_sales,
        }
    }
}

/// "New day" when yesterday had no sales and today has some, otherwise the
/// signed percentage against yesterday.
pub fn sales_trend_label(stats: &DashboardStats) -> String {
    if stats.sales_yesterday == 0.0 && stats.sales_today > 0.0 {
        return "New day".to_string();
    }
    let sign = if stats.sales_trend > 0.0 { "+" } else { "" };
    format!("{sign}{}% vs yesterday", stats.sales_trend)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentOrders {
    pub orders: Vec<Order>,
    pub delivery: usize,
    pub pickup: usize,
}

impl RecentOrders {
    pub fn new(orders: Vec<Order>) -> Self {
        let delivery = orders.iter().filter(|o| o.is_delivery()).count();
        Self {
            pickup: orders.len() - delivery,
            delivery,
            orders,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    /// Long local date for the header.
    pub date: String,
    pub kpis: Kpis,
    /// Raw series for the charts.
    pub stats: DashboardStats,
    /// `None` when the orders endpoint failed.
    pub recent_orders: Option<RecentOrders>,
}

pub fn current_date_label() -> String {
    Local::now().format("%A, %-d %B %Y").to_string()
}

pub async fn load_dashboard(ctx: &AdminContext) -> Outcome<DashboardView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }

    let stats = match ctx.call(ApiRequest::get("/dashboard/stats")).await {
        Ok(body) => normalize::dashboard_stats(&body),
        Err(e) => return failure(ctx, e, "Could not load dashboard statistics"),
    };

    let recent_orders = match load_recent_orders(ctx).await {
        Ok(recent) => Some(recent),
        Err(ApiError::Unauthorized) => return end_session(ctx),
        Err(e) => {
            warn!(error = %e, "recent orders unavailable");
            None
        }
    };

    debug!(
        sales_today = stats.sales_today,
        orders_today = stats.orders_today,
        "dashboard loaded"
    );
    Outcome::view(DashboardView {
        date: current_date_label(),
        kpis: Kpis::from_stats(&stats),
        stats,
        recent_orders,
    })
}

/// `GET /orders?limit=N`. The loaded orders are kept for the detail view.
pub async fn load_recent_orders(ctx: &AdminContext) -> Result<RecentOrders, ApiError> {
    let path = format!("/orders?limit={}", ctx.config.recent_orders_limit);
    let body = ctx.call(ApiRequest::get(path)).await?;
    let orders = normalize::orders(&body);
    ctx.remember_orders(&orders);
    Ok(RecentOrders::new(orders))
}

/// An order id must fit in a single path segment.
fn is_path_segment(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '?', '#'])
}

/// Order detail: the already loaded order when available, otherwise
/// `GET /orders/{id}`.
pub async fn order_detail(ctx: &AdminContext, id: Option<&str>) -> Outcome<Order> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    let Some(id) = id.map(str::trim).filter(|s| is_path_segment(s)) else {
        debug!(?id, "order id missing or not a path segment");
        return Outcome::notice(Notice::info("Order details unavailable"));
    };
    if let Some(order) = ctx.cached_order(id) {
        return Outcome::view(order);
    }
    match ctx.call(ApiRequest::get(format!("/orders/{id}"))).await {
        Ok(body) if body.is_object() => Outcome::view(normalize::order(normalize::record(&body))),
        Ok(_) => Outcome::notice(Notice::error("Could not load order details")),
        Err(e) => failure(ctx, e, "Could not load order details"),
    }
}

/// Reload the dashboard every `refresh_interval` while it is the current
/// section. Stops on cancellation or when the session ends.
pub fn spawn_refresh_loop<F>(
    ctx: Arc<AdminContext>,
    cancel: CancellationToken,
    mut on_refresh: F,
) -> JoinHandle<()>
where
    F: FnMut(Outcome<DashboardView>) + Send + 'static,
{
    tokio::spawn(async move {
        let cadence = ctx.config.refresh_interval;
        info!(interval_ms = cadence.as_millis() as u64, "Starting dashboard refresh loop");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(cadence) => {}
            }
            if ctx.section() != Section::Dashboard {
                debug!(section = %ctx.section(), "dashboard not visible, skipping refresh");
                continue;
            }
            let outcome = load_dashboard(&ctx).await;
            let session_ended = outcome.redirects_to_login();
            on_refresh(outcome);
            if session_ended {
                warn!("dashboard refresh loop stopped: session ended");
                return;
            }
        }
        info!("Dashboard refresh loop cancelled");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HourTotal, NamedTotal};
    use crate::outcome::NoticeLevel;
    use crate::testing::test_context;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn stats(today: f64, yesterday: f64, trend: f64) -> DashboardStats {
        DashboardStats {
            sales_today: today,
            sales_yesterday: yesterday,
            sales_trend: trend,
            ..DashboardStats::default()
        }
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(sales_trend_label(&stats(100.0, 0.0, 0.0)), "New day");
        assert_eq!(sales_trend_label(&stats(120.0, 100.0, 20.0)), "+20% vs yesterday");
        assert_eq!(sales_trend_label(&stats(80.0, 100.0, -20.0)), "-20% vs yesterday");
        assert_eq!(sales_trend_label(&stats(0.0, 0.0, 0.0)), "0% vs yesterday");
        assert_eq!(sales_trend_label(&stats(1.0, 2.0, 12.5)), "+12.5% vs yesterday");
    }

    #[test]
    fn test_kpis_placeholders_and_padding() {
        let empty = Kpis::from_stats(&DashboardStats::default());
        assert_eq!(empty.peak_hour, "--:--");
        assert_eq!(empty.peak_orders, 0.0);
        assert_eq!(empty.top_product, "-");

        let full = Kpis::from_stats(&DashboardStats {
            peak_hour: Some(HourTotal { hour: 9, total: 14.0 }),
            top_product: Some(NamedTotal { name: "Fugazzeta".into(), total: 31.0 }),
            ..DashboardStats::default()
        });
        assert_eq!(full.peak_hour, "09:00");
        assert_eq!(full.top_product, "Fugazzeta");
    }

    #[tokio::test]
    async fn test_load_dashboard_counts_delivery_and_pickup() {
        let (ctx, fake) = test_context();
        fake.respond(
            Method::GET,
            "/dashboard/stats",
            Ok(json!({"salesToday": 1500, "salesYesterday": 0, "ordersToday": 3})),
        );
        fake.respond(
            Method::GET,
            "/orders?limit=15",
            Ok(json!([
                {"id": 1, "delivery_type": "Domicilio", "total": 10},
                {"order_id": "2", "type": "retiro", "amount": "20"},
                {"uuid": "x3", "delivery": "ENVIO", "price": 5}
            ])),
        );

        let view = load_dashboard(&ctx).await.view.unwrap();
        assert_eq!(view.kpis.sales_trend, "New day");
        let recent = view.recent_orders.unwrap();
        assert_eq!((recent.delivery, recent.pickup), (2, 1));
        assert!(ctx.cached_order("x3").is_some());
    }

    #[tokio::test]
    async fn test_orders_failure_keeps_kpis() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/dashboard/stats", Ok(json!({"salesToday": 10})));

        let view = load_dashboard(&ctx).await.view.unwrap();
        assert!(view.recent_orders.is_none());
        assert_eq!(view.kpis.sales_today, 10.0);
    }

    #[tokio::test]
    async fn test_order_detail_prefers_loaded_order() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/orders?limit=15", Ok(json!([{"id": "A1", "customer_name": "Ana"}])));
        fake.respond(
            Method::GET,
            "/orders/B2",
            Ok(json!({"id": "B2", "name": "Beto", "items": [{"product_name": "Empanada", "qty": 6}]})),
        );
        load_recent_orders(&ctx).await.unwrap();

        let cached = order_detail(&ctx, Some("A1")).await.view.unwrap();
        assert_eq!(cached.customer, "Ana");
        assert_eq!(fake.calls_matching(&Method::GET, "/orders/A1"), 0);

        let fetched = order_detail(&ctx, Some("B2")).await.view.unwrap();
        assert_eq!(fetched.items[0].name, "Empanada");
        assert_eq!(fetched.items[0].quantity, 6.0);

        let missing = order_detail(&ctx, None).await;
        assert_eq!(missing.notice_level(), Some(NoticeLevel::Info));
    }

    #[tokio::test]
    async fn test_order_detail_rejects_ids_that_alter_the_path() {
        let (ctx, fake) = test_context();
        for id in ["5?x=1", "5/items", "5#top", "../users"] {
            let outcome = order_detail(&ctx, Some(id)).await;
            assert_eq!(outcome.notice_level(), Some(NoticeLevel::Info), "{id}");
            assert!(outcome.view.is_none());
        }
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_loop_reloads_only_on_dashboard_and_stops_on_cancel() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/dashboard/stats", Ok(json!({})));
        fake.respond(Method::GET, "/orders?limit=15", Ok(json!([])));
        let ctx = Arc::new(ctx);
        let seen = Arc::new(Mutex::new(0usize));

        ctx.set_section(Section::Promos);
        let cancel = CancellationToken::new();
        let counter = seen.clone();
        let handle = spawn_refresh_loop(ctx.clone(), cancel.clone(), move |_| {
            *counter.lock().unwrap() += 1;
        });

        tokio::time::sleep(Duration::from_millis(70)).await;
        assert_eq!(*seen.lock().unwrap(), 0);

        ctx.set_section(Section::Dashboard);
        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(*seen.lock().unwrap() >= 1);
        assert!(fake.calls_matching(&Method::GET, "/dashboard/stats") >= 1);
    }
}
