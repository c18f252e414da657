//! Plain-text rendering of section views for the terminal.

use crate::commands::auth::AuthStatus;
use crate::commands::categories::CategoriesView;
use crate::commands::dashboard::DashboardView;
use crate::commands::products::{ProductForm, ProductsView};
use crate::commands::promos::{day_name, PromoForm, PromosView};
use crate::commands::settings::{ConfigSource, SiteConfigView};
use crate::commands::SectionView;
use crate::models::{Category, Order};
use crate::orchestrator::ListSource;
use crate::outcome::{Notice, NoticeLevel};

/// Price with `.` thousands and `,` decimals, e.g. `1.234,50`.
pub fn format_price(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{grouped},{:02}", cents % 100)
}

fn qty(value: f64) -> String {
    if (value.round() - value).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

pub fn notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!("[{tag}] {}", notice.message)
}

fn source_suffix(source: ListSource) -> &'static str {
    match source {
        ListSource::Remote => "",
        ListSource::Mirror => " (local copy)",
    }
}

pub fn auth_status(status: &AuthStatus) -> String {
    match status {
        AuthStatus::Valid { display_name } => format!("Logged in as {display_name}"),
        AuthStatus::Offline { display_name } => {
            format!("Logged in as {display_name} (not verified, server unreachable)")
        }
    }
}

pub fn dashboard(view: &DashboardView) -> String {
    let k = &view.kpis;
    let mut out = format!("{}\n\n", view.date);
    out.push_str(&format!(
        "Sales today   ${:>14}  {}\n",
        format_price(k.sales_today),
        k.sales_trend
    ));
    out.push_str(&format!("Orders today  {:>15}  {}\n", k.orders_today, k.orders_trend));
    out.push_str(&format!(
        "Peak hour     {:>15}  {} orders\n",
        k.peak_hour,
        qty(k.peak_orders)
    ));
    out.push_str(&format!("Top product   {:>15}  {} sold\n", k.top_product, qty(k.top_sales)));

    match &view.recent_orders {
        Some(recent) => {
            out.push_str(&format!(
                "\nRecent orders ({} delivery, {} pickup)\n",
                recent.delivery, recent.pickup
            ));
            if recent.orders.is_empty() {
                out.push_str("  No recent orders\n");
            }
            for order in &recent.orders {
                out.push_str(&format!(
                    "  #{:<8} {:<24} ${:>12}  {}\n",
                    order.id.as_deref().unwrap_or("-"),
                    order.customer,
                    format_price(order.total),
                    if order.is_delivery() { "delivery" } else { "pickup" }
                ));
            }
        }
        None => out.push_str("\nRecent orders unavailable\n"),
    }
    out
}

pub fn order(order: &Order) -> String {
    let mut out = format!(
        "Order #{}\nCustomer: {}\nType: {}\n",
        order.id.as_deref().unwrap_or("-"),
        order.customer,
        if order.is_delivery() { "delivery" } else { "pickup" }
    );
    if let Some(address) = &order.address {
        out.push_str(&format!("Address: {address}\n"));
    }
    if !order.created_at.is_empty() {
        out.push_str(&format!("Date: {}\n", order.created_at));
    }
    out.push_str("Items:\n");
    if order.items.is_empty() {
        out.push_str("  No items\n");
    }
    for item in &order.items {
        let price = item
            .price
            .map(|p| format!("  ${}", format_price(p)))
            .unwrap_or_default();
        out.push_str(&format!("  {} x {}{price}\n", qty(item.quantity), item.name));
    }
    out.push_str(&format!("Total: ${}\n", format_price(order.total)));
    out
}

pub fn categories(view: &CategoriesView) -> String {
    let mut out = format!("Categories{}\n", source_suffix(view.source));
    if view.categories.is_empty() {
        out.push_str("  No categories\n");
    }
    for c in &view.categories {
        out.push_str(&format!("  {:>5}  {}\n", c.id, c.name));
    }
    out
}

pub fn category_choices(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| format!("  {:>5}  {}\n", c.id, c.name))
        .collect()
}

pub fn products(view: &ProductsView) -> String {
    let mut out = format!("Products: {}{}\n", view.total, source_suffix(view.source));
    for group in &view.groups {
        out.push_str(&format!("\n{}\n", group.category));
        for p in &group.products {
            let hidden = if p.visible { "" } else { "  [hidden]" };
            out.push_str(&format!(
                "  {:>5}  {:<32} ${:>12}{hidden}\n",
                p.id,
                p.name,
                format_price(p.price)
            ));
            for v in &p.variants {
                out.push_str(&format!("         - {}\n", v.name));
            }
        }
    }
    out
}

pub fn product_form(form: &ProductForm) -> String {
    let mut out = format!(
        "Product #{}\nName: {}\nPrice: {}\nCategory: {}\nVisible: {}\n",
        form.id.map(|id| id.to_string()).unwrap_or_else(|| "new".into()),
        form.name,
        form.price,
        form.category_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
        if form.visible { "yes" } else { "no" },
    );
    if !form.description.is_empty() {
        out.push_str(&format!("Description: {}\n", form.description));
    }
    if form.has_variants {
        out.push_str("Variants:\n");
        for (i, v) in form.variants.iter().enumerate() {
            out.push_str(&format!("  {}. {}", i + 1, v.name));
            if !v.description.is_empty() {
                out.push_str(&format!(" ({})", v.description));
            }
            out.push('\n');
        }
    }
    out
}

pub fn promos(view: &PromosView) -> String {
    let mut out = format!(
        "Promotions{}: {} total, {} active, {} inactive\n",
        source_suffix(view.source),
        view.stats.total,
        view.stats.active,
        view.stats.inactive
    );
    for p in &view.promos {
        out.push_str(&format!(
            "  {:>5}  {:<28} ${:>12}  {:<9}  {}\n",
            p.id,
            p.title,
            format_price(p.price),
            day_name(p.day_of_week),
            if p.active { "active" } else { "inactive" }
        ));
    }
    out
}

pub fn promo_form(form: &PromoForm) -> String {
    format!(
        "Promotion #{}\nTitle: {}\nDescription: {}\nPrice: {}\nDay: {}\nActive: {}\n",
        form.id.map(|id| id.to_string()).unwrap_or_else(|| "new".into()),
        form.title,
        form.description,
        form.price,
        day_name(form.day_of_week),
        if form.active { "yes" } else { "no" },
    )
}

pub fn site_config(view: &SiteConfigView) -> String {
    let c = &view.config;
    let source = match view.source {
        ConfigSource::Remote => "server",
        ConfigSource::Local => "local copy",
        ConfigSource::Default => "defaults",
    };
    let days: Vec<&str> = c.open_days.iter().map(|d| day_name(Some(*d))).collect();
    format!(
        "Site configuration ({source})\nOpens: {}\nCloses: {}\nOpen days: {}\nClosed dates: {}\n",
        c.open_time.as_deref().unwrap_or("-"),
        c.close_time.as_deref().unwrap_or("-"),
        if days.is_empty() { "none".to_string() } else { days.join(", ") },
        if c.closed_dates.is_empty() {
            "none".to_string()
        } else {
            c.closed_dates.join(", ")
        },
    )
}

pub fn section(view: &SectionView) -> String {
    match view {
        SectionView::Dashboard(v) => dashboard(v),
        SectionView::Products(v) => products(v),
        SectionView::Promos(v) => promos(v),
        SectionView::Categories(v) => categories(v),
        SectionView::Config(v) => site_config(v),
    }
}
