//! Backend payload normalization.
//!
//! The backend is inconsistent about field names and scalar encodings
//! (`customer_name` vs `name` vs `customer`, `visible: 1` vs `true`, numbers as
//! strings, lists wrapped in `{ "data": [...] }`). Everything that reads a
//! backend body goes through this module so the rest of the crate only sees
//! the canonical records in [`crate::models`].

use serde_json::Value;

use crate::models::{
    Category, DashboardStats, DayTotal, HourTotal, NamedTotal, Order, OrderItem, Product, Promo,
    SiteConfig, User, Variant,
};

// ---------------------------------------------------------------------------
// Scalar helpers
// ---------------------------------------------------------------------------

/// First non-empty string among `keys`. Numbers are rendered so ids can be
/// read either way.
pub fn value_str(v: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match v.get(*key) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// First value among `keys` that parses as a number (numeric strings included).
pub fn value_f64(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| v.get(*key).and_then(as_f64))
}

pub fn value_i64(v: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| v.get(*key).and_then(as_i64))
}

/// Booleans arrive as `true`, `1` or `"1"`.
pub fn value_bool(v: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| v.get(*key).and_then(as_bool))
}

/// Items of a list body. Accepts a bare array or `{ "data": [...] }`.
pub fn list_items(body: &Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Single-record body, unwrapping `{ "data": {...} }` when present.
pub fn record(body: &Value) -> &Value {
    match body.get("data") {
        Some(inner @ Value::Object(_)) => inner,
        _ => body,
    }
}

// ---------------------------------------------------------------------------
// Catalog records
// ---------------------------------------------------------------------------

pub fn category(v: &Value) -> Option<Category> {
    let id = value_i64(v, &["id"])?;
    let name = value_str(v, &["name", "title"]).unwrap_or_default();
    Some(Category { id, name })
}

pub fn variant(v: &Value) -> Option<Variant> {
    let name = value_str(v, &["name"])?;
    Some(Variant {
        id: value_i64(v, &["id"]),
        name,
        description: value_str(v, &["description"]).unwrap_or_default(),
    })
}

pub fn product(v: &Value) -> Option<Product> {
    let v = record(v);
    let id = value_i64(v, &["id"])?;
    let category = v.get("category").filter(|c| c.is_object());
    let category_id = value_i64(v, &["category_id"])
        .or_else(|| category.and_then(|c| value_i64(c, &["id"])));
    let category_name = category
        .and_then(|c| value_str(c, &["name"]))
        .or_else(|| value_str(v, &["category_name"]));
    let variants = v
        .get("variants")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(variant).collect())
        .unwrap_or_default();

    Some(Product {
        id,
        name: value_str(v, &["name"]).unwrap_or_default(),
        price: value_f64(v, &["price"]).unwrap_or(0.0),
        description: value_str(v, &["description"]).unwrap_or_default(),
        category_id,
        category_name,
        visible: value_bool(v, &["visible"]).unwrap_or(false),
        variants,
    })
}

/// Day of week 0..=6; anything else reads as unset.
fn day_of_week(v: &Value) -> Option<u8> {
    value_i64(v, &["day_of_week"])
        .filter(|d| (0..=6).contains(d))
        .map(|d| d as u8)
}

pub fn promo(v: &Value) -> Option<Promo> {
    let v = record(v);
    let id = value_i64(v, &["id"])?;
    Some(Promo {
        id,
        title: value_str(v, &["title", "name"]).unwrap_or_default(),
        description: value_str(v, &["description"]).unwrap_or_default(),
        price: value_f64(v, &["price"]).unwrap_or(0.0),
        day_of_week: day_of_week(v),
        active: value_bool(v, &["active"]).unwrap_or(false),
    })
}

// ---------------------------------------------------------------------------
// Orders and dashboard
// ---------------------------------------------------------------------------

pub fn order_item(v: &Value) -> OrderItem {
    OrderItem {
        name: value_str(v, &["name", "product_name", "title"]).unwrap_or_default(),
        quantity: value_f64(v, &["quantity", "qty"]).unwrap_or(1.0),
        price: value_f64(v, &["price", "unit_price"]),
    }
}

pub fn order(v: &Value) -> Order {
    let v = record(v);
    let items = ["items", "products", "lines"]
        .iter()
        .find_map(|key| v.get(*key).and_then(Value::as_array))
        .map(|items| items.iter().map(order_item).collect())
        .unwrap_or_default();

    Order {
        id: value_str(v, &["id", "order_id", "uuid"]),
        customer: value_str(v, &["customer_name", "name", "customer"]).unwrap_or_default(),
        total: value_f64(v, &["total", "amount", "price"]).unwrap_or(0.0),
        delivery_type: value_str(v, &["delivery_type", "type", "delivery"]).unwrap_or_default(),
        created_at: value_str(v, &["created_at", "date"]).unwrap_or_default(),
        address: value_str(v, &["address", "delivery_address"]),
        items,
    }
}

pub fn orders(body: &Value) -> Vec<Order> {
    list_items(body).iter().map(order).collect()
}

fn hour_total(v: &Value) -> Option<HourTotal> {
    let hour = value_i64(v, &["hour"]).filter(|h| (0..24).contains(h))?;
    Some(HourTotal {
        hour: hour as u32,
        total: value_f64(v, &["total"]).unwrap_or(0.0),
    })
}

fn named_total(v: &Value) -> Option<NamedTotal> {
    Some(NamedTotal {
        name: value_str(v, &["name"])?,
        total: value_f64(v, &["total"]).unwrap_or(0.0),
    })
}

fn day_total(v: &Value) -> Option<DayTotal> {
    Some(DayTotal {
        date: value_str(v, &["date"])?,
        total: value_f64(v, &["total"]).unwrap_or(0.0),
    })
}

fn series<T>(v: &Value, keys: &[&str], f: fn(&Value) -> Option<T>) -> Vec<T> {
    keys.iter()
        .find_map(|key| v.get(*key).and_then(Value::as_array))
        .map(|items| items.iter().filter_map(f).collect())
        .unwrap_or_default()
}

/// `GET /dashboard/stats` uses camelCase keys; snake_case is accepted too.
pub fn dashboard_stats(v: &Value) -> DashboardStats {
    let v = record(v);
    DashboardStats {
        sales_today: value_f64(v, &["salesToday", "sales_today"]).unwrap_or(0.0),
        sales_yesterday: value_f64(v, &["salesYesterday", "sales_yesterday"]).unwrap_or(0.0),
        sales_trend: value_f64(v, &["salesTrend", "sales_trend"]).unwrap_or(0.0),
        orders_today: value_i64(v, &["ordersToday", "orders_today"]).unwrap_or(0),
        orders_trend: value_f64(v, &["ordersTrend", "orders_trend"]).unwrap_or(0.0),
        peak_hour: ["peakHour", "peak_hour"]
            .iter()
            .find_map(|key| v.get(*key).and_then(hour_total)),
        top_product: ["topProduct", "top_product"]
            .iter()
            .find_map(|key| v.get(*key).and_then(named_total)),
        sales_by_hour: series(v, &["salesByHour", "sales_by_hour"], hour_total),
        top_products: series(v, &["topProducts", "top_products"], named_total),
        weekly_sales: series(v, &["weeklySales", "weekly_sales"], day_total),
    }
}

// ---------------------------------------------------------------------------
// Site config and auth
// ---------------------------------------------------------------------------

pub fn site_config(v: &Value) -> Option<SiteConfig> {
    let v = record(v);
    if !v.is_object() {
        return None;
    }
    let open_days = v
        .get("open_days")
        .and_then(Value::as_array)
        .map(|days| {
            days.iter()
                .filter_map(as_i64)
                .filter(|d| (0..=6).contains(d))
                .map(|d| d as u8)
                .collect()
        })
        .unwrap_or_else(|| (0..7).collect());
    let closed_dates = v
        .get("closed_dates")
        .and_then(Value::as_array)
        .map(|dates| {
            dates
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(SiteConfig {
        open_time: value_str(v, &["open_time"]),
        close_time: value_str(v, &["close_time"]),
        open_days,
        closed_dates,
    })
}

pub fn user(v: &Value) -> Option<User> {
    if !v.is_object() {
        return None;
    }
    Some(User {
        id: value_i64(v, &["id"]),
        name: value_str(v, &["name"]),
        role: value_str(v, &["role"]),
    })
}

/// `POST /login` → `{token, user}`.
pub fn login_response(v: &Value) -> Option<(String, Option<User>)> {
    let token = value_str(v, &["token", "access_token"])?;
    Some((token, v.get("user").and_then(user)))
}
