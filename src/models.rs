//! Canonical records used inside the admin.
//!
//! Backend payloads are heterogeneous; `crate::normalize` translates them into
//! these types. The serde derives describe the canonical shape that is also
//! written to the local mirrors.

use serde::{Deserialize, Serialize};

/// Authenticated user profile as returned by `POST /login`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    /// Name shown in the header, falling back to "Administrator".
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Administrator")
    }
}

/// Persisted bearer token plus profile.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: Option<User>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Product variant. `id == None` marks a variant not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub category_name: Option<String>,
    pub visible: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: Option<u8>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: f64,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<String>,
    pub customer: String,
    pub total: f64,
    pub delivery_type: String,
    pub created_at: String,
    pub address: Option<String>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Delivery when the type mentions home delivery in any of the backend's
    /// spellings; everything else is pickup.
    pub fn is_delivery(&self) -> bool {
        let t = self.delivery_type.to_lowercase();
        t.contains("domicilio") || t.contains("delivery") || t.contains("envio")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourTotal {
    pub hour: u32,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTotal {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: String,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub sales_today: f64,
    pub sales_yesterday: f64,
    pub sales_trend: f64,
    pub orders_today: i64,
    pub orders_trend: f64,
    pub peak_hour: Option<HourTotal>,
    pub top_product: Option<NamedTotal>,
    pub sales_by_hour: Vec<HourTotal>,
    pub top_products: Vec<NamedTotal>,
    pub weekly_sales: Vec<DayTotal>,
}

/// Opening hours and closures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    #[serde(default)]
    pub open_days: Vec<u8>,
    #[serde(default)]
    pub closed_dates: Vec<String>,
}

impl Default for SiteConfig {
    /// No hours set, every day open.
    fn default() -> Self {
        Self {
            open_time: None,
            close_time: None,
            open_days: (0..7).collect(),
            closed_dates: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with_type(t: &str) -> Order {
        Order {
            id: Some("1".into()),
            customer: String::new(),
            total: 0.0,
            delivery_type: t.into(),
            created_at: String::new(),
            address: None,
            items: vec![],
        }
    }

    #[test]
    fn test_delivery_detection_spellings() {
        assert!(order_with_type("Domicilio").is_delivery());
        assert!(order_with_type("DELIVERY").is_delivery());
        assert!(order_with_type("envio express").is_delivery());
        assert!(!order_with_type("retiro").is_delivery());
        assert!(!order_with_type("").is_delivery());
    }

    #[test]
    fn test_display_name_fallback() {
        let anon = User { id: None, name: Some("  ".into()), role: None };
        assert_eq!(anon.display_name(), "Administrator");
        let named = User { id: Some(1), name: Some("Lucia".into()), role: None };
        assert_eq!(named.display_name(), "Lucia");
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session { token: "secret-token".into(), user: None };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_site_config_default_opens_every_day() {
        assert_eq!(SiteConfig::default().open_days, vec![0, 1, 2, 3, 4, 5, 6]);
    }
}
