//! Promotions section.

use serde_json::{json, Value};

use crate::api::ApiRequest;
use crate::context::AdminContext;
use crate::error::ValidationError;
use crate::models::Promo;
use crate::normalize;
use crate::orchestrator::{ListSource, Listing};
use crate::outcome::{Notice, Outcome};
use crate::resource::Resource;

use super::{ensure_session, failure, mutation_outcome};

/// Sunday-first, matching `day_of_week` 0..=6.
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub fn day_name(day: Option<u8>) -> &'static str {
    match day {
        Some(d) => DAY_NAMES.get(usize::from(d)).copied().unwrap_or("-"),
        None => "No day",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromoDraft {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub day_of_week: u8,
    pub active: bool,
}

impl Resource for Promo {
    type Draft = PromoDraft;

    const KIND: &'static str = "promo";
    const MIRROR_KEY: &'static str = "mock_promos";
    const COLLECTION_PATH: &'static str = "/promos";
    const LIST_PATH: &'static str = "/promos";

    fn id(&self) -> i64 {
        self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn from_value(v: &Value) -> Option<Self> {
        normalize::promo(v)
    }

    fn payload(draft: &PromoDraft) -> Value {
        json!({
            "title": draft.title,
            "description": draft.description,
            "price": draft.price,
            "day_of_week": draft.day_of_week,
            "active": if draft.active { 1 } else { 0 },
        })
    }

    fn from_draft(id: i64, draft: &PromoDraft) -> Self {
        Promo {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            price: draft.price,
            day_of_week: Some(draft.day_of_week),
            active: draft.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromoForm {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub price: String,
    pub day_of_week: Option<u8>,
    pub active: bool,
}

impl Default for PromoForm {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            description: String::new(),
            price: String::new(),
            day_of_week: None,
            active: true,
        }
    }
}

impl PromoForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_promo(promo: &Promo) -> Self {
        Self {
            id: Some(promo.id),
            title: promo.title.clone(),
            description: promo.description.clone(),
            price: promo.price.to_string(),
            day_of_week: promo.day_of_week,
            active: promo.active,
        }
    }

    pub fn validate(&self) -> Result<PromoDraft, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::new("Enter the promotion title"));
        }
        let price = self
            .price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| ValidationError::new("Enter a valid price"))?;
        let day_of_week = self
            .day_of_week
            .filter(|d| *d <= 6)
            .ok_or_else(|| ValidationError::new("Select a day of the week"))?;

        Ok(PromoDraft {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            price,
            day_of_week,
            active: self.active,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromoStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

impl PromoStats {
    pub fn from_promos(promos: &[Promo]) -> Self {
        let active = promos.iter().filter(|p| p.active).count();
        Self {
            total: promos.len(),
            active,
            inactive: promos.len() - active,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromosView {
    pub promos: Vec<Promo>,
    pub stats: PromoStats,
    pub source: ListSource,
}

impl From<Listing<Promo>> for PromosView {
    fn from(listing: Listing<Promo>) -> Self {
        Self {
            stats: PromoStats::from_promos(&listing.items),
            promos: listing.items,
            source: listing.source,
        }
    }
}

pub async fn list_promos(ctx: &AdminContext) -> Outcome<PromosView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    match ctx.promos.fetch_list(ctx).await {
        Ok(listing) => {
            let from_mirror = listing.source == ListSource::Mirror;
            let outcome = Outcome::view(PromosView::from(listing));
            if from_mirror {
                outcome.with_notice(Notice::info("Showing locally saved promotions"))
            } else {
                outcome
            }
        }
        Err(e) => failure(ctx, e, "Could not load promotions"),
    }
}

pub async fn load_promo_form(ctx: &AdminContext, id: i64) -> Outcome<PromoForm> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    match ctx.call(ApiRequest::get(Promo::item_path(id))).await {
        Ok(body) => match normalize::promo(normalize::record(&body)) {
            Some(promo) => Outcome::view(PromoForm::from_promo(&promo)),
            None => Outcome::notice(Notice::error("Could not load the promotion")),
        },
        Err(e) => failure(ctx, e, "Could not load the promotion"),
    }
}

pub async fn save_promo(ctx: &AdminContext, form: &PromoForm) -> Outcome<PromosView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    let draft = match form.validate() {
        Ok(d) => d,
        Err(e) => return Outcome::notice(Notice::warning(e.to_string())),
    };
    let result = ctx.promos.save(ctx, form.id, &draft).await;
    mutation_outcome(ctx, result, "Could not save the promotion", PromosView::from)
}

pub async fn delete_promo(ctx: &AdminContext, id: i64) -> Outcome<PromosView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    let result = ctx.promos.delete(ctx, id).await;
    mutation_outcome(ctx, result, "Could not delete the promotion", PromosView::from)
}
