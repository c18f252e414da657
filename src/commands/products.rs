//! Products section.
//!
//! Products are listed grouped by category name. The edit form keeps an
//! ordered list of variants; variants added in the form have no id until the
//! backend persists them.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::ApiRequest;
use crate::context::AdminContext;
use crate::db::DbState;
use crate::error::{ApiError, ValidationError};
use crate::mirror;
use crate::models::{Category, Product, Variant};
use crate::normalize;
use crate::orchestrator::{ListSource, Listing};
use crate::outcome::{Notice, Outcome};
use crate::resource::Resource;

use super::{ensure_session, failure, mutation_outcome};

/// Group label for products without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// Validated product input.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: i64,
    pub visible: bool,
    pub has_variants: bool,
    pub variants: Vec<Variant>,
}

impl ProductDraft {
    /// Variants actually submitted: none unless the variants toggle is on.
    fn submitted_variants(&self) -> &[Variant] {
        if self.has_variants {
            &self.variants
        } else {
            &[]
        }
    }
}

impl Resource for Product {
    type Draft = ProductDraft;

    const KIND: &'static str = "product";
    const MIRROR_KEY: &'static str = "mock_products";
    const COLLECTION_PATH: &'static str = "/products";
    const LIST_PATH: &'static str = "/products/all";

    fn id(&self) -> i64 {
        self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn from_value(v: &Value) -> Option<Self> {
        normalize::product(v)
    }

    fn payload(draft: &ProductDraft) -> Value {
        let variants: Vec<Value> = draft
            .submitted_variants()
            .iter()
            .map(|v| json!({ "id": v.id, "name": v.name, "description": v.description }))
            .collect();
        json!({
            "name": draft.name,
            "description": draft.description,
            "price": draft.price,
            "category_id": draft.category_id,
            "visible": if draft.visible { 1 } else { 0 },
            "has_variants": draft.has_variants,
            "variants": variants,
        })
    }

    fn from_draft(id: i64, draft: &ProductDraft) -> Self {
        Product {
            id,
            name: draft.name.clone(),
            price: draft.price,
            description: draft.description.clone(),
            category_id: Some(draft.category_id),
            category_name: None,
            visible: draft.visible,
            variants: draft.submitted_variants().to_vec(),
        }
    }

    /// Keep the category name of the replaced record, or look it up in the
    /// categories mirror.
    fn complete_local(&mut self, previous: Option<&Self>, db: &DbState) {
        if self.category_name.is_some() {
            return;
        }
        if let Some(prev) = previous.filter(|p| p.category_id == self.category_id) {
            self.category_name = prev.category_name.clone();
        }
        if self.category_name.is_none() {
            if let Some(category_id) = self.category_id {
                self.category_name = mirror::read::<Category>(db)
                    .unwrap_or_default()
                    .into_iter()
                    .find(|c| c.id == category_id)
                    .map(|c| c.name);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Editable product form. `price` is kept as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductForm {
    /// `None` while creating.
    pub id: Option<i64>,
    pub name: String,
    pub price: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub visible: bool,
    pub has_variants: bool,
    pub variants: Vec<Variant>,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            price: String::new(),
            description: String::new(),
            category_id: None,
            visible: true,
            has_variants: false,
            variants: Vec::new(),
        }
    }
}

impl ProductForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_product(product: &Product) -> Self {
        Self {
            id: Some(product.id),
            name: product.name.clone(),
            price: if product.price > 0.0 {
                product.price.to_string()
            } else {
                String::new()
            },
            description: product.description.clone(),
            category_id: product.category_id,
            visible: product.visible,
            has_variants: !product.variants.is_empty(),
            variants: product.variants.clone(),
        }
    }

    /// Append a new, unsaved variant. Blank names are ignored.
    pub fn add_variant(&mut self, name: &str, description: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.variants.push(Variant {
            id: None,
            name: name.to_string(),
            description: description.trim().to_string(),
        });
        true
    }

    pub fn rename_variant(&mut self, index: usize, name: &str) -> bool {
        match self.variants.get_mut(index) {
            Some(v) => {
                v.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_variant_description(&mut self, index: usize, description: &str) -> bool {
        match self.variants.get_mut(index) {
            Some(v) => {
                v.description = description.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_variant(&mut self, index: usize) -> Option<Variant> {
        (index < self.variants.len()).then(|| self.variants.remove(index))
    }

    pub fn validate(&self) -> Result<ProductDraft, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("Enter the product name"));
        }
        let price = self
            .price
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| ValidationError::new("Enter a valid price"))?;
        let category_id = self
            .category_id
            .ok_or_else(|| ValidationError::new("Choose a category"))?;

        Ok(ProductDraft {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            price,
            category_id,
            visible: self.visible,
            has_variants: self.has_variants,
            variants: self.variants.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ProductGroup {
    pub category: String,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductsView {
    pub groups: Vec<ProductGroup>,
    pub total: usize,
    pub source: ListSource,
    /// Choices for the form's category select.
    pub categories: Vec<Category>,
}

impl ProductsView {
    pub fn new(listing: Listing<Product>, categories: Vec<Category>) -> Self {
        Self {
            total: listing.items.len(),
            groups: group_by_category(listing.items),
            source: listing.source,
            categories,
        }
    }
}

/// Group products by category name, keeping first-seen order.
pub fn group_by_category(products: Vec<Product>) -> Vec<ProductGroup> {
    let mut groups: Vec<ProductGroup> = Vec::new();
    for product in products {
        let category = product
            .category_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.products.push(product),
            None => groups.push(ProductGroup {
                category,
                products: vec![product],
            }),
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Controllers
// ---------------------------------------------------------------------------

/// Remote categories, or the local copy when the backend cannot answer.
/// Only a 401 is an error; a broken local copy reads as no choices.
async fn load_categories(ctx: &AdminContext) -> Result<Vec<Category>, ApiError> {
    match ctx.categories.fetch_list(ctx).await {
        Ok(listing) => Ok(listing.items),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
        Err(e) => {
            warn!(error = %e, "category choices unavailable");
            Ok(Vec::new())
        }
    }
}

/// Categories from the local copy only, for views built after a write.
fn local_categories(ctx: &AdminContext) -> Vec<Category> {
    mirror::read::<Category>(&ctx.db).unwrap_or_else(|e| {
        warn!(error = %e, "failed to read local categories");
        Vec::new()
    })
}

/// Product list grouped by category, with the category choices for the form.
pub async fn list_products(ctx: &AdminContext) -> Outcome<ProductsView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    match ctx.products.fetch_list(ctx).await {
        Ok(listing) => {
            let categories = match load_categories(ctx).await {
                Ok(categories) => categories,
                Err(e) => return failure(ctx, e, "Could not load categories"),
            };
            let from_mirror = listing.source == ListSource::Mirror;
            let outcome = Outcome::view(ProductsView::new(listing, categories));
            if from_mirror {
                outcome.with_notice(Notice::info("Showing locally saved products"))
            } else {
                outcome
            }
        }
        Err(e) => failure(ctx, e, "Could not load products"),
    }
}

/// Category choices for the product form.
pub async fn category_choices(ctx: &AdminContext) -> Outcome<Vec<Category>> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    match load_categories(ctx).await {
        Ok(categories) => Outcome::view(categories),
        Err(e) => failure(ctx, e, "Could not load categories"),
    }
}

/// `GET /products/{id}` into an edit form.
pub async fn load_product_form(ctx: &AdminContext, id: i64) -> Outcome<ProductForm> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    match ctx.call(ApiRequest::get(Product::item_path(id))).await {
        Ok(body) => match normalize::product(normalize::record(&body)) {
            Some(product) => {
                debug!(id, variants = product.variants.len(), "product loaded for edit");
                Outcome::view(ProductForm::from_product(&product))
            }
            None => Outcome::notice(Notice::error("Could not load the product")),
        },
        Err(e) => failure(ctx, e, "Could not load the product"),
    }
}

/// Validate and save the form; creates when `form.id` is `None`.
pub async fn save_product(ctx: &AdminContext, form: &ProductForm) -> Outcome<ProductsView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    let draft = match form.validate() {
        Ok(d) => d,
        Err(e) => return Outcome::notice(Notice::warning(e.to_string())),
    };
    let result = ctx.products.save(ctx, form.id, &draft).await;
    mutation_outcome(ctx, result, "Could not save the product", |listing| {
        ProductsView::new(listing, local_categories(ctx))
    })
}

pub async fn delete_product(ctx: &AdminContext, id: i64) -> Outcome<ProductsView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    let result = ctx.products.delete(ctx, id).await;
    mutation_outcome(ctx, result, "Could not delete the product", |listing| {
        ProductsView::new(listing, local_categories(ctx))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Navigation, NoticeLevel};
    use crate::storage;
    use crate::testing::test_context;
    use reqwest::Method;
    use std::time::Duration;

    fn filled_form() -> ProductForm {
        ProductForm {
            name: "Muzzarella".into(),
            price: "4500".into(),
            category_id: Some(1),
            ..ProductForm::new()
        }
    }

    fn product(id: i64, category: Option<&str>) -> Product {
        Product {
            id,
            name: format!("p{id}"),
            price: 1.0,
            description: String::new(),
            category_id: None,
            category_name: category.map(str::to_string),
            visible: true,
            variants: vec![],
        }
    }

    #[test]
    fn test_validation_messages() {
        let mut form = filled_form();
        form.name = "  ".into();
        assert_eq!(form.validate().unwrap_err().0, "Enter the product name");

        let mut form = filled_form();
        form.price = "0".into();
        assert_eq!(form.validate().unwrap_err().0, "Enter a valid price");
        form.price = "abc".into();
        assert!(form.validate().is_err());

        let mut form = filled_form();
        form.category_id = None;
        assert_eq!(form.validate().unwrap_err().0, "Choose a category");

        assert!(filled_form().validate().is_ok());
    }

    #[test]
    fn test_variant_editing() {
        let mut form = filled_form();
        assert!(!form.add_variant("   ", "ignored"));
        assert!(form.add_variant("Small", ""));
        assert!(form.add_variant("Large", "12 slices"));
        assert!(form.rename_variant(0, "Chica"));
        assert!(form.set_variant_description(0, "8 slices"));
        assert!(!form.rename_variant(5, "nope"));
        assert_eq!(form.remove_variant(1).map(|v| v.name), Some("Large".to_string()));
        assert_eq!(form.remove_variant(3), None);
        assert_eq!(form.variants.len(), 1);
        assert_eq!(form.variants[0].description, "8 slices");
    }

    #[test]
    fn test_payload_omits_variants_when_toggle_off() {
        let mut form = filled_form();
        form.add_variant("Small", "");
        form.visible = false;
        let payload = Product::payload(&form.validate().unwrap());
        assert_eq!(payload["variants"], json!([]));
        assert_eq!(payload["visible"], json!(0));
        assert_eq!(payload["has_variants"], json!(false));
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let groups = group_by_category(vec![
            product(1, Some("Pizzas")),
            product(2, None),
            product(3, Some("Pizzas")),
            product(4, Some("Bebidas")),
        ]);
        let names: Vec<_> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(names, vec!["Pizzas", UNCATEGORIZED, "Bebidas"]);
        assert_eq!(groups[0].products.len(), 2);
    }

    #[tokio::test]
    async fn test_new_product_with_variants_round_trips_in_order() {
        let (ctx, fake) = test_context();
        fake.respond(Method::POST, "/products", Ok(json!({"id": 10})));
        fake.respond(Method::GET, "/products/all", Ok(json!([])));
        fake.respond(
            Method::GET,
            "/products/10",
            Ok(json!({
                "id": 10, "name": "Muzzarella", "price": "4500.00", "category_id": 1,
                "visible": 1,
                "variants": [
                    {"id": 31, "name": "Small", "description": ""},
                    {"id": 32, "name": "Large", "description": ""}
                ]
            })),
        );

        let mut form = filled_form();
        form.has_variants = true;
        form.add_variant("Small", "");
        form.add_variant("Large", "");
        let outcome = save_product(&ctx, &form).await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Success));

        let body = fake.last_body(&Method::POST, "/products").unwrap();
        assert_eq!(body["has_variants"], json!(true));
        assert_eq!(
            body["variants"],
            json!([
                {"id": null, "name": "Small", "description": ""},
                {"id": null, "name": "Large", "description": ""}
            ])
        );

        let edit = load_product_form(&ctx, 10).await.view.unwrap();
        assert!(edit.has_variants);
        let names: Vec<_> = edit.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Small", "Large"]);
        assert!(edit.variants.iter().all(|v| v.id.is_some()));
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let (ctx, fake) = test_context();
        let mut form = filled_form();
        form.price = "-3".into();
        let outcome = save_product(&ctx, &form).await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Warning));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_401_clears_session_and_redirects_after_delay() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/products/all", Err(ApiError::Unauthorized));

        let outcome = list_products(&ctx).await;
        for key in storage::SESSION_KEYS {
            assert_eq!(ctx.db.read(key).unwrap(), None);
        }
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Warning));
        assert_eq!(
            outcome.navigation,
            Navigation::Login { after: Duration::from_millis(1500) }
        );
    }

    #[tokio::test]
    async fn test_list_groups_remote_products() {
        let (ctx, fake) = test_context();
        fake.respond(
            Method::GET,
            "/products/all",
            Ok(json!({"data": [
                {"id": 1, "name": "Coca", "price": 900, "category": {"id": 2, "name": "Bebidas"}, "visible": true},
                {"id": 2, "name": "Suelto", "price": 100, "visible": 0}
            ]})),
        );
        let view = list_products(&ctx).await.view.unwrap();
        assert_eq!(view.total, 2);
        assert_eq!(view.groups[0].category, "Bebidas");
        assert_eq!(view.groups[1].category, UNCATEGORIZED);
        assert!(view.categories.is_empty());
    }

    #[tokio::test]
    async fn test_list_carries_category_choices() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/products/all", Ok(json!([])));
        fake.respond(
            Method::GET,
            "/categories",
            Ok(json!([{"id": 1, "name": "Pizzas"}, {"id": 2, "name": "Bebidas"}])),
        );
        let view = list_products(&ctx).await.view.unwrap();
        let names: Vec<_> = view.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Pizzas", "Bebidas"]);
        assert_eq!(fake.calls_matching(&Method::GET, "/categories"), 1);
    }

    #[tokio::test]
    async fn test_list_401_on_categories_tears_down() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/products/all", Ok(json!([])));
        fake.respond(Method::GET, "/categories", Err(ApiError::Unauthorized));
        let outcome = list_products(&ctx).await;
        assert!(outcome.redirects_to_login());
        assert!(!storage::has_session(&ctx.db));
    }

    #[tokio::test]
    async fn test_update_saved_locally_keeps_category_group() {
        let (ctx, fake) = test_context();
        fake.respond(
            Method::GET,
            "/products/all",
            Ok(json!([{
                "id": 5, "name": "Fugazza", "price": 100, "category_id": 1,
                "category": {"id": 1, "name": "Pizzas"}, "visible": 1
            }])),
        );
        fake.respond(Method::PUT, "/products/5", Err(ApiError::NotFound));

        let mut form = filled_form();
        form.id = Some(5);
        let outcome = save_product(&ctx, &form).await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Warning));

        let view = outcome.view.unwrap();
        let names: Vec<_> = view.groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(names, vec!["Pizzas"]);
        assert_eq!(view.groups[0].products[0].name, "Muzzarella");
    }

    #[tokio::test]
    async fn test_offline_create_takes_category_name_from_local_categories() {
        let (ctx, fake) = test_context();
        mirror::replace(&ctx.db, &[Category { id: 1, name: "Pizzas".into() }]).unwrap();
        fake.respond(Method::POST, "/products", Err(ApiError::Network("down".into())));

        let outcome = save_product(&ctx, &filled_form()).await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Warning));
        let view = outcome.view.unwrap();
        assert_eq!(view.groups[0].category, "Pizzas");
    }
}
