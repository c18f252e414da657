//! Categories section: list, create, rename, quick-add and delete.

use crate::context::AdminContext;
use crate::models::Category;
use crate::orchestrator::{ListSource, Listing};
use crate::outcome::{Notice, Outcome};
use crate::resource::CategoryDraft;

use super::{ensure_session, failure, mutation_outcome};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoriesView {
    pub categories: Vec<Category>,
    pub source: ListSource,
}

impl From<Listing<Category>> for CategoriesView {
    fn from(listing: Listing<Category>) -> Self {
        Self {
            categories: listing.items,
            source: listing.source,
        }
    }
}

pub async fn list_categories(ctx: &AdminContext) -> Outcome<CategoriesView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    match ctx.categories.fetch_list(ctx).await {
        Ok(listing) => {
            let from_mirror = listing.source == ListSource::Mirror;
            let outcome = Outcome::view(CategoriesView::from(listing));
            if from_mirror {
                outcome.with_notice(Notice::info("Showing locally saved categories"))
            } else {
                outcome
            }
        }
        Err(e) => failure(ctx, e, "Could not load categories"),
    }
}

/// Create (`id == None`) or rename a category.
pub async fn save_category(
    ctx: &AdminContext,
    id: Option<i64>,
    name: &str,
) -> Outcome<CategoriesView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    let draft = match CategoryDraft::new(name) {
        Ok(d) => d,
        Err(e) => return Outcome::notice(Notice::warning(e.to_string())),
    };
    let result = ctx.categories.save(ctx, id, &draft).await;
    mutation_outcome(ctx, result, "Could not save the category", CategoriesView::from)
}

/// Create a category straight from the quick-add input.
pub async fn quick_add_category(ctx: &AdminContext, raw_name: &str) -> Outcome<CategoriesView> {
    save_category(ctx, None, raw_name).await
}

pub async fn delete_category(ctx: &AdminContext, id: i64) -> Outcome<CategoriesView> {
    if let Err(redirect) = ensure_session(ctx) {
        return redirect;
    }
    let result = ctx.categories.delete(ctx, id).await;
    mutation_outcome(ctx, result, "Could not delete the category", CategoriesView::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::mirror;
    use crate::outcome::{Navigation, NoticeLevel};
    use crate::storage;
    use crate::testing::test_context;
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_quick_add_blank_is_warning_without_network() {
        let (ctx, fake) = test_context();
        let outcome = quick_add_category(&ctx, "   ").await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Warning));
        assert!(outcome.view.is_none());
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_quick_add_trims_name() {
        let (ctx, fake) = test_context();
        fake.respond(Method::POST, "/categories", Ok(json!({"id": 1, "name": "Bebidas"})));
        fake.respond(Method::GET, "/categories", Ok(json!([{"id": 1, "name": "Bebidas"}])));

        let outcome = quick_add_category(&ctx, "  Bebidas  ").await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Success));
        assert_eq!(
            fake.last_body(&Method::POST, "/categories"),
            Some(json!({"name": "Bebidas"}))
        );
    }

    #[tokio::test]
    async fn test_rename_404_shows_name_from_mirror() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/categories", Ok(json!([{"id": 2, "name": "Old"}])));
        fake.respond(Method::PUT, "/categories/2", Err(ApiError::NotFound));

        let outcome = save_category(&ctx, Some(2), "Postres").await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Warning));
        let view = outcome.view.unwrap();
        assert_eq!(view.source, ListSource::Mirror);
        assert!(view.categories.iter().any(|c| c.name == "Postres"));
        assert!(mirror::read::<Category>(&ctx.db)
            .unwrap()
            .iter()
            .any(|c| c.id == 2 && c.name == "Postres"));
    }

    #[tokio::test]
    async fn test_rename_success_renders_server_list() {
        let (ctx, fake) = test_context();
        mirror::replace(&ctx.db, &[Category { id: 2, name: "Mirror only".into() }]).unwrap();
        fake.respond(Method::GET, "/categories", Ok(json!([{"id": 2, "name": "Old"}])));
        fake.respond(Method::GET, "/categories", Ok(json!([{"id": 2, "name": "Server"}])));
        fake.respond(Method::PUT, "/categories/2", Ok(json!({})));

        let outcome = save_category(&ctx, Some(2), "Server").await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Success));
        let view = outcome.view.unwrap();
        assert_eq!(view.source, ListSource::Remote);
        assert_eq!(view.categories, vec![Category { id: 2, name: "Server".into() }]);
    }

    #[tokio::test]
    async fn test_delete_401_tears_down_session() {
        let (ctx, fake) = test_context();
        fake.respond(Method::GET, "/categories", Err(ApiError::Unauthorized));

        let outcome = delete_category(&ctx, 3).await;
        assert_eq!(
            outcome.navigation,
            Navigation::Login { after: Duration::from_millis(1500) }
        );
        assert!(storage::token(&ctx.db).is_none());
    }

    #[tokio::test]
    async fn test_list_offline_reads_mirror_with_info() {
        let (ctx, _fake) = test_context();
        mirror::replace(&ctx.db, &[Category { id: 1, name: "Local".into() }]).unwrap();

        let outcome = list_categories(&ctx).await;
        assert_eq!(outcome.notice_level(), Some(NoticeLevel::Info));
        assert_eq!(outcome.view.unwrap().categories.len(), 1);
    }
}
