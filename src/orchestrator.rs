//! Save/delete state machine shared by categories, products and promos.
//!
//! Creates go straight to `POST` on the collection. Updates and deletes are
//! probed first: an id the backend does not know is written to the local
//! mirror only, otherwise the remote verb is attempted and its failure
//! degrades to the mirror. A 401 is never handled here; it is returned as
//! `Err(ApiError::Unauthorized)` so the controller can end the session.

use std::marker::PhantomData;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::api::ApiRequest;
use crate::context::AdminContext;
use crate::error::ApiError;
use crate::mirror;
use crate::outcome::Notice;
use crate::probe::{DeleteDecision, MethodDecision, ProbeCache};
use crate::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    Remote,
    Mirror,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing<R> {
    pub items: Vec<R>,
    pub source: ListSource,
}

/// How a mutation was finally carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    /// The primary verb succeeded.
    Remote,
    /// A delete succeeded through one of the POST fallbacks.
    RemoteFallback,
    /// Applied to the local mirror only.
    Degraded,
    /// Nothing was changed.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<R> {
    pub notice: Notice,
    pub listing: Listing<R>,
    pub path: WritePath,
}

pub struct MutationOrchestrator<R> {
    update_probes: ProbeCache<MethodDecision>,
    delete_probes: ProbeCache<DeleteDecision>,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Resource> Default for MutationOrchestrator<R> {
    fn default() -> Self {
        Self {
            update_probes: ProbeCache::new(),
            delete_probes: ProbeCache::new(),
            _kind: PhantomData,
        }
    }
}

impl<R: Resource> MutationOrchestrator<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_decision(&self, id: i64) -> Option<MethodDecision> {
        self.update_probes.get(id)
    }

    pub fn delete_decision(&self, id: i64) -> Option<DeleteDecision> {
        self.delete_probes.get(id)
    }

    /// Remote list, refreshing the mirror; the mirror when the backend fails.
    pub async fn fetch_list(&self, ctx: &AdminContext) -> Result<Listing<R>, ApiError> {
        match ctx.call(ApiRequest::get(R::LIST_PATH)).await {
            Ok(body) => {
                let items = R::list_from_body(&body);
                if let Err(e) = mirror::replace(&ctx.db, &items) {
                    warn!(kind = R::KIND, error = %e, "failed to refresh mirror");
                }
                Ok(Listing {
                    items,
                    source: ListSource::Remote,
                })
            }
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
            Err(e) => {
                warn!(kind = R::KIND, error = %e, "list fetch failed, reading local mirror");
                let items = mirror::read::<R>(&ctx.db).map_err(ApiError::Storage)?;
                Ok(Listing {
                    items,
                    source: ListSource::Mirror,
                })
            }
        }
    }

    async fn list_ids(&self, ctx: &AdminContext) -> Result<Vec<i64>, ApiError> {
        let listing = self.fetch_list(ctx).await?;
        Ok(listing.items.iter().map(|r| r.id()).collect())
    }

    /// Create (`id == None`) or update a record.
    pub async fn save(
        &self,
        ctx: &AdminContext,
        id: Option<i64>,
        draft: &R::Draft,
    ) -> Result<Mutation<R>, ApiError> {
        let label = title_case(R::KIND);
        let payload = R::payload(draft);

        let result = match id {
            None => ctx.call(ApiRequest::post(R::COLLECTION_PATH, payload)).await,
            Some(id) => {
                let decision = self
                    .update_probes
                    .probe(Some(id), || self.list_ids(ctx))
                    .await?;
                if decision == MethodDecision::None {
                    info!(kind = R::KIND, id, "id unknown to backend, saving to mirror only");
                    return self.degraded_save(
                        ctx,
                        Some(id),
                        draft,
                        Notice::warning(format!("{label} saved locally (not available on server)")),
                    );
                }
                ctx.call(ApiRequest::put(R::item_path(id), payload)).await
            }
        };

        match result {
            Ok(_) => {
                let listing = self.fetch_list(ctx).await?;
                let verb = if id.is_some() { "updated" } else { "created" };
                info!(kind = R::KIND, ?id, "saved on backend");
                Ok(Mutation {
                    notice: Notice::success(format!("{label} {verb}")),
                    listing,
                    path: WritePath::Remote,
                })
            }
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
            Err(ApiError::NotFound) => self.degraded_save(
                ctx,
                id,
                draft,
                Notice::warning(format!("{label} not found on server, saved locally")),
            ),
            Err(e) => {
                error!(kind = R::KIND, ?id, error = %e, "remote save failed, degrading to mirror");
                self.degraded_save(
                    ctx,
                    id,
                    draft,
                    Notice::warning(format!("{label} saved locally (API unavailable)")),
                )
            }
        }
    }

    fn degraded_save(
        &self,
        ctx: &AdminContext,
        id: Option<i64>,
        draft: &R::Draft,
        notice: Notice,
    ) -> Result<Mutation<R>, ApiError> {
        let record = match id {
            Some(id) => mirror::upsert::<R>(&ctx.db, id, draft),
            None => mirror::insert_new::<R>(&ctx.db, draft),
        }
        .map_err(ApiError::Storage)?;
        debug!(kind = R::KIND, id = record.id(), label = record.label(), "mirror write");
        Ok(Mutation {
            notice,
            listing: self.mirror_listing(ctx)?,
            path: WritePath::Degraded,
        })
    }

    fn mirror_listing(&self, ctx: &AdminContext) -> Result<Listing<R>, ApiError> {
        Ok(Listing {
            items: mirror::read::<R>(&ctx.db).map_err(ApiError::Storage)?,
            source: ListSource::Mirror,
        })
    }

    /// Delete a record.
    pub async fn delete(&self, ctx: &AdminContext, id: i64) -> Result<Mutation<R>, ApiError> {
        let label = title_case(R::KIND);
        let decision = self
            .delete_probes
            .probe(Some(id), || self.list_ids(ctx))
            .await?;

        if decision == DeleteDecision::None {
            mirror::remove::<R>(&ctx.db, id).map_err(ApiError::Storage)?;
            info!(kind = R::KIND, id, "id unknown to backend, removed from mirror only");
            return Ok(Mutation {
                notice: Notice::warning(format!("{label} deleted locally")),
                listing: self.mirror_listing(ctx)?,
                path: WritePath::Degraded,
            });
        }

        let result = match ctx.call(ApiRequest::delete(R::item_path(id))).await {
            Err(ApiError::MethodNotAllowed) => {
                warn!(kind = R::KIND, id, "DELETE not allowed, trying POST fallbacks");
                if self.delete_fallbacks(ctx, id).await? {
                    let listing = self.fetch_list(ctx).await?;
                    return Ok(Mutation {
                        notice: Notice::success(format!("{label} deleted (fallback)")),
                        listing,
                        path: WritePath::RemoteFallback,
                    });
                }
                Err(ApiError::NotFound)
            }
            other => other,
        };

        match result {
            Ok(_) => {
                let listing = self.fetch_list(ctx).await?;
                info!(kind = R::KIND, id, "deleted on backend");
                Ok(Mutation {
                    notice: Notice::success(format!("{label} deleted")),
                    listing,
                    path: WritePath::Remote,
                })
            }
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
            Err(ApiError::NotFound) => {
                mirror::remove::<R>(&ctx.db, id).map_err(ApiError::Storage)?;
                Ok(Mutation {
                    notice: Notice::warning(format!("{label} deleted (not found on server)")),
                    listing: self.mirror_listing(ctx)?,
                    path: WritePath::Degraded,
                })
            }
            Err(e) => {
                error!(kind = R::KIND, id, error = %e, "remote delete failed");
                if mirror::remove::<R>(&ctx.db, id).map_err(ApiError::Storage)? {
                    Ok(Mutation {
                        notice: Notice::warning(format!("{label} deleted locally (API unavailable)")),
                        listing: self.mirror_listing(ctx)?,
                        path: WritePath::Degraded,
                    })
                } else {
                    Ok(Mutation {
                        notice: Notice::error(format!("Could not delete the {}: {e}", R::KIND)),
                        listing: self.mirror_listing(ctx)?,
                        path: WritePath::Failed,
                    })
                }
            }
        }
    }

    /// `POST /{coll}/{id}/delete`, then `POST /{coll}/delete {id}`.
    /// True when either returned 2xx.
    async fn delete_fallbacks(&self, ctx: &AdminContext, id: i64) -> Result<bool, ApiError> {
        let attempts = [
            ApiRequest::new(Method::POST, format!("{}/delete", R::item_path(id))),
            ApiRequest::post(format!("{}/delete", R::COLLECTION_PATH), json!({ "id": id })),
        ];
        for request in attempts {
            let path = request.path.clone();
            match ctx.call(request).await {
                Ok(_) => return Ok(true),
                Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
                Err(e) => debug!(kind = R::KIND, id, path = %path, error = %e, "delete fallback failed"),
            }
        }
        Ok(false)
    }
}

fn title_case(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
