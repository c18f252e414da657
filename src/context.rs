//! Admin context: everything a section controller needs for one user.
//!
//! Owns configuration, the local store, the transport, one mutation
//! orchestrator per resource kind (and with it the probe caches), the
//! current section and the most recently loaded orders.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{info, warn};

use crate::api::{ApiRequest, HttpTransport, Transport};
use crate::commands::Section;
use crate::config::AppConfig;
use crate::db::{self, DbState};
use crate::error::ApiError;
use crate::models::{Category, Order, Product, Promo};
use crate::orchestrator::MutationOrchestrator;
use crate::storage;

pub struct AdminContext {
    pub config: AppConfig,
    pub db: Arc<DbState>,
    transport: Arc<dyn Transport>,
    pub categories: MutationOrchestrator<Category>,
    pub products: MutationOrchestrator<Product>,
    pub promos: MutationOrchestrator<Promo>,
    section: Mutex<Section>,
    recent_orders: Mutex<Vec<Order>>,
}

impl AdminContext {
    pub fn new(config: AppConfig, db: Arc<DbState>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            db,
            transport,
            categories: MutationOrchestrator::new(),
            products: MutationOrchestrator::new(),
            promos: MutationOrchestrator::new(),
            section: Mutex::new(Section::Dashboard),
            recent_orders: Mutex::new(Vec::new()),
        }
    }

    /// Open the on-disk store under `config.data_dir` and an HTTP transport
    /// for `config.api_base`.
    pub fn open(config: AppConfig) -> Result<Self, String> {
        let db = db::init(&config.data_dir)?;
        let transport = HttpTransport::new(&config.api_base, config.request_timeout)
            .map_err(|e| e.to_string())?;
        info!(api_base = %config.api_base, data_dir = %config.data_dir.display(), "admin context ready");
        Ok(Self::new(config, Arc::new(db), Arc::new(transport)))
    }

    /// Stored bearer token, if any.
    pub fn token(&self) -> Option<String> {
        storage::token(&self.db)
    }

    /// Authenticated call: attaches the stored token.
    pub async fn call(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let request = request.with_token(self.token());
        self.transport.send(request).await
    }

    /// Call without credentials (login).
    pub async fn call_anonymous(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.transport.send(request.with_token(None)).await
    }

    pub fn section(&self) -> Section {
        match self.section.lock() {
            Ok(s) => *s,
            Err(e) => *e.into_inner(),
        }
    }

    pub fn set_section(&self, section: Section) {
        match self.section.lock() {
            Ok(mut s) => *s = section,
            Err(e) => *e.into_inner() = section,
        }
    }

    pub fn remember_orders(&self, orders: &[Order]) {
        match self.recent_orders.lock() {
            Ok(mut cached) => *cached = orders.to_vec(),
            Err(e) => warn!(error = %e, "recent orders lock poisoned"),
        }
    }

    /// Order from the last dashboard load, by id.
    pub fn cached_order(&self, id: &str) -> Option<Order> {
        self.recent_orders
            .lock()
            .ok()?
            .iter()
            .find(|o| o.id.as_deref() == Some(id))
            .cloned()
    }
}
