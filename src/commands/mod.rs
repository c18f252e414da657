//! Section controllers.
//!
//! One module per admin section. Every controller takes the
//! [`AdminContext`], performs one user action and returns an [`Outcome`].

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod products;
pub mod promos;
pub mod settings;

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::context::AdminContext;
use crate::error::ApiError;
use crate::orchestrator::{Listing, Mutation};
use crate::outcome::{Navigation, Notice, Outcome};
use crate::session::{end_session, login_required, require_session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Dashboard,
    Products,
    Promos,
    Categories,
    Config,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Dashboard,
        Section::Products,
        Section::Promos,
        Section::Categories,
        Section::Config,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Products => "products",
            Section::Promos => "promos",
            Section::Categories => "categories",
            Section::Config => "config",
        }
    }

    /// Header title shown for the section.
    pub fn title(self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::Products => "Product Management",
            Section::Promos => "Promotions",
            Section::Categories => "Categories",
            Section::Config => "Site Configuration",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Section::ALL
            .into_iter()
            .find(|section| section.id() == wanted)
            .ok_or_else(|| format!("unknown section '{s}'"))
    }
}

/// View produced by navigating to a section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionView {
    Dashboard(dashboard::DashboardView),
    Products(products::ProductsView),
    Promos(promos::PromosView),
    Categories(categories::CategoriesView),
    Config(settings::SiteConfigView),
}

/// Record `section` as current and load its view.
pub async fn show_section(ctx: &AdminContext, section: Section) -> Outcome<SectionView> {
    ctx.set_section(section);
    info!(section = %section, "section shown");
    match section {
        Section::Dashboard => dashboard::load_dashboard(ctx).await.map(SectionView::Dashboard),
        Section::Products => products::list_products(ctx).await.map(SectionView::Products),
        Section::Promos => promos::list_promos(ctx).await.map(SectionView::Promos),
        Section::Categories => categories::list_categories(ctx).await.map(SectionView::Categories),
        Section::Config => settings::load_site_config(ctx).await.map(SectionView::Config),
    }
}

/// Manual refresh: reloads the dashboard or the products list, depending on
/// the current section. Other sections are left as they are.
pub async fn refresh(ctx: &AdminContext) -> Outcome<SectionView> {
    match ctx.section() {
        Section::Dashboard => dashboard::load_dashboard(ctx).await.map(SectionView::Dashboard),
        Section::Products => products::list_products(ctx).await.map(SectionView::Products),
        other => {
            info!(section = %other, "nothing to refresh for section");
            Outcome::navigate(Navigation::Stay)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Map a failed call to its outcome: teardown on 401, error notice otherwise.
pub(crate) fn failure<V>(ctx: &AdminContext, err: ApiError, context: &str) -> Outcome<V> {
    match err {
        ApiError::Unauthorized => end_session(ctx),
        e => {
            warn!(error = %e, "{context}");
            Outcome::notice(Notice::error(format!("{context}: {e}")))
        }
    }
}

/// Turn an orchestrator result into an outcome carrying the re-rendered view.
pub(crate) fn mutation_outcome<R, V>(
    ctx: &AdminContext,
    result: Result<Mutation<R>, ApiError>,
    context: &str,
    render: impl FnOnce(Listing<R>) -> V,
) -> Outcome<V> {
    match result {
        Ok(mutation) => Outcome::view(render(mutation.listing)).with_notice(mutation.notice),
        Err(e) => failure(ctx, e, context),
    }
}

/// `Err` carries the login redirect when no token is stored.
pub(crate) fn ensure_session<V>(ctx: &AdminContext) -> Result<(), Outcome<V>> {
    require_session(ctx).map(|_| ()).map_err(login_required)
}
