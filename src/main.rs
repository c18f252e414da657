//! Menu Admin CLI.
//!
//! # Usage
//!
//! ```bash
//! menu-admin login -e owner@example.com -p secret
//! menu-admin dashboard --watch
//! menu-admin categories add "Bebidas"
//! menu-admin products add -n "Muzzarella" --price 4500 -c 1 --variant "Grande:8 porciones"
//! menu-admin promos edit 3 --inactive
//! menu-admin config set --open 11:00 --close 23:30 --days 2,3,4,5,6
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use menu_admin_lib::commands::products::ProductForm;
use menu_admin_lib::commands::promos::PromoForm;
use menu_admin_lib::commands::{
    auth, categories, dashboard, products, promos, refresh, settings, show_section,
};
use menu_admin_lib::config::AppConfig;
use menu_admin_lib::logging::init_logging;
use menu_admin_lib::{
    render, AdminContext, Navigation, NoticeLevel, Outcome, Section, SectionView,
};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_SHA"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "menu-admin")]
#[command(author, version, long_version = LONG_VERSION, about = "Menu Admin - catalog, promotions and sales dashboard")]
struct Cli {
    /// Backend base URL, overrides MENU_ADMIN_API_BASE
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// End the session
    Logout,
    /// Verify the stored session with the backend
    Check,
    /// Show sales KPIs and recent orders
    Dashboard {
        /// Keep reloading until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Order details
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage promotions
    Promos {
        #[command(subcommand)]
        action: PromoAction,
    },
    /// Opening hours and closures
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Reload a section (dashboard or products)
    Refresh {
        #[arg(default_value = "dashboard")]
        section: Section,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    Show { id: String },
}

#[derive(Subcommand)]
enum CategoryAction {
    List,
    Add { name: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
}

#[derive(Args)]
struct ProductFields {
    #[arg(short, long)]
    name: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(short, long)]
    description: Option<String>,
    /// Category id
    #[arg(short, long)]
    category: Option<i64>,
    /// Hide the product from the menu
    #[arg(long, conflicts_with = "visible")]
    hidden: bool,
    #[arg(long)]
    visible: bool,
    /// Add a variant as `name` or `name:description` (repeatable)
    #[arg(long = "variant")]
    variants: Vec<String>,
}

#[derive(Subcommand)]
enum ProductAction {
    List,
    Show {
        id: i64,
    },
    Add {
        #[command(flatten)]
        fields: ProductFields,
    },
    Edit {
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
        /// Remove the variant at this 1-based position (repeatable)
        #[arg(long = "remove-variant")]
        remove_variants: Vec<usize>,
        /// Drop every variant
        #[arg(long)]
        no_variants: bool,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args)]
struct PromoFields {
    #[arg(short, long)]
    title: Option<String>,
    #[arg(short, long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<String>,
    /// Day of week, 0 = Sunday
    #[arg(long)]
    day: Option<u8>,
    #[arg(long, conflicts_with = "active")]
    inactive: bool,
    #[arg(long)]
    active: bool,
}

#[derive(Subcommand)]
enum PromoAction {
    List,
    Show {
        id: i64,
    },
    Add {
        #[command(flatten)]
        fields: PromoFields,
    },
    Edit {
        id: i64,
        #[command(flatten)]
        fields: PromoFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set {
        /// Opening time, `HH:MM`; empty to unset
        #[arg(long)]
        open: Option<String>,
        /// Closing time, `HH:MM`; empty to unset
        #[arg(long)]
        close: Option<String>,
        /// Comma-separated open days, 0 = Sunday
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<u8>>,
        /// Comma-separated closed dates
        #[arg(long)]
        closed_dates: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("menu-admin: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::from_env().context("loading configuration")?;
    if let Some(base) = cli.api_base.as_deref() {
        config.api_base = menu_admin_lib::api::normalize_api_base(base);
    }
    let _log_guard = init_logging(&config.log_dir())
        .map_err(anyhow::Error::msg)
        .context("initializing logging")?;
    info!(version = LONG_VERSION, "menu-admin starting");

    let ctx = AdminContext::open(config)
        .map_err(anyhow::Error::msg)
        .context("opening local store")?;

    let ok = match cli.command {
        Commands::Login { email, password } => {
            let outcome = auth::login(&ctx, &email, &password).await;
            report(&ctx, outcome, |v| format!("Logged in as {} ({})\n", v.display_name, v.role)).await
        }
        Commands::Logout => {
            auth::logout(&ctx).await;
            println!("Logged out");
            true
        }
        Commands::Check => report(&ctx, auth::check_auth(&ctx).await, render::auth_status).await,
        Commands::Dashboard { watch } => {
            let outcome = show_section(&ctx, Section::Dashboard).await;
            let ok = report(&ctx, outcome, render::section).await;
            if ok && watch {
                watch_dashboard(ctx).await;
            }
            ok
        }
        Commands::Orders {
            action: OrderAction::Show { id },
        } => {
            let outcome = dashboard::order_detail(&ctx, Some(&id)).await;
            report(&ctx, outcome, render::order).await
        }
        Commands::Categories { action } => run_categories(&ctx, action).await,
        Commands::Products { action } => run_products(&ctx, action).await,
        Commands::Promos { action } => run_promos(&ctx, action).await,
        Commands::Config { action } => run_config(&ctx, action).await,
        Commands::Refresh { section } => {
            ctx.set_section(section);
            report(&ctx, refresh(&ctx).await, render::section).await
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Print the notice and view, then follow the navigation. Returns false when
/// the action failed or the session ended.
async fn report<V>(ctx: &AdminContext, outcome: Outcome<V>, render_view: impl Fn(&V) -> String) -> bool {
    if let Some(notice) = &outcome.notice {
        eprintln!("{}", render::notice(notice));
    }
    if let Some(view) = &outcome.view {
        print!("{}", render_view(view));
    }
    match outcome.navigation {
        Navigation::Login { after } => {
            tokio::time::sleep(after).await;
            if ctx.token().is_none() {
                eprintln!("Please log in again: menu-admin login -e <email> -p <password>");
            }
            false
        }
        Navigation::Stay | Navigation::Dashboard => {
            !matches!(outcome.notice_level(), Some(NoticeLevel::Error))
        }
    }
}

async fn watch_dashboard(ctx: AdminContext) {
    let ctx = Arc::new(ctx);
    let cancel = CancellationToken::new();
    let mut handle = dashboard::spawn_refresh_loop(ctx.clone(), cancel.clone(), |outcome| {
        if let Some(notice) = &outcome.notice {
            eprintln!("{}", render::notice(notice));
        }
        if let Some(view) = &outcome.view {
            print!("\n{}", render::dashboard(view));
        }
    });

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        _ = &mut handle => false,
    };
    if interrupted {
        info!("interrupted, stopping dashboard watch");
        cancel.cancel();
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "refresh loop did not stop cleanly");
        }
    } else {
        eprintln!("Session ended. Please log in again.");
    }
}

async fn run_categories(ctx: &AdminContext, action: CategoryAction) -> bool {
    let outcome = match action {
        CategoryAction::List => show_section(ctx, Section::Categories).await,
        CategoryAction::Add { name } => {
            categories::quick_add_category(ctx, &name).await.map(SectionView::Categories)
        }
        CategoryAction::Rename { id, name } => {
            categories::save_category(ctx, Some(id), &name).await.map(SectionView::Categories)
        }
        CategoryAction::Delete { id } => {
            categories::delete_category(ctx, id).await.map(SectionView::Categories)
        }
    };
    report(ctx, outcome, render::section).await
}

fn parse_variant(raw: &str) -> (&str, &str) {
    match raw.split_once(':') {
        Some((name, description)) => (name, description),
        None => (raw, ""),
    }
}

fn apply_product_fields(form: &mut ProductForm, fields: ProductFields) {
    if let Some(name) = fields.name {
        form.name = name;
    }
    if let Some(price) = fields.price {
        form.price = price;
    }
    if let Some(description) = fields.description {
        form.description = description;
    }
    if fields.category.is_some() {
        form.category_id = fields.category;
    }
    if fields.hidden {
        form.visible = false;
    }
    if fields.visible {
        form.visible = true;
    }
    for raw in &fields.variants {
        let (name, description) = parse_variant(raw);
        form.add_variant(name, description);
    }
    form.has_variants = !form.variants.is_empty();
}

async fn run_products(ctx: &AdminContext, action: ProductAction) -> bool {
    match action {
        ProductAction::List => report(ctx, show_section(ctx, Section::Products).await, render::section).await,
        ProductAction::Show { id } => {
            let outcome = products::load_product_form(ctx, id).await;
            report(ctx, outcome, render::product_form).await
        }
        ProductAction::Add { fields } => {
            let mut form = ProductForm::new();
            apply_product_fields(&mut form, fields);
            if form.category_id.is_none() {
                if let Some(choices) = products::category_choices(ctx).await.view {
                    eprintln!("Choose a category with --category <id>:");
                    eprint!("{}", render::category_choices(&choices));
                }
            }
            report(ctx, products::save_product(ctx, &form).await, render::products).await
        }
        ProductAction::Edit {
            id,
            fields,
            remove_variants,
            no_variants,
        } => {
            let loaded = products::load_product_form(ctx, id).await;
            let Some(mut form) = loaded.view.clone() else {
                return report(ctx, loaded, render::product_form).await;
            };
            let mut positions = remove_variants;
            positions.sort_unstable_by(|a, b| b.cmp(a));
            for position in positions {
                if position == 0 || form.remove_variant(position - 1).is_none() {
                    eprintln!("No variant at position {position}");
                }
            }
            if no_variants {
                form.variants.clear();
            }
            apply_product_fields(&mut form, fields);
            report(ctx, products::save_product(ctx, &form).await, render::products).await
        }
        ProductAction::Delete { id } => {
            report(ctx, products::delete_product(ctx, id).await, render::products).await
        }
    }
}

fn apply_promo_fields(form: &mut PromoForm, fields: PromoFields) {
    if let Some(title) = fields.title {
        form.title = title;
    }
    if let Some(description) = fields.description {
        form.description = description;
    }
    if let Some(price) = fields.price {
        form.price = price;
    }
    if fields.day.is_some() {
        form.day_of_week = fields.day;
    }
    if fields.inactive {
        form.active = false;
    }
    if fields.active {
        form.active = true;
    }
}

async fn run_promos(ctx: &AdminContext, action: PromoAction) -> bool {
    match action {
        PromoAction::List => report(ctx, show_section(ctx, Section::Promos).await, render::section).await,
        PromoAction::Show { id } => report(ctx, promos::load_promo_form(ctx, id).await, render::promo_form).await,
        PromoAction::Add { fields } => {
            let mut form = PromoForm::new();
            apply_promo_fields(&mut form, fields);
            report(ctx, promos::save_promo(ctx, &form).await, render::promos).await
        }
        PromoAction::Edit { id, fields } => {
            let loaded = promos::load_promo_form(ctx, id).await;
            let Some(mut form) = loaded.view.clone() else {
                return report(ctx, loaded, render::promo_form).await;
            };
            apply_promo_fields(&mut form, fields);
            report(ctx, promos::save_promo(ctx, &form).await, render::promos).await
        }
        PromoAction::Delete { id } => report(ctx, promos::delete_promo(ctx, id).await, render::promos).await,
    }
}

async fn run_config(ctx: &AdminContext, action: ConfigAction) -> bool {
    match action {
        ConfigAction::Show => report(ctx, show_section(ctx, Section::Config).await, render::section).await,
        ConfigAction::Set {
            open,
            close,
            days,
            closed_dates,
        } => {
            let loaded = settings::load_site_config(ctx).await;
            let Some(current) = loaded.view.clone() else {
                return report(ctx, loaded, render::site_config).await;
            };
            let current = current.config;
            let config = settings::config_from_input(
                open.as_deref().or(current.open_time.as_deref()).unwrap_or(""),
                close.as_deref().or(current.close_time.as_deref()).unwrap_or(""),
                days.as_deref().unwrap_or(&current.open_days),
                &closed_dates.unwrap_or_else(|| current.closed_dates.join(",")),
            );
            report(ctx, settings::save_site_config(ctx, &config).await, render::site_config).await
        }
    }
}
