//! Lingo Server
//!
//! Translation management API: stores keyed translations per locale, tags
//! them, searches and exports them, and caches the hot reads in memory.
//!
//! Uses SQLite (embedded) for persistence.

mod error;
mod extractors;
mod handlers;
mod routes;
mod services;
mod settings;
mod storage;
mod validation;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use settings::Settings;
use services::{AuthService, CachePolicy, SearchEngine, TranslationCache, TranslationService};
use storage::{Database, MemoryCache};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub translations: Arc<TranslationService>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub fn build(
        db: Arc<Database>,
        cache: Arc<MemoryCache>,
        policy: CachePolicy,
        jwt_secret: String,
        token_ttl: chrono::Duration,
    ) -> Self {
        let translations = Arc::new(TranslationService::new(
            db.clone(),
            db.clone(),
            SearchEngine::new(db.clone()),
            TranslationCache::new(cache.clone(), policy),
        ));
        let auth_service = Arc::new(AuthService::new(
            db.clone(),
            cache.clone(),
            jwt_secret,
            token_ttl,
        ));

        Self {
            db,
            translations,
            auth_service,
        }
    }
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lingo_server=info,tower_http=info"));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Lingo Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    info!("Loading configuration...");
    let settings = Settings::load().context("Failed to load configuration")?;
    let database_path = settings.database_path();
    info!(
        "Config loaded: bind={}, db={}",
        settings.bind_address, database_path
    );

    tokio::fs::create_dir_all(&settings.data_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create data directory {}",
                settings.data_dir.display()
            )
        })?;

    if settings.uses_default_secret() {
        warn!("LINGO_JWT_SECRET not set, using default (insecure for production)");
    }

    info!("Initializing SQLite database...");
    let db = Arc::new(
        Database::new(
            &database_path,
            settings.max_connections,
            settings.busy_timeout(),
        )
        .await
        .context("Failed to initialize database")?,
    );

    let cache = Arc::new(MemoryCache::new());
    info!("In-memory cache initialized");

    let state = AppState::build(
        db,
        cache,
        settings.cache_policy(),
        settings.jwt_secret.clone(),
        settings.token_ttl(),
    );
    let app = routes::router(state);

    let addr: SocketAddr = settings
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server ready to accept connections");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
