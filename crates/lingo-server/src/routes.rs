//! HTTP router

use crate::handlers::{self, tags, translations};
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route(
            "/profile",
            get(handlers::auth::profile).put(handlers::auth::update_profile),
        )
        .route(
            "/translations",
            get(translations::index).post(translations::store),
        )
        .route("/translations/latest", get(translations::latest))
        .route("/translations/search", get(translations::search))
        .route("/translations/export", get(translations::export))
        .route("/translations/export/:locale", get(translations::export_locale))
        .route(
            "/translations/:id",
            get(translations::show)
                .put(translations::update)
                .delete(translations::destroy),
        )
        .route("/translations/:id/tags", post(translations::manage_tags))
        .route("/tags", get(tags::index).post(tags::store))
}
