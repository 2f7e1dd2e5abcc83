mod admin;
pub mod auth;
mod categories;
mod error;
mod products;
mod settings;
mod validation;
mod wishlist;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/update-profile", put(auth::update_profile))
        .route("/update-password", put(auth::update_password));

    let product_routes = Router::new()
        .route("/", get(products::list_products).post(products::create_product))
        .route("/me/list", get(products::my_products))
        .route(
            "/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/:id/image", put(products::update_product_image));

    let wishlist_routes = Router::new()
        .route("/me", get(wishlist::my_wishlist))
        .route(
            "/:product_id",
            post(wishlist::add_to_wishlist).delete(wishlist::remove_from_wishlist),
        );

    let admin_routes = Router::new()
        .route("/stats", get(admin::get_stats))
        .route("/users", get(admin::list_users))
        .route("/users/:id", delete(admin::delete_user))
        .route("/products", get(admin::list_products))
        .route("/products/:id", delete(admin::delete_product))
        .route("/categories", post(categories::create_category));

    let settings_routes = Router::new().route(
        "/",
        get(settings::get_settings).put(settings::update_settings),
    );

    // Multipart bodies carry an image; leave headroom over the image cap
    let body_limit = state.config.uploads.max_image_bytes as usize + 1024 * 1024;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/products", product_routes)
        .route("/api/categories", get(categories::list_categories))
        .nest("/api/wishlist", wishlist_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/settings", settings_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(state.config.server.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// With a configured frontend origin, allow credentialed requests from it
/// only; otherwise stay permissive for local development.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

async fn health_check() -> &'static str {
    "OK"
}
