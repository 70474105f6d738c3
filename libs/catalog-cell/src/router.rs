// libs/catalog-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn catalog_routes(state: Arc<AppConfig>) -> Router {
    // The catalog is what the booking form renders, so reads stay public.
    let public_routes = Router::new()
        .route("/", get(handlers::list_services))
        .route("/{id}", get(handlers::get_service));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_service))
        .route("/{id}", put(handlers::update_service))
        .route("/{id}", delete(handlers::delete_service))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
