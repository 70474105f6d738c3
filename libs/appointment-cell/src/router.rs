// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // Clients book, look up and reshape their own appointments without an
    // account; the phone number in the request is the credential.
    let public_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/disponibilidad", get(handlers::get_availability))
        .route("/celular/{celular}", get(handlers::get_appointments_by_phone))
        .route("/publica/{id}", put(handlers::update_appointment_public));

    // Staff operations require a valid JWT; the admin role is checked per
    // handler where it matters.
    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/admin/{id}", put(handlers::update_appointment_admin))
        .route("/{id}", delete(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
