use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn clinic_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_my_clinics).post(handlers::create_clinic))
        .route(
            "/{clinic_id}",
            get(handlers::get_clinic)
                .put(handlers::update_clinic)
                .delete(handlers::delete_clinic),
        )
        .route("/{clinic_id}/members", post(handlers::add_member))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
