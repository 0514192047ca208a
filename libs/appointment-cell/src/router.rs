use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::book_appointment))
        .route("/check", post(handlers::check_appointment))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).delete(handlers::cancel_appointment),
        )
        .route("/doctors/{doctor_id}/slots", get(handlers::doctor_day_slots))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
