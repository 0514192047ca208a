use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use clinic_cell::router::clinic_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::create_patient_router;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/clinics", clinic_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/patients", create_patient_router(state.clone()))
        .nest("/appointments", appointment_routes(state))
}
