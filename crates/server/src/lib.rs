pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use services::services::{auth::AdminGate, family::FamilyService};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    family: FamilyService,
    gate: Arc<AdminGate>,
}

impl AppState {
    pub fn new(family: FamilyService, gate: AdminGate) -> Self {
        Self {
            family,
            gate: Arc::new(gate),
        }
    }

    pub fn family(&self) -> &FamilyService {
        &self.family
    }

    pub fn gate(&self) -> &AdminGate {
        &self.gate
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router(&state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
