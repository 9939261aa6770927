use axum::Router;

use crate::AppState;

pub mod admin;
pub mod auth;
pub mod health;
pub mod people;
pub mod tree;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router(state))
        .merge(tree::router(state))
        .merge(people::router(state))
        .merge(auth::router(state))
        .nest("/admin", admin::router(state))
}
