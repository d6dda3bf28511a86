use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing, Router};
use person_common::store::UserStore;

use super::users;
use crate::query::UserQueryService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub users: Arc<UserQueryService>,
}

pub fn add_routes(router: Router, state: AppState, max_body_size: usize) -> Router {
    let users = Router::new()
        .route(
            "/users",
            routing::get(users::list_users).post(users::create_user),
        )
        .route(
            "/users/:id",
            routing::put(users::update_user).delete(users::delete_user),
        )
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state);

    router
        .route("/", routing::get(index))
        .route("/_readiness", routing::get(index))
        .route("/_liveness", routing::get(index))
        .merge(users)
}

pub async fn index() -> &'static str {
    "person-enricher api"
}
