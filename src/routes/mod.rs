use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod envelope;
pub mod health;
pub mod middleware_auth;
pub mod policy;
pub mod projects;
pub mod scope;
pub mod tasks;
pub mod validation;

pub use health::health;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    let task_router = Router::new()
        .route("/", post(tasks::routes::create).get(tasks::routes::list))
        .route(
            "/{id}",
            get(tasks::routes::show)
                .put(tasks::routes::update)
                .patch(tasks::routes::update)
                .delete(tasks::routes::delete),
        );

    let projects_router = Router::new()
        .route(
            "/",
            post(projects::routes::create).get(projects::routes::list),
        )
        .route(
            "/{id}",
            get(projects::routes::get)
                .put(projects::routes::update)
                .patch(projects::routes::update)
                .delete(projects::routes::delete),
        )
        .route(
            "/{id}/members",
            get(projects::routes::members).post(projects::routes::add_member),
        )
        .route(
            "/{id}/members/{user_id}",
            axum::routing::delete(projects::routes::remove_member),
        );

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(
            "/api",
            Router::new()
                .nest("/tasks", task_router)
                .nest("/projects", projects_router)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    middleware_auth::require_auth,
                )),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Tasks API written in Rust"
}
