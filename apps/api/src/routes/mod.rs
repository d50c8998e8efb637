pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::screening::handlers as screening;
use crate::sessions::handlers as sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/models", get(screening::handle_list_models))
        // Sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(sessions::handle_get_session)
                .patch(sessions::handle_update_session)
                .delete(sessions::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/resume",
            put(sessions::handle_replace_resume),
        )
        .route("/api/v1/sessions/:id/cancel", post(sessions::handle_cancel))
        // Screening tasks
        .route(
            "/api/v1/sessions/:id/tasks/:task",
            post(screening::handle_run_task),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
