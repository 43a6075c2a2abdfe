use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{
    add_subject, add_unit, admin_login, admin_logout, contact_submit, delete_subject, delete_unit,
    download_file, edit_subject, edit_unit, get_users, health, register_user, subjects,
};
use crate::state::AppState;

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let max_body = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/register-user", post(register_user))
        .route("/api/get-users", get(get_users))
        .route("/api/contact", post(contact_submit))
        .route("/subjects", get(subjects))
        .route("/download/:filename", get(download_file))
        .route("/admin/login", post(admin_login))
        .route("/admin/logout", post(admin_logout))
        .route("/admin/add_subject", post(add_subject))
        .route("/admin/edit_subject", post(edit_subject))
        .route("/admin/delete_subject/:subject_id", delete(delete_subject))
        .route("/admin/add_unit", post(add_unit))
        .route("/admin/edit_unit", post(edit_unit))
        .route("/admin/delete_unit", delete(delete_unit))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}
