pub mod auth;
pub mod companies;
pub mod history;
pub mod process;
pub mod users;

use axum::Router;
use axum::routing::{delete, get, patch, post};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/accept-invitation", post(auth::accept_invitation))
        .route("/api/auth/change-password", post(auth::change_password))
        // Users (admin)
        .route("/api/users", get(users::list))
        .route("/api/users/app-mode", get(users::app_mode))
        .route("/api/users/invite", post(users::invite))
        .route("/api/users/create-direct", post(users::create_direct))
        .route("/api/users/{id}/role", patch(users::update_role))
        .route(
            "/api/users/{id}/reset-password-direct",
            post(users::reset_password_direct),
        )
        .route("/api/users/{id}", delete(users::delete))
        // Companies (admin)
        .route("/api/companies", get(companies::list))
        .route(
            "/api/companies/{id}",
            get(companies::get).put(companies::update),
        )
        .route(
            "/api/companies/{id}/template",
            get(companies::download_template).post(companies::upload_template),
        )
        // History
        .route("/api/history", get(history::list))
        .route(
            "/api/history/{id}/download/{file_type}",
            get(history::download_file),
        )
        .route("/api/history/{id}/download-zip", get(history::download_zip))
        // Processing
        .route("/api/process/detect", post(process::detect))
        .route("/api/process/upload-single", post(process::upload_single))
        .route("/api/process/upload-template", post(process::upload_template))
        .route("/api/process/execute", post(process::execute))
}
