use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::config::AppMode;
use crate::db;
use crate::directory;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::valid_role;
use crate::routes::auth::{generate_token, hash_token};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub include_deleted: Option<bool>,
}

#[derive(Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct CreateDirectRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordDirectRequest {
    pub new_password: String,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let users = state
        .directory
        .list(params.include_deleted.unwrap_or(false))
        .await
        .map_err(directory::directory_error)?;

    Ok(Json(json!({
        "users": users,
        "total": users.len(),
    })))
}

pub async fn app_mode(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;
    Ok(Json(json!({ "mode": state.config.app_mode.as_str() })))
}

/// Invite a new user by email. A tombstoned account with the same email is
/// restored instead of duplicated; an active one is a conflict.
pub async fn invite(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if !valid_role(&req.role) {
        return Err(AppError::BadRequest(format!("Unknown role: {}", req.role)));
    }

    let user = state
        .directory
        .invite(&email, &req.role)
        .await
        .map_err(directory::directory_error)?;

    // A fresh invitation supersedes anything outstanding for this user
    db::invitation_tokens::invalidate_for_user(&state.pool, user.id).await?;

    let token = generate_token();
    let token_hash = hash_token(&token);
    db::invitation_tokens::create(
        &state.pool,
        user.id,
        &token_hash,
        Utc::now() + Duration::days(7),
    )
    .await?;

    if let Some(ref mailer) = state.system_mailer {
        let accept_url = format!(
            "{}/accept-invitation?token={token}",
            state.config.base_url
        );
        if let Err(e) = mailer.send_invitation(&user.email, &accept_url).await {
            tracing::error!("Failed to send invitation email: {e}");
        }
    } else {
        tracing::warn!("System SMTP not configured. Invitation token for {email}: {token}");
    }

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.invited",
        "user",
        Some(user.id),
        Some(json!({ "role": req.role })),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": format!("Invitation sent to {email}"),
    })))
}

/// Desktop-mode account creation: no invitation mail, the password is set on
/// the spot by the administrator sitting at the machine.
pub async fn create_direct(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateDirectRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if state.config.app_mode != AppMode::Desktop {
        return Err(AppError::Forbidden(
            "Direct account creation is only available in desktop mode".to_string(),
        ));
    }

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if !valid_role(&req.role) {
        return Err(AppError::BadRequest(format!("Unknown role: {}", req.role)));
    }
    password::validate_policy(&req.password).map_err(AppError::BadRequest)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = match db::users::find_by_email(&state.pool, &email).await? {
        Some(existing) if !existing.is_deleted => {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        Some(existing) => {
            db::users::restore(&state.pool, existing.id, &req.role, Some(&pw_hash)).await?
        }
        None => db::users::create(&state.pool, &email, Some(&pw_hash), &req.role).await?,
    };

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.created_direct",
        "user",
        Some(user.id),
        Some(json!({ "role": req.role })),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": format!("User created: {email}"),
        "user": user,
    })))
}

pub async fn update_role(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if !valid_role(&req.role) {
        return Err(AppError::BadRequest(format!("Unknown role: {}", req.role)));
    }

    let user = state
        .directory
        .update_role(id, &req.role)
        .await
        .map_err(directory::role_error)?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.role_updated",
        "user",
        Some(id),
        Some(json!({ "new_role": req.role })),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "user": user,
    })))
}

/// Desktop-mode password override for a user who cannot receive reset mail.
pub async fn reset_password_direct(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResetPasswordDirectRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if state.config.app_mode != AppMode::Desktop {
        return Err(AppError::Forbidden(
            "Direct password reset is only available in desktop mode".to_string(),
        ));
    }

    password::validate_policy(&req.new_password).map_err(AppError::BadRequest)?;

    let user = db::users::find_active_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let pw_hash = password::hash(&req.new_password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;

    db::refresh_tokens::delete_all_for_user(&state.pool, user.id).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.password_reset_direct",
        "user",
        Some(user.id),
        None,
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": format!("Password reset for {}", user.email),
    })))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let user = state
        .directory
        .delete(id)
        .await
        .map_err(directory::delete_error)?;

    // A deleted user must not keep an active session
    db::refresh_tokens::delete_all_for_user(&state.pool, user.id).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.deleted",
        "user",
        Some(id),
        None,
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "User deleted",
    })))
}
