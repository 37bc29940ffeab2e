use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::{hash_password, verify_password};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone: u.phone,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

async fn current_user(state: &AppState, claims: &Claims) -> AppResult<user::Model> {
    user::Entity::find_by_id(claims.sub)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Get the caller's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(current_user(&state, &claims).await?.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Update the caller's profile fields
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let existing = current_user(&state, &claims).await?;

    let mut active: user::ActiveModel = existing.clone().into();
    active.first_name = Set(payload.first_name.unwrap_or(existing.first_name));
    active.last_name = Set(payload.last_name.unwrap_or(existing.last_name));
    active.phone = Set(payload.phone.unwrap_or(existing.phone));

    let updated = active.update(state.db.as_ref()).await?;
    Ok(Json(updated.into()))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Change the caller's password, verifying the current one first
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let existing = current_user(&state, &claims).await?;

    verify_password(&payload.current_password, &existing.password_hash)
        .map_err(|_| AppError::Unauthorized("Current password is incorrect".to_string()))?;

    if payload.new_password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let mut active: user::ActiveModel = existing.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.update(state.db.as_ref()).await?;

    Ok(Json(serde_json::json!({ "message": "Password changed" })))
}
