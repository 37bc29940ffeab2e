use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::notification;
use crate::error::{AppError, AppResult};
use crate::services::notifications as notification_service;
use crate::utils::jwt::Claims;
use crate::AppState;

/// List the caller's notifications, newest first
pub async fn my_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<notification::Model>>> {
    let notifications = notification_service::list_for_user(&state.db, claims.sub).await?;
    Ok(Json(notifications))
}

/// List the caller's unseen notifications
pub async fn unseen_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<notification::Model>>> {
    let notifications = notification_service::list_unseen_for_user(&state.db, claims.sub).await?;
    Ok(Json(notifications))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: String,
    pub end: String,
}

fn parse_bound(value: &str, which: &str) -> AppResult<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} date, expected RFC 3339", which)))
}

/// List the caller's notifications in a creation-time range
pub async fn notifications_in_range(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<RangeParams>,
) -> AppResult<Json<Vec<notification::Model>>> {
    let start = parse_bound(&params.start, "start")?;
    let end = parse_bound(&params.end, "end")?;

    if start > end {
        return Err(AppError::BadRequest("start must not be after end".to_string()));
    }

    let notifications =
        notification_service::list_in_range(&state.db, claims.sub, start, end).await?;
    Ok(Json(notifications))
}

/// Mark a notification as seen (idempotent)
pub async fn mark_seen(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<notification::Model>> {
    let updated = notification_service::mark_seen(&state.db, &claims, notification_id).await?;
    Ok(Json(updated))
}
