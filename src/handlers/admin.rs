use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::notification::{self, NotificationType};
use crate::entities::{flight, ticket, user};
use crate::error::{AppError, AppResult};
use crate::handlers::tickets::{ticket_responses, TicketResponse};
use crate::handlers::users::UserResponse;
use crate::services::flights as flight_service;
use crate::services::flights::{CreateFlightData, UpdateFlightData};
use crate::services::notifications as notification_service;
use crate::services::tickets as ticket_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFlightRequest {
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub base_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFlightRequest {
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub total_seats: Option<i32>,
    pub base_price: Option<Decimal>,
}

/// Create a flight
pub async fn create_flight(
    State(state): State<AppState>,
    Json(payload): Json<CreateFlightRequest>,
) -> AppResult<Json<flight::Model>> {
    if payload.total_seats <= 0 {
        return Err(AppError::BadRequest(
            "total_seats must be positive".to_string(),
        ));
    }

    let created = flight_service::create_flight(
        &state.db,
        CreateFlightData {
            flight_number: payload.flight_number,
            origin: payload.origin,
            destination: payload.destination,
            departure_time: payload.departure_time,
            arrival_time: payload.arrival_time,
            total_seats: payload.total_seats,
            base_price: payload.base_price,
        },
    )
    .await?;

    Ok(Json(created))
}

/// Update a flight. A schedule change notifies every ticket holder.
pub async fn update_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
    Json(payload): Json<UpdateFlightRequest>,
) -> AppResult<Json<flight::Model>> {
    let updated = flight_service::update_flight(
        &state.db,
        &state.mailer,
        flight_id,
        UpdateFlightData {
            flight_number: payload.flight_number,
            origin: payload.origin,
            destination: payload.destination,
            departure_time: payload.departure_time,
            arrival_time: payload.arrival_time,
            total_seats: payload.total_seats,
            base_price: payload.base_price,
        },
    )
    .await?;

    Ok(Json(updated))
}

/// Delete a flight along with its tickets
pub async fn delete_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    flight_service::delete_flight(&state.db, flight_id).await?;
    Ok(Json(serde_json::json!({ "message": "Flight deleted" })))
}

/// List all user accounts
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = user::Entity::find().all(state.db.as_ref()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Get a user account
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let found = user::Entity::find_by_id(user_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(found.into()))
}

/// Delete a user account. An account with tickets on file cannot be removed;
/// the tickets have to be cancelled and purged first.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    user::Entity::find_by_id(user_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let ticket_count = ticket::Entity::find()
        .filter(ticket::Column::UserId.eq(user_id))
        .count(state.db.as_ref())
        .await?;

    if ticket_count > 0 {
        return Err(AppError::Conflict(
            "User has tickets on file and cannot be deleted".to_string(),
        ));
    }

    user::Entity::delete_by_id(user_id).exec(state.db.as_ref()).await?;

    Ok(Json(serde_json::json!({ "message": "User deleted" })))
}

/// List a user's tickets
pub async fn tickets_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<TicketResponse>>> {
    let tickets = ticket_service::list_by_user(&state.db, user_id).await?;
    Ok(Json(ticket_responses(&state, tickets).await?))
}

/// List a flight's tickets
pub async fn tickets_by_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> AppResult<Json<Vec<TicketResponse>>> {
    let tickets = ticket_service::list_by_flight(&state.db, flight_id).await?;
    Ok(Json(ticket_responses(&state, tickets).await?))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRangeParams {
    pub start: String,
    pub end: String,
}

/// List tickets purchased within a time range
pub async fn tickets_by_purchase_range(
    State(state): State<AppState>,
    Query(params): Query<PurchaseRangeParams>,
) -> AppResult<Json<Vec<TicketResponse>>> {
    let start = params
        .start
        .parse::<DateTime<Utc>>()
        .map_err(|_| AppError::BadRequest("Invalid start date, expected RFC 3339".to_string()))?;
    let end = params
        .end
        .parse::<DateTime<Utc>>()
        .map_err(|_| AppError::BadRequest("Invalid end date, expected RFC 3339".to_string()))?;

    if start > end {
        return Err(AppError::BadRequest(
            "start must not be after end".to_string(),
        ));
    }

    let tickets = ticket_service::list_by_purchase_range(&state.db, start, end).await?;
    Ok(Json(ticket_responses(&state, tickets).await?))
}

/// List notifications of a given type across all users
pub async fn notifications_by_type(
    State(state): State<AppState>,
    Path(kind): Path<NotificationType>,
) -> AppResult<Json<Vec<notification::Model>>> {
    let notifications = notification_service::list_by_type(&state.db, kind).await?;
    Ok(Json(notifications))
}
