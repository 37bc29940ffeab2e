use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::ticket::{self, TicketStatus};
use crate::entities::flight;
use crate::error::{AppError, AppResult};
use crate::services::tickets as ticket_service;
use crate::services::tickets::{CreateTicketData, UpdateTicketData};
use crate::utils::jwt::Claims;
use crate::utils::pdf;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub flight_id: Uuid,
    pub passenger_name: String,
    pub passenger_email: String,
    pub price: Option<Decimal>,
    pub seat_number: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub passenger_name: Option<String>,
    pub passenger_email: Option<String>,
    pub seat_number: Option<String>,
}

/// Ticket plus the flight details a client needs to display it.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub ticket_number: String,
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub passenger_name: String,
    pub passenger_email: String,
    pub price: Decimal,
    pub purchase_time: DateTime<Utc>,
    pub seat_number: String,
    pub status: TicketStatus,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

pub fn ticket_response(t: ticket::Model, f: &flight::Model) -> TicketResponse {
    TicketResponse {
        id: t.id,
        ticket_number: t.ticket_number,
        flight_id: t.flight_id,
        user_id: t.user_id,
        passenger_name: t.passenger_name,
        passenger_email: t.passenger_email,
        price: t.price,
        purchase_time: t.purchase_time.with_timezone(&Utc),
        seat_number: t.seat_number,
        status: t.status,
        flight_number: f.flight_number.clone(),
        origin: f.origin.clone(),
        destination: f.destination.clone(),
        departure_time: f.departure_time.with_timezone(&Utc),
        arrival_time: f.arrival_time.with_timezone(&Utc),
    }
}

/// Join a batch of tickets against their flights.
pub async fn ticket_responses(
    state: &AppState,
    tickets: Vec<ticket::Model>,
) -> AppResult<Vec<TicketResponse>> {
    let flights = flight::Entity::find().all(state.db.as_ref()).await?;

    Ok(tickets
        .into_iter()
        .filter_map(|t| {
            let f = flights.iter().find(|f| f.id == t.flight_id)?;
            Some(ticket_response(t, f))
        })
        .collect())
}

async fn single_response(state: &AppState, t: ticket::Model) -> AppResult<TicketResponse> {
    let f = flight::Entity::find_by_id(t.flight_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::Internal("Ticket references a missing flight".to_string()))?;
    Ok(ticket_response(t, &f))
}

/// Book a ticket on a flight
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTicketRequest>,
) -> AppResult<Json<TicketResponse>> {
    let created = ticket_service::create_ticket(
        &state.db,
        &state.events,
        &claims,
        CreateTicketData {
            flight_id: payload.flight_id,
            passenger_name: payload.passenger_name,
            passenger_email: payload.passenger_email,
            price: payload.price,
            seat_number: payload.seat_number,
        },
    )
    .await?;

    Ok(Json(single_response(&state, created).await?))
}

/// List the caller's tickets
pub async fn my_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<TicketResponse>>> {
    let tickets = ticket_service::list_by_user(&state.db, claims.sub).await?;
    Ok(Json(ticket_responses(&state, tickets).await?))
}

/// List the caller's tickets with a given status
pub async fn my_tickets_by_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(status): Path<TicketStatus>,
) -> AppResult<Json<Vec<TicketResponse>>> {
    let tickets = ticket_service::list_by_status(&state.db, claims.sub, status).await?;
    Ok(Json(ticket_responses(&state, tickets).await?))
}

/// Get a ticket by id (owner or admin)
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Json<TicketResponse>> {
    let found = ticket_service::get_ticket(&state.db, &claims, ticket_id).await?;
    Ok(Json(single_response(&state, found).await?))
}

/// Get a ticket by ticket number (owner or admin)
pub async fn get_by_number(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ticket_number): Path<String>,
) -> AppResult<Json<TicketResponse>> {
    let found =
        ticket_service::get_ticket_by_number(&state.db, &claims, &ticket_number).await?;
    Ok(Json(single_response(&state, found).await?))
}

/// Confirm a reserved ticket
pub async fn confirm_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Json<TicketResponse>> {
    let confirmed =
        ticket_service::confirm_ticket(&state.db, &state.events, &claims, ticket_id).await?;
    Ok(Json(single_response(&state, confirmed).await?))
}

/// Cancel a ticket, returning its seat to the flight
pub async fn cancel_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Json<TicketResponse>> {
    let cancelled =
        ticket_service::cancel_ticket(&state.db, &state.events, &claims, ticket_id).await?;
    Ok(Json(single_response(&state, cancelled).await?))
}

/// Update passenger details on a ticket (admin)
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<UpdateTicketRequest>,
) -> AppResult<Json<TicketResponse>> {
    let updated = ticket_service::update_ticket(
        &state.db,
        &state.events,
        ticket_id,
        UpdateTicketData {
            passenger_name: payload.passenger_name,
            passenger_email: payload.passenger_email,
            seat_number: payload.seat_number,
        },
    )
    .await?;

    Ok(Json(single_response(&state, updated).await?))
}

/// Download a ticket receipt as PDF (owner or admin)
pub async fn ticket_pdf(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let found = ticket_service::get_ticket(&state.db, &claims, ticket_id).await?;

    let f = flight::Entity::find_by_id(found.flight_id)
        .one(state.db.as_ref())
        .await?
        .ok_or_else(|| AppError::Internal("Ticket references a missing flight".to_string()))?;

    let bytes = pdf::render_ticket(&found, &f)?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"ticket_{}.pdf\"", found.ticket_number),
        ),
    ];

    Ok((headers, bytes))
}
