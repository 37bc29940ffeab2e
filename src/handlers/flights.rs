use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::flight;
use crate::error::{AppError, AppResult};
use crate::services::flights as flight_service;
use crate::AppState;

/// List all flights
pub async fn list_flights(State(state): State<AppState>) -> AppResult<Json<Vec<flight::Model>>> {
    let flights = flight_service::list_flights(&state.db).await?;
    Ok(Json(flights))
}

/// Get flight details
pub async fn get_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> AppResult<Json<flight::Model>> {
    let flight = flight_service::get_flight(&state.db, flight_id).await?;
    Ok(Json(flight))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub passengers: Option<i32>,
}

/// Search flights by route and departure date
pub async fn search_flights(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<flight::Model>>> {
    let date: NaiveDate = params
        .departure_date
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid departure date, expected YYYY-MM-DD".to_string()))?;

    let flights = flight_service::search_flights(
        &state.db,
        &params.origin,
        &params.destination,
        date,
        params.passengers,
    )
    .await?;

    Ok(Json(flights))
}
