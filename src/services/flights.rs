use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use uuid::Uuid;

use crate::entities::notification::{self, NotificationType};
use crate::entities::ticket::{self, TicketStatus};
use crate::entities::flight;
use crate::error::{AppError, AppResult};
use crate::mailer::Mailer;

// ============ Seat inventory ============
//
// The counters move only through these operations. Both are single
// conditional UPDATEs so concurrent bookings against the same flight are
// serialized by the database's row lock: of N concurrent attempts at one
// remaining seat, exactly one sees rows_affected == 1.

pub async fn reserve_seat<C: ConnectionTrait>(conn: &C, flight_id: Uuid) -> AppResult<()> {
    let result = flight::Entity::update_many()
        .col_expr(
            flight::Column::AvailableSeats,
            Expr::col(flight::Column::AvailableSeats).sub(1),
        )
        .filter(flight::Column::Id.eq(flight_id))
        .filter(flight::Column::AvailableSeats.gt(0))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::CapacityExceeded(
            "No available seats for this flight".to_string(),
        ));
    }
    Ok(())
}

/// Returns a seat to the pool. A no-op at full capacity, so the counter can
/// never exceed `total_seats`.
pub async fn release_seat<C: ConnectionTrait>(conn: &C, flight_id: Uuid) -> AppResult<()> {
    flight::Entity::update_many()
        .col_expr(
            flight::Column::AvailableSeats,
            Expr::col(flight::Column::AvailableSeats).add(1),
        )
        .filter(flight::Column::Id.eq(flight_id))
        .filter(
            Expr::col(flight::Column::AvailableSeats).lt(Expr::col(flight::Column::TotalSeats)),
        )
        .exec(conn)
        .await?;

    Ok(())
}

/// Change a flight's capacity, preserving the booked-seat count. Fails when
/// the new total would not cover seats already sold.
pub async fn resize_capacity<C: ConnectionTrait>(
    conn: &C,
    flight_id: Uuid,
    new_total: i32,
) -> AppResult<()> {
    let result = flight::Entity::update_many()
        .col_expr(
            flight::Column::AvailableSeats,
            Expr::val(new_total).sub(
                Expr::col(flight::Column::TotalSeats).sub(Expr::col(flight::Column::AvailableSeats)),
            ),
        )
        .col_expr(flight::Column::TotalSeats, Expr::val(new_total).into())
        .filter(flight::Column::Id.eq(flight_id))
        .filter(
            Expr::val(new_total).gte(
                Expr::col(flight::Column::TotalSeats).sub(Expr::col(flight::Column::AvailableSeats)),
            ),
        )
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::BadRequest(
            "Total seats cannot be reduced below the number of booked seats".to_string(),
        ));
    }
    Ok(())
}

// ============ Flight management ============

pub struct CreateFlightData {
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub base_price: Decimal,
}

#[derive(Default)]
pub struct UpdateFlightData {
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub total_seats: Option<i32>,
    pub base_price: Option<Decimal>,
}

pub async fn create_flight(
    db: &DatabaseConnection,
    data: CreateFlightData,
) -> AppResult<flight::Model> {
    let existing = flight::Entity::find()
        .filter(flight::Column::FlightNumber.eq(&data.flight_number))
        .one(db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Flight number already exists".to_string()));
    }

    if data.total_seats <= 0 {
        return Err(AppError::BadRequest("Total seats must be positive".to_string()));
    }

    let new_flight = flight::ActiveModel {
        id: Set(Uuid::new_v4()),
        flight_number: Set(data.flight_number),
        origin: Set(data.origin),
        destination: Set(data.destination),
        departure_time: Set(data.departure_time.into()),
        arrival_time: Set(data.arrival_time.into()),
        total_seats: Set(data.total_seats),
        // A new flight starts fully available
        available_seats: Set(data.total_seats),
        base_price: Set(data.base_price),
    };

    Ok(new_flight.insert(db).await?)
}

/// Update flight details. The available-seat counter is never written here;
/// capacity changes go through `resize_capacity` and a schedule change fans
/// out notifications to every holder of a live ticket.
pub async fn update_flight(
    db: &DatabaseConnection,
    mailer: &Arc<dyn Mailer>,
    flight_id: Uuid,
    data: UpdateFlightData,
) -> AppResult<flight::Model> {
    let existing = flight::Entity::find_by_id(flight_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    if let Some(number) = &data.flight_number {
        if *number != existing.flight_number {
            let taken = flight::Entity::find()
                .filter(flight::Column::FlightNumber.eq(number))
                .filter(flight::Column::Id.ne(flight_id))
                .one(db)
                .await?;
            if taken.is_some() {
                return Err(AppError::Conflict("Flight number already exists".to_string()));
            }
        }
    }

    let schedule_changed = data
        .departure_time
        .is_some_and(|t| t != existing.departure_time.with_timezone(&Utc))
        || data
            .arrival_time
            .is_some_and(|t| t != existing.arrival_time.with_timezone(&Utc));

    if let Some(total) = data.total_seats {
        if total <= 0 {
            return Err(AppError::BadRequest("Total seats must be positive".to_string()));
        }
        resize_capacity(db, flight_id, total).await?;
    }

    // The seat counters are deliberately left out: they move only through
    // the seat-inventory operations above.
    let active = flight::ActiveModel {
        id: sea_orm::ActiveValue::Unchanged(existing.id),
        flight_number: Set(data.flight_number.unwrap_or(existing.flight_number)),
        origin: Set(data.origin.unwrap_or(existing.origin)),
        destination: Set(data.destination.unwrap_or(existing.destination)),
        departure_time: Set(data
            .departure_time
            .map(Into::into)
            .unwrap_or(existing.departure_time)),
        arrival_time: Set(data
            .arrival_time
            .map(Into::into)
            .unwrap_or(existing.arrival_time)),
        total_seats: sea_orm::ActiveValue::NotSet,
        available_seats: sea_orm::ActiveValue::NotSet,
        base_price: Set(data.base_price.unwrap_or(existing.base_price)),
    };

    active.update(db).await?;

    let updated = flight::Entity::find_by_id(flight_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    // The flight row is already updated; a fan-out failure is logged, not
    // surfaced, same as the ticket observers.
    if schedule_changed {
        if let Err(e) = notify_schedule_change(db, mailer, &updated).await {
            tracing::warn!(
                flight_number = %updated.flight_number,
                error = %e,
                "Failed to fan out schedule change notifications"
            );
        }
    }

    Ok(updated)
}

pub async fn delete_flight(db: &DatabaseConnection, flight_id: Uuid) -> AppResult<()> {
    let result = flight::Entity::delete_by_id(flight_id).exec(db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Flight not found".to_string()));
    }
    Ok(())
}

pub async fn get_flight(db: &DatabaseConnection, flight_id: Uuid) -> AppResult<flight::Model> {
    flight::Entity::find_by_id(flight_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))
}

pub async fn list_flights(db: &DatabaseConnection) -> AppResult<Vec<flight::Model>> {
    Ok(flight::Entity::find().all(db).await?)
}

/// Search by route and departure date, optionally requiring enough seats
/// for the whole party.
pub async fn search_flights(
    db: &DatabaseConnection,
    origin: &str,
    destination: &str,
    departure_date: NaiveDate,
    passengers: Option<i32>,
) -> AppResult<Vec<flight::Model>> {
    let day_start = departure_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::BadRequest("Invalid departure date".to_string()))?
        .and_utc();
    let day_end = day_start + chrono::Duration::days(1);

    let flights = flight::Entity::find()
        .filter(flight::Column::Origin.eq(origin))
        .filter(flight::Column::Destination.eq(destination))
        .filter(flight::Column::DepartureTime.gte(day_start))
        .filter(flight::Column::DepartureTime.lt(day_end))
        .all(db)
        .await?;

    let wanted = passengers.unwrap_or(0).max(0);
    Ok(flights
        .into_iter()
        .filter(|f| f.available_seats >= wanted)
        .collect())
}

/// Notify every holder of a non-cancelled ticket that the flight schedule
/// moved. Email delivery is fire-and-forget, like the ticket notifier.
async fn notify_schedule_change(
    db: &DatabaseConnection,
    mailer: &Arc<dyn Mailer>,
    flight: &flight::Model,
) -> AppResult<()> {
    let tickets = ticket::Entity::find()
        .filter(ticket::Column::FlightId.eq(flight.id))
        .filter(ticket::Column::Status.ne(TicketStatus::Cancelled))
        .all(db)
        .await?;

    for t in tickets {
        let message = format!(
            "The schedule of flight {} has changed. New departure: {}, new arrival: {}. \
             Your ticket #{} remains valid.",
            flight.flight_number,
            flight.departure_time.with_timezone(&Utc),
            flight.arrival_time.with_timezone(&Utc),
            t.ticket_number,
        );

        let record = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(t.user_id),
            message: Set(message.clone()),
            seen: Set(false),
            created_at: Set(Utc::now().into()),
            ticket_id: Set(Some(t.id)),
            r#type: Set(NotificationType::FlightScheduleChange),
        };
        record.insert(db).await?;

        let mailer = mailer.clone();
        let to = t.passenger_email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, "Flight Schedule Change", &message).await {
                tracing::warn!(%to, error = %e, "Failed to send schedule change email");
            }
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn reserve_seat_fails_when_flight_is_full() {
        // The conditional UPDATE touches no row when available_seats == 0
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
            .into_connection();

        let err = reserve_seat(&db, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));
    }

    #[tokio::test]
    async fn reserve_seat_succeeds_when_a_seat_remains() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }])
            .into_connection();

        assert!(reserve_seat(&db, Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn release_seat_is_a_noop_at_capacity() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
            .into_connection();

        assert!(release_seat(&db, Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn renaming_a_flight_to_a_taken_number_is_a_conflict() {
        let existing = flight::Model {
            id: Uuid::new_v4(),
            flight_number: "FL100".to_string(),
            origin: "Vienna".to_string(),
            destination: "Lisbon".to_string(),
            departure_time: Utc::now().into(),
            arrival_time: Utc::now().into(),
            total_seats: 180,
            available_seats: 180,
            base_price: Decimal::new(19900, 2),
        };
        let other = flight::Model {
            id: Uuid::new_v4(),
            flight_number: "FL200".to_string(),
            ..existing.clone()
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()], vec![other]])
            .into_connection();
        let mailer: Arc<dyn Mailer> = Arc::new(crate::mailer::LogMailer);

        let err = update_flight(
            &db,
            &mailer,
            existing.id,
            UpdateFlightData {
                flight_number: Some("FL200".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Nothing was written
        assert!(!format!("{:?}", db.into_transaction_log()).contains("UPDATE"));
    }

    #[tokio::test]
    async fn resize_below_booked_count_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
            .into_connection();

        let err = resize_capacity(&db, Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
