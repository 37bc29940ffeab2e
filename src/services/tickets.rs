use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entities::ticket::{self, TicketStatus};
use crate::entities::{flight, user};
use crate::error::{AppError, AppResult};
use crate::events::{TicketEvent, TicketEvents};
use crate::services::flights::{release_seat, reserve_seat};
use crate::utils::jwt::Claims;

pub struct CreateTicketData {
    pub flight_id: Uuid,
    pub passenger_name: String,
    pub passenger_email: String,
    pub price: Option<Decimal>,
    pub seat_number: String,
}

#[derive(Default)]
pub struct UpdateTicketData {
    pub passenger_name: Option<String>,
    pub passenger_email: Option<String>,
    pub seat_number: Option<String>,
}

fn ensure_owner_or_admin(claims: &Claims, owner_id: Uuid) -> AppResult<()> {
    if claims.sub != owner_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You do not have access to this ticket".to_string(),
        ));
    }
    Ok(())
}

async fn flight_of(db: &DatabaseConnection, t: &ticket::Model) -> AppResult<flight::Model> {
    flight::Entity::find_by_id(t.flight_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("Ticket references a missing flight".to_string()))
}

// ============ Lifecycle ============

/// Book a seat: reserve one unit of the flight's capacity and persist the
/// ticket in RESERVED status, atomically. Publishes `Created` after commit.
pub async fn create_ticket(
    db: &DatabaseConnection,
    events: &TicketEvents,
    claims: &Claims,
    data: CreateTicketData,
) -> AppResult<ticket::Model> {
    let flight = flight::Entity::find_by_id(data.flight_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    // Fast fail; the transactional decrement below is the real guard
    if !flight.has_available_seats() {
        return Err(AppError::CapacityExceeded(
            "No available seats for this flight".to_string(),
        ));
    }

    let buyer = user::Entity::find_by_id(claims.sub)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let price = data.price.unwrap_or(flight.base_price);

    let txn = db.begin().await?;

    reserve_seat(&txn, flight.id).await?;

    let new_ticket = ticket::ActiveModel {
        id: Set(Uuid::new_v4()),
        ticket_number: Set(Uuid::new_v4().to_string()),
        flight_id: Set(flight.id),
        user_id: Set(buyer.id),
        passenger_name: Set(data.passenger_name),
        passenger_email: Set(data.passenger_email),
        price: Set(price),
        purchase_time: Set(Utc::now().into()),
        seat_number: Set(data.seat_number),
        status: Set(TicketStatus::Reserved),
    };
    let created = new_ticket.insert(&txn).await?;

    txn.commit().await?;

    events.notify(&created, &flight, TicketEvent::Created).await;

    Ok(created)
}

/// RESERVED -> CONFIRMED. Every other starting status is rejected; the
/// lifecycle is a strict state machine.
pub async fn confirm_ticket(
    db: &DatabaseConnection,
    events: &TicketEvents,
    claims: &Claims,
    ticket_id: Uuid,
) -> AppResult<ticket::Model> {
    let existing = ticket::Entity::find_by_id(ticket_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    ensure_owner_or_admin(claims, existing.user_id)?;

    match existing.status {
        TicketStatus::Reserved => {}
        TicketStatus::Confirmed => {
            return Err(AppError::Conflict("Ticket is already confirmed".to_string()));
        }
        TicketStatus::Cancelled => {
            return Err(AppError::Conflict(
                "A cancelled ticket cannot be confirmed".to_string(),
            ));
        }
    }

    // Conditional transition: the status predicate makes the UPDATE the
    // arbiter between concurrent confirms, not the read above.
    let result = ticket::Entity::update_many()
        .col_expr(ticket::Column::Status, Expr::value(TicketStatus::Confirmed))
        .filter(ticket::Column::Id.eq(ticket_id))
        .filter(ticket::Column::Status.eq(TicketStatus::Reserved))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict("Ticket is no longer reserved".to_string()));
    }

    let confirmed = ticket::Model {
        status: TicketStatus::Confirmed,
        ..existing
    };

    let flight = flight_of(db, &confirmed).await?;
    events.notify(&confirmed, &flight, TicketEvent::Confirmed).await;

    Ok(confirmed)
}

/// RESERVED|CONFIRMED -> CANCELLED, returning the seat to the flight's
/// pool in the same transaction. Cancelling twice is a conflict, which is
/// what keeps the seat counter from ever double-incrementing.
pub async fn cancel_ticket(
    db: &DatabaseConnection,
    events: &TicketEvents,
    claims: &Claims,
    ticket_id: Uuid,
) -> AppResult<ticket::Model> {
    let existing = ticket::Entity::find_by_id(ticket_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    ensure_owner_or_admin(claims, existing.user_id)?;

    if existing.status == TicketStatus::Cancelled {
        return Err(AppError::Conflict("Ticket is already cancelled".to_string()));
    }

    let flight_id = existing.flight_id;

    let txn = db.begin().await?;

    // Conditional transition: of two concurrent cancels, only the one whose
    // UPDATE touches the row releases the seat. The loser rolls back.
    let result = ticket::Entity::update_many()
        .col_expr(ticket::Column::Status, Expr::value(TicketStatus::Cancelled))
        .filter(ticket::Column::Id.eq(ticket_id))
        .filter(ticket::Column::Status.ne(TicketStatus::Cancelled))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict("Ticket is already cancelled".to_string()));
    }

    release_seat(&txn, flight_id).await?;

    txn.commit().await?;

    let cancelled = ticket::Model {
        status: TicketStatus::Cancelled,
        ..existing
    };

    let flight = flight_of(db, &cancelled).await?;
    events.notify(&cancelled, &flight, TicketEvent::Cancelled).await;

    Ok(cancelled)
}

/// Apply the supplied passenger fields; the status is untouched.
pub async fn update_ticket(
    db: &DatabaseConnection,
    events: &TicketEvents,
    ticket_id: Uuid,
    data: UpdateTicketData,
) -> AppResult<ticket::Model> {
    let existing = ticket::Entity::find_by_id(ticket_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    let mut active: ticket::ActiveModel = existing.clone().into();
    active.passenger_name = Set(data.passenger_name.unwrap_or(existing.passenger_name));
    active.passenger_email = Set(data.passenger_email.unwrap_or(existing.passenger_email));
    active.seat_number = Set(data.seat_number.unwrap_or(existing.seat_number));
    let updated = active.update(db).await?;

    let flight = flight_of(db, &updated).await?;
    events.notify(&updated, &flight, TicketEvent::Updated).await;

    Ok(updated)
}

// ============ Queries ============

pub async fn get_ticket(
    db: &DatabaseConnection,
    claims: &Claims,
    ticket_id: Uuid,
) -> AppResult<ticket::Model> {
    let found = ticket::Entity::find_by_id(ticket_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    ensure_owner_or_admin(claims, found.user_id)?;
    Ok(found)
}

pub async fn get_ticket_by_number(
    db: &DatabaseConnection,
    claims: &Claims,
    ticket_number: &str,
) -> AppResult<ticket::Model> {
    let found = ticket::Entity::find()
        .filter(ticket::Column::TicketNumber.eq(ticket_number))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    ensure_owner_or_admin(claims, found.user_id)?;
    Ok(found)
}

pub async fn list_by_user(db: &DatabaseConnection, user_id: Uuid) -> AppResult<Vec<ticket::Model>> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(ticket::Entity::find()
        .filter(ticket::Column::UserId.eq(user_id))
        .all(db)
        .await?)
}

pub async fn list_by_flight(
    db: &DatabaseConnection,
    flight_id: Uuid,
) -> AppResult<Vec<ticket::Model>> {
    flight::Entity::find_by_id(flight_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    Ok(ticket::Entity::find()
        .filter(ticket::Column::FlightId.eq(flight_id))
        .all(db)
        .await?)
}

pub async fn list_by_status(
    db: &DatabaseConnection,
    user_id: Uuid,
    status: TicketStatus,
) -> AppResult<Vec<ticket::Model>> {
    Ok(ticket::Entity::find()
        .filter(ticket::Column::UserId.eq(user_id))
        .filter(ticket::Column::Status.eq(status))
        .all(db)
        .await?)
}

pub async fn list_by_purchase_range(
    db: &DatabaseConnection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<ticket::Model>> {
    Ok(ticket::Entity::find()
        .filter(ticket::Column::PurchaseTime.gte(start))
        .filter(ticket::Column::PurchaseTime.lte(end))
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn claims_for(user_id: Uuid, role: UserRole) -> Claims {
        Claims {
            sub: user_id,
            email: "caller@example.com".to_string(),
            role,
            exp: 0,
            iat: 0,
        }
    }

    fn flight_with_seats(available: i32) -> flight::Model {
        flight::Model {
            id: Uuid::new_v4(),
            flight_number: "FL777".to_string(),
            origin: "Berlin".to_string(),
            destination: "Madrid".to_string(),
            departure_time: Utc::now().into(),
            arrival_time: Utc::now().into(),
            total_seats: 2,
            available_seats: available,
            base_price: Decimal::new(9900, 2),
        }
    }

    fn ticket_with_status(owner: Uuid, status: TicketStatus) -> ticket::Model {
        ticket::Model {
            id: Uuid::new_v4(),
            ticket_number: Uuid::new_v4().to_string(),
            flight_id: Uuid::new_v4(),
            user_id: owner,
            passenger_name: "P Name".to_string(),
            passenger_email: "p@example.com".to_string(),
            price: Decimal::new(9900, 2),
            purchase_time: Utc::now().into(),
            seat_number: "1A".to_string(),
            status,
        }
    }

    fn booking_request(flight_id: Uuid) -> CreateTicketData {
        CreateTicketData {
            flight_id,
            passenger_name: "P Name".to_string(),
            passenger_email: "p@example.com".to_string(),
            price: None,
            seat_number: "1A".to_string(),
        }
    }

    #[tokio::test]
    async fn booking_a_missing_flight_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<flight::Model>::new()])
            .into_connection();
        let events = TicketEvents::new();
        let claims = claims_for(Uuid::new_v4(), UserRole::Client);

        let err = create_ticket(&db, &events, &claims, booking_request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn booking_a_full_flight_is_capacity_exceeded() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![flight_with_seats(0)]])
            .into_connection();
        let events = TicketEvents::new();
        let claims = claims_for(Uuid::new_v4(), UserRole::Client);

        let err = create_ticket(&db, &events, &claims, booking_request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));
        // No ticket insert reached the database
        assert!(db.into_transaction_log().len() <= 1);
    }

    #[tokio::test]
    async fn confirming_a_cancelled_ticket_is_a_conflict() {
        let owner = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ticket_with_status(owner, TicketStatus::Cancelled)]])
            .into_connection();
        let events = TicketEvents::new();
        let claims = claims_for(owner, UserRole::Client);

        let err = confirm_ticket(&db, &events, &claims, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn confirming_a_confirmed_ticket_is_a_conflict() {
        let owner = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ticket_with_status(owner, TicketStatus::Confirmed)]])
            .into_connection();
        let events = TicketEvents::new();
        let claims = claims_for(owner, UserRole::Client);

        let err = confirm_ticket(&db, &events, &claims, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn a_stranger_cannot_confirm_someone_elses_ticket() {
        let owner = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ticket_with_status(owner, TicketStatus::Reserved)]])
            .into_connection();
        let events = TicketEvents::new();
        let claims = claims_for(Uuid::new_v4(), UserRole::Client);

        let err = confirm_ticket(&db, &events, &claims, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn cancelling_twice_is_a_conflict_not_a_double_increment() {
        let owner = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ticket_with_status(owner, TicketStatus::Cancelled)]])
            .into_connection();
        let events = TicketEvents::new();
        let claims = claims_for(owner, UserRole::Client);

        let err = cancel_ticket(&db, &events, &claims, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // The seat counter was never touched
        assert!(db.into_transaction_log().len() <= 1);
    }

    #[tokio::test]
    async fn losing_a_concurrent_cancel_race_releases_no_seat() {
        let owner = Uuid::new_v4();
        // The read sees RESERVED, but another cancel wins before the UPDATE
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ticket_with_status(owner, TicketStatus::Reserved)]])
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
            .into_connection();
        let events = TicketEvents::new();
        let claims = claims_for(owner, UserRole::Client);

        let err = cancel_ticket(&db, &events, &claims, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let log = db.into_transaction_log();
        assert!(!format!("{:?}", log).contains("available_seats"));
    }

    #[tokio::test]
    async fn losing_a_concurrent_confirm_race_is_a_conflict() {
        let owner = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ticket_with_status(owner, TicketStatus::Reserved)]])
            .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
            .into_connection();
        let events = TicketEvents::new();
        let claims = claims_for(owner, UserRole::Client);

        let err = confirm_ticket(&db, &events, &claims, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn updating_only_the_seat_keeps_passenger_fields() {
        let owner = Uuid::new_v4();
        let existing = ticket_with_status(owner, TicketStatus::Reserved);
        let mut merged = existing.clone();
        merged.seat_number = "9B".to_string();
        let flight = flight_with_seats(1);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()], vec![merged]])
            .append_query_results([vec![flight]])
            .into_connection();
        let events = TicketEvents::new();

        let updated = update_ticket(
            &db,
            &events,
            existing.id,
            UpdateTicketData {
                seat_number: Some("9B".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.seat_number, "9B");
        assert_eq!(updated.passenger_name, existing.passenger_name);
        assert_eq!(updated.status, TicketStatus::Reserved);

        // The UPDATE carries the prior passenger fields, not nulls
        let log = db.into_transaction_log();
        let update = format!("{:?}", log[1]);
        assert!(update.contains("9B"));
        assert!(update.contains(&existing.passenger_name));
        assert!(update.contains(&existing.passenger_email));
    }

    #[tokio::test]
    async fn tickets_of_a_missing_user_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let err = list_by_user(&db, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
