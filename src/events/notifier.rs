use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::entities::notification::{self, NotificationType};
use crate::entities::{flight, ticket};
use crate::error::AppResult;
use crate::events::{TicketEvent, TicketObserver};
use crate::mailer::Mailer;

/// Observer that turns ticket lifecycle events into persisted notifications
/// and a fire-and-forget email to the passenger.
pub struct NotificationObserver {
    db: Arc<DatabaseConnection>,
    mailer: Arc<dyn Mailer>,
}

impl NotificationObserver {
    pub fn new(db: Arc<DatabaseConnection>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }
}

/// Map a lifecycle event to the notification type and message shown to the
/// ticket owner.
pub fn render_event_message(
    ticket: &ticket::Model,
    flight: &flight::Model,
    event: TicketEvent,
) -> (NotificationType, String) {
    match event {
        TicketEvent::Created => (
            NotificationType::TicketConfirmation,
            format!(
                "Your ticket #{} for flight {} has been created. \
                 Departing from {} to {} on {}.",
                ticket.ticket_number,
                flight.flight_number,
                flight.origin,
                flight.destination,
                flight.departure_time.date_naive(),
            ),
        ),
        TicketEvent::Confirmed => (
            NotificationType::TicketConfirmation,
            format!(
                "Your ticket #{} for flight {} has been confirmed. Seat number: {}. \
                 Please arrive at the airport at least 2 hours before departure.",
                ticket.ticket_number, flight.flight_number, ticket.seat_number,
            ),
        ),
        TicketEvent::Cancelled => (
            NotificationType::TicketCancellation,
            format!(
                "Your ticket #{} for flight {} has been cancelled. \
                 If you did not cancel this ticket, please contact customer support.",
                ticket.ticket_number, flight.flight_number,
            ),
        ),
        TicketEvent::Updated => (
            NotificationType::General,
            format!(
                "Your ticket #{} for flight {} has been updated. \
                 Please check your account for details.",
                ticket.ticket_number, flight.flight_number,
            ),
        ),
    }
}

#[async_trait]
impl TicketObserver for NotificationObserver {
    fn name(&self) -> &'static str {
        "notification-generator"
    }

    async fn update(
        &self,
        ticket: &ticket::Model,
        flight: &flight::Model,
        event: TicketEvent,
    ) -> AppResult<()> {
        let (notification_type, message) = render_event_message(ticket, flight, event);

        let record = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(ticket.user_id),
            message: Set(message.clone()),
            seen: Set(false),
            created_at: Set(Utc::now().into()),
            ticket_id: Set(Some(ticket.id)),
            r#type: Set(notification_type),
        };
        record.insert(self.db.as_ref()).await?;

        // Fire-and-forget: a failed send never fails the lifecycle transition.
        let mailer = self.mailer.clone();
        let to = ticket.passenger_email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, "Flight Notification", &message).await {
                tracing::warn!(%to, error = %e, "Failed to send notification email");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::LogMailer;
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn fixtures() -> (ticket::Model, flight::Model) {
        let flight = flight::Model {
            id: Uuid::new_v4(),
            flight_number: "FL205".to_string(),
            origin: "Oslo".to_string(),
            destination: "Rome".to_string(),
            departure_time: "2026-09-01T08:30:00+00:00".parse().unwrap(),
            arrival_time: "2026-09-01T11:10:00+00:00".parse().unwrap(),
            total_seats: 120,
            available_seats: 60,
            base_price: Decimal::new(14900, 2),
        };
        let ticket = ticket::Model {
            id: Uuid::new_v4(),
            ticket_number: "abc-123".to_string(),
            flight_id: flight.id,
            user_id: Uuid::new_v4(),
            passenger_name: "Sam Traveller".to_string(),
            passenger_email: "sam@example.com".to_string(),
            price: Decimal::new(14900, 2),
            purchase_time: Utc::now().into(),
            seat_number: "4C".to_string(),
            status: ticket::TicketStatus::Reserved,
        };
        (ticket, flight)
    }

    #[test]
    fn created_event_maps_to_confirmation_type() {
        let (ticket, flight) = fixtures();
        let (kind, message) = render_event_message(&ticket, &flight, TicketEvent::Created);

        assert_eq!(kind, NotificationType::TicketConfirmation);
        assert!(message.contains("#abc-123"));
        assert!(message.contains("flight FL205"));
        assert!(message.contains("from Oslo to Rome"));
        assert!(message.contains("2026-09-01"));
    }

    #[test]
    fn confirmed_event_mentions_seat() {
        let (ticket, flight) = fixtures();
        let (kind, message) = render_event_message(&ticket, &flight, TicketEvent::Confirmed);

        assert_eq!(kind, NotificationType::TicketConfirmation);
        assert!(message.contains("Seat number: 4C"));
    }

    #[test]
    fn cancelled_event_maps_to_cancellation_type() {
        let (ticket, flight) = fixtures();
        let (kind, message) = render_event_message(&ticket, &flight, TicketEvent::Cancelled);

        assert_eq!(kind, NotificationType::TicketCancellation);
        assert!(message.contains("has been cancelled"));
    }

    #[test]
    fn updated_event_maps_to_general_type() {
        let (ticket, flight) = fixtures();
        let (kind, _) = render_event_message(&ticket, &flight, TicketEvent::Updated);

        assert_eq!(kind, NotificationType::General);
    }

    #[tokio::test]
    async fn one_event_persists_exactly_one_notification() {
        let (ticket, flight) = fixtures();
        let stored = notification::Model {
            id: Uuid::new_v4(),
            user_id: ticket.user_id,
            message: "Your ticket #abc-123 for flight FL205 has been created.".to_string(),
            seen: false,
            created_at: Utc::now().into(),
            ticket_id: Some(ticket.id),
            r#type: NotificationType::TicketConfirmation,
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![stored]])
                .into_connection(),
        );

        let observer = NotificationObserver::new(db.clone(), Arc::new(LogMailer));
        observer
            .update(&ticket, &flight, TicketEvent::Created)
            .await
            .unwrap();

        drop(observer);
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        assert!(format!("{:?}", log[0]).contains("INSERT"));
    }
}
