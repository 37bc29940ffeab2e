pub mod notifier;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::entities::{flight, ticket};
use crate::error::AppResult;

/// A ticket lifecycle transition. `Updated` is an event, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketEvent {
    Created,
    Confirmed,
    Cancelled,
    Updated,
}

/// Receives lifecycle events synchronously, in registration order.
#[async_trait]
pub trait TicketObserver: Send + Sync {
    /// Stable identity; registering the same name twice has no effect.
    fn name(&self) -> &'static str;

    async fn update(
        &self,
        ticket: &ticket::Model,
        flight: &flight::Model,
        event: TicketEvent,
    ) -> AppResult<()>;
}

/// Publisher side of the lifecycle event fan-out. Observers are registered
/// at composition time in `main`; publication blocks the caller until every
/// observer has run.
#[derive(Default)]
pub struct TicketEvents {
    observers: RwLock<Vec<Arc<dyn TicketObserver>>>,
}

impl TicketEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, observer: Arc<dyn TicketObserver>) {
        let mut observers = self.observers.write().await;
        if observers.iter().all(|o| o.name() != observer.name()) {
            observers.push(observer);
        }
    }

    pub async fn remove(&self, name: &str) {
        self.observers.write().await.retain(|o| o.name() != name);
    }

    /// Invoke every observer in registration order. An observer failure is
    /// logged and does not stop later observers or fail the lifecycle
    /// operation that published the event.
    pub async fn notify(
        &self,
        ticket: &ticket::Model,
        flight: &flight::Model,
        event: TicketEvent,
    ) {
        let observers: Vec<_> = self.observers.read().await.clone();

        for observer in observers {
            if let Err(e) = observer.update(ticket, flight, event).await {
                tracing::warn!(
                    observer = observer.name(),
                    ?event,
                    ticket_number = %ticket.ticket_number,
                    error = %e,
                    "Ticket observer failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn sample_flight() -> flight::Model {
        flight::Model {
            id: Uuid::new_v4(),
            flight_number: "FL100".to_string(),
            origin: "Vienna".to_string(),
            destination: "Lisbon".to_string(),
            departure_time: Utc::now().into(),
            arrival_time: Utc::now().into(),
            total_seats: 180,
            available_seats: 180,
            base_price: Decimal::new(19900, 2),
        }
    }

    fn sample_ticket(flight_id: Uuid) -> ticket::Model {
        ticket::Model {
            id: Uuid::new_v4(),
            ticket_number: Uuid::new_v4().to_string(),
            flight_id,
            user_id: Uuid::new_v4(),
            passenger_name: "Jo Passenger".to_string(),
            passenger_email: "jo@example.com".to_string(),
            price: Decimal::new(19900, 2),
            purchase_time: Utc::now().into(),
            seat_number: "12A".to_string(),
            status: ticket::TicketStatus::Reserved,
        }
    }

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<(&'static str, TicketEvent)>>>,
        fail: bool,
    }

    #[async_trait]
    impl TicketObserver for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn update(
            &self,
            _ticket: &ticket::Model,
            _flight: &flight::Model,
            event: TicketEvent,
        ) -> AppResult<()> {
            self.log.lock().unwrap().push((self.name, event));
            if self.fail {
                return Err(AppError::Internal("boom".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn registration_is_idempotent() {
        let events = TicketEvents::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let obs = Arc::new(Recording { name: "a", log: log.clone(), fail: false });
        events.register(obs.clone()).await;
        events.register(obs).await;

        let flight = sample_flight();
        let ticket = sample_ticket(flight.id);
        events.notify(&ticket, &flight, TicketEvent::Created).await;

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn observers_run_in_registration_order() {
        let events = TicketEvents::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        events
            .register(Arc::new(Recording { name: "first", log: log.clone(), fail: false }))
            .await;
        events
            .register(Arc::new(Recording { name: "second", log: log.clone(), fail: false }))
            .await;

        let flight = sample_flight();
        let ticket = sample_ticket(flight.id);
        events.notify(&ticket, &flight, TicketEvent::Confirmed).await;

        let calls = log.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("first", TicketEvent::Confirmed), ("second", TicketEvent::Confirmed)]
        );
    }

    #[tokio::test]
    async fn failing_observer_does_not_block_later_ones() {
        let events = TicketEvents::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        events
            .register(Arc::new(Recording { name: "broken", log: log.clone(), fail: true }))
            .await;
        events
            .register(Arc::new(Recording { name: "healthy", log: log.clone(), fail: false }))
            .await;

        let flight = sample_flight();
        let ticket = sample_ticket(flight.id);
        events.notify(&ticket, &flight, TicketEvent::Cancelled).await;

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, "healthy");
    }

    #[tokio::test]
    async fn removed_observer_is_not_invoked() {
        let events = TicketEvents::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        events
            .register(Arc::new(Recording { name: "gone", log: log.clone(), fail: false }))
            .await;
        events.remove("gone").await;

        let flight = sample_flight();
        let ticket = sample_ticket(flight.id);
        events.notify(&ticket, &flight, TicketEvent::Updated).await;

        assert!(log.lock().unwrap().is_empty());
    }
}
