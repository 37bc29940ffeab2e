use chrono::Utc;
use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::entities::{flight, ticket};
use crate::error::{AppError, AppResult};

/// Render a ticket receipt as a single-page A4 PDF.
pub fn render_ticket(t: &ticket::Model, f: &flight::Model) -> AppResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new("Flight Ticket", Mm(210.0), Mm(297.0), "Layer 1");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Internal(format!("Failed to load PDF font: {}", e)))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::Internal(format!("Failed to load PDF font: {}", e)))?;

    let layer = doc.get_page(page).get_layer(layer);

    layer.use_text("FLIGHT TICKET", 20.0, Mm(75.0), Mm(270.0), &bold);

    let rows = [
        ("Ticket Number", t.ticket_number.clone()),
        ("Passenger", t.passenger_name.clone()),
        ("Email", t.passenger_email.clone()),
        ("Flight", f.flight_number.clone()),
        ("From", f.origin.clone()),
        ("To", f.destination.clone()),
        (
            "Departure",
            f.departure_time.with_timezone(&Utc).to_rfc3339(),
        ),
        ("Arrival", f.arrival_time.with_timezone(&Utc).to_rfc3339()),
        ("Seat", t.seat_number.clone()),
        ("Price", format!("{} EUR", t.price)),
        ("Status", format!("{:?}", t.status).to_uppercase()),
        (
            "Purchased",
            t.purchase_time.with_timezone(&Utc).to_rfc3339(),
        ),
    ];

    let mut y = 250.0;
    for (label, value) in rows {
        layer.use_text(label, 11.0, Mm(25.0), Mm(y), &bold);
        layer.use_text(value, 11.0, Mm(75.0), Mm(y), &regular);
        y -= 9.0;
    }

    // Barcode stand-in, same as the printed receipts
    layer.use_text(
        format!("*{}*", t.ticket_number),
        14.0,
        Mm(70.0),
        Mm(y - 6.0),
        &regular,
    );

    layer.use_text(
        "Please arrive at the airport at least 2 hours before departure.",
        8.0,
        Mm(40.0),
        Mm(30.0),
        &regular,
    );
    layer.use_text(
        "This ticket is non-refundable and cannot be transferred to another person.",
        8.0,
        Mm(35.0),
        Mm(25.0),
        &regular,
    );
    layer.use_text(
        "Flight schedules are subject to change without prior notice.",
        8.0,
        Mm(42.0),
        Mm(20.0),
        &regular,
    );

    doc.save_to_bytes()
        .map_err(|e| AppError::Internal(format!("Failed to render PDF: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ticket::TicketStatus;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn renders_a_pdf_document() {
        let flight = flight::Model {
            id: Uuid::new_v4(),
            flight_number: "FL900".to_string(),
            origin: "Paris".to_string(),
            destination: "Athens".to_string(),
            departure_time: Utc::now().into(),
            arrival_time: Utc::now().into(),
            total_seats: 100,
            available_seats: 99,
            base_price: Decimal::new(12000, 2),
        };
        let ticket = ticket::Model {
            id: Uuid::new_v4(),
            ticket_number: Uuid::new_v4().to_string(),
            flight_id: flight.id,
            user_id: Uuid::new_v4(),
            passenger_name: "A Passenger".to_string(),
            passenger_email: "a@example.com".to_string(),
            price: Decimal::new(12000, 2),
            purchase_time: Utc::now().into(),
            seat_number: "17F".to_string(),
            status: TicketStatus::Confirmed,
        };

        let bytes = render_ticket(&ticket, &flight).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
