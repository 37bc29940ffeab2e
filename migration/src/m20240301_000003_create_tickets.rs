use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20240301_000001_create_users::User;
use super::m20240301_000002_create_flights::Flight;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create ticket status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(TicketStatus::Enum)
                    .values([
                        TicketStatus::Reserved,
                        TicketStatus::Confirmed,
                        TicketStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(uuid(Ticket::Id).primary_key())
                    .col(string_len(Ticket::TicketNumber, 64).not_null().unique_key())
                    .col(uuid(Ticket::FlightId).not_null())
                    .col(uuid(Ticket::UserId).not_null())
                    .col(string_len(Ticket::PassengerName, 200).not_null())
                    .col(string_len(Ticket::PassengerEmail, 255).not_null())
                    .col(decimal_len(Ticket::Price, 10, 2).not_null())
                    .col(
                        timestamp_with_time_zone(Ticket::PurchaseTime)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(string_len(Ticket::SeatNumber, 10).not_null())
                    .col(
                        ColumnDef::new(Ticket::Status)
                            .custom(TicketStatus::Enum)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_flight")
                            .from(Ticket::Table, Ticket::FlightId)
                            .to(Flight::Table, Flight::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_user")
                            .from(Ticket::Table, Ticket::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ticket::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TicketStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ticket {
    Table,
    Id,
    TicketNumber,
    FlightId,
    UserId,
    PassengerName,
    PassengerEmail,
    Price,
    PurchaseTime,
    SeatNumber,
    Status,
}

#[derive(DeriveIden)]
pub enum TicketStatus {
    #[sea_orm(iden = "ticket_status")]
    Enum,
    #[sea_orm(iden = "reserved")]
    Reserved,
    #[sea_orm(iden = "confirmed")]
    Confirmed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
