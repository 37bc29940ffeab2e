use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Flight::Table)
                    .if_not_exists()
                    .col(uuid(Flight::Id).primary_key())
                    .col(string_len(Flight::FlightNumber, 20).not_null().unique_key())
                    .col(string_len(Flight::Origin, 100).not_null())
                    .col(string_len(Flight::Destination, 100).not_null())
                    .col(timestamp_with_time_zone(Flight::DepartureTime).not_null())
                    .col(timestamp_with_time_zone(Flight::ArrivalTime).not_null())
                    .col(integer(Flight::TotalSeats).not_null())
                    .col(
                        integer(Flight::AvailableSeats).not_null().check(
                            Expr::col(Flight::AvailableSeats)
                                .gte(0)
                                .and(Expr::col(Flight::AvailableSeats).lte(Expr::col(Flight::TotalSeats))),
                        ),
                    )
                    .col(decimal_len(Flight::BasePrice, 10, 2).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Flight::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Flight {
    Table,
    Id,
    FlightNumber,
    Origin,
    Destination,
    DepartureTime,
    ArrivalTime,
    TotalSeats,
    AvailableSeats,
    BasePrice,
}
