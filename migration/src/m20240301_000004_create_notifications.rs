use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20240301_000001_create_users::User;
use super::m20240301_000003_create_tickets::Ticket;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create notification type enum
        manager
            .create_type(
                Type::create()
                    .as_enum(NotificationType::Enum)
                    .values([
                        NotificationType::TicketConfirmation,
                        NotificationType::TicketCancellation,
                        NotificationType::FlightScheduleChange,
                        NotificationType::General,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(uuid(Notification::Id).primary_key())
                    .col(uuid(Notification::UserId).not_null())
                    .col(text(Notification::Message).not_null())
                    .col(boolean(Notification::Seen).not_null().default(false))
                    .col(
                        timestamp_with_time_zone(Notification::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(uuid_null(Notification::TicketId))
                    .col(
                        ColumnDef::new(Notification::Type)
                            .custom(NotificationType::Enum)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_user")
                            .from(Notification::Table, Notification::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_ticket")
                            .from(Notification::Table, Notification::TicketId)
                            .to(Ticket::Table, Ticket::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(NotificationType::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Notification {
    Table,
    Id,
    UserId,
    Message,
    Seen,
    CreatedAt,
    TicketId,
    Type,
}

#[derive(DeriveIden)]
pub enum NotificationType {
    #[sea_orm(iden = "notification_type")]
    Enum,
    #[sea_orm(iden = "ticket_confirmation")]
    TicketConfirmation,
    #[sea_orm(iden = "ticket_cancellation")]
    TicketCancellation,
    #[sea_orm(iden = "flight_schedule_change")]
    FlightScheduleChange,
    #[sea_orm(iden = "general")]
    General,
}
