use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::notification::{self, NotificationType};
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;

pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> AppResult<Vec<notification::Model>> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .order_by_desc(notification::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn list_unseen_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> AppResult<Vec<notification::Model>> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::Seen.eq(false))
        .order_by_desc(notification::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn list_in_range(
    db: &DatabaseConnection,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<notification::Model>> {
    Ok(notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::CreatedAt.gte(start))
        .filter(notification::Column::CreatedAt.lte(end))
        .order_by_desc(notification::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn list_by_type(
    db: &DatabaseConnection,
    kind: NotificationType,
) -> AppResult<Vec<notification::Model>> {
    Ok(notification::Entity::find()
        .filter(notification::Column::Type.eq(kind))
        .order_by_desc(notification::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Flip the seen flag. Idempotent: marking an already-seen notification is
/// not an error.
pub async fn mark_seen(
    db: &DatabaseConnection,
    claims: &Claims,
    notification_id: Uuid,
) -> AppResult<notification::Model> {
    let found = notification::Entity::find_by_id(notification_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    if found.user_id != claims.sub && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You do not have access to this notification".to_string(),
        ));
    }

    if found.seen {
        return Ok(found);
    }

    let mut active: notification::ActiveModel = found.into();
    active.seen = Set(true);
    Ok(active.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::UserRole;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn seen_notification(user_id: Uuid) -> notification::Model {
        notification::Model {
            id: Uuid::new_v4(),
            user_id,
            message: "Your ticket has been confirmed.".to_string(),
            seen: true,
            created_at: Utc::now().into(),
            ticket_id: None,
            r#type: NotificationType::TicketConfirmation,
        }
    }

    fn claims_for(user_id: Uuid) -> Claims {
        Claims {
            sub: user_id,
            email: "caller@example.com".to_string(),
            role: UserRole::Client,
            exp: 0,
            iat: 0,
        }
    }

    #[tokio::test]
    async fn mark_seen_on_missing_notification_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<notification::Model>::new()])
            .into_connection();

        let err = mark_seen(&db, &claims_for(Uuid::new_v4()), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn mark_seen_is_idempotent() {
        let user_id = Uuid::new_v4();
        // Already seen: no UPDATE should be issued, so no exec result is mocked
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![seen_notification(user_id)]])
            .into_connection();

        let updated = mark_seen(&db, &claims_for(user_id), Uuid::new_v4())
            .await
            .unwrap();
        assert!(updated.seen);
    }

    #[tokio::test]
    async fn mark_seen_by_another_user_is_forbidden() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![seen_notification(Uuid::new_v4())]])
            .into_connection();

        let err = mark_seen(&db, &claims_for(Uuid::new_v4()), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
