use std::collections::HashMap;

use async_trait::async_trait;
use derive_new::new;
use kernel::model::{
    event::{
        command::{CreateEvent, DeleteEvent, RegisterParticipant, UnregisterParticipant, UpdateEvent},
        Event, EventListOptions,
    },
    id::EventId,
    user::EventParticipant,
};
use kernel::repository::event::EventRepository;
use shared::error::{AppError, AppResult};
use sqlx::PgConnection;

use crate::database::{
    model::event::{EventParticipantRow, EventRow},
    ConnectionPool,
};

#[derive(new)]
pub struct EventRepositoryImpl {
    db: ConnectionPool,
}

fn event_not_found() -> AppError {
    AppError::EntityNotFound("Event not found".into())
}

#[async_trait]
impl EventRepository for EventRepositoryImpl {
    async fn create(&self, event: CreateEvent) -> AppResult<Event> {
        let row: EventRow = sqlx::query_as(
            r#"
                INSERT INTO events (title, description, scheduled_at, max_participants)
                VALUES ($1, $2, $3, $4)
                RETURNING event_id, title, description, scheduled_at, max_participants
            "#,
        )
        .bind(event.title)
        .bind(event.description)
        .bind(event.scheduled_at)
        .bind(event.max_participants)
        .fetch_one(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        // 作成直後の参加者は常に空
        Ok(row.into_event(Vec::new()))
    }

    async fn find_all(&self, options: EventListOptions) -> AppResult<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
                SELECT
                    event_id,
                    title,
                    description,
                    scheduled_at,
                    max_participants
                FROM events
                ORDER BY event_id ASC
                OFFSET $1
                LIMIT $2
            "#,
        )
        .bind(options.skip)
        .bind(options.limit)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let event_ids: Vec<i64> = rows.iter().map(|row| row.event_id.raw()).collect();
        let mut conn = self
            .db
            .inner_ref()
            .acquire()
            .await
            .map_err(AppError::SpecificOperationError)?;
        let mut participants = fetch_participants(&mut conn, &event_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let members = participants.remove(&row.event_id).unwrap_or_default();
                row.into_event(members)
            })
            .collect())
    }

    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let mut conn = self
            .db
            .inner_ref()
            .acquire()
            .await
            .map_err(AppError::SpecificOperationError)?;
        find_event(&mut conn, event_id, false).await
    }

    async fn update(&self, event: UpdateEvent) -> AppResult<Event> {
        let mut tx = self.db.begin().await?;

        // 参加者（event_participants）には触れない
        let res = sqlx::query(
            r#"
                UPDATE events
                SET
                    title = $1,
                    description = $2,
                    scheduled_at = $3,
                    max_participants = $4
                WHERE event_id = $5
            "#,
        )
        .bind(event.title)
        .bind(event.description)
        .bind(event.scheduled_at)
        .bind(event.max_participants)
        .bind(event.event_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(event_not_found());
        }

        let updated = find_event(&mut tx, event.event_id, false)
            .await?
            .ok_or_else(event_not_found)?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(updated)
    }

    async fn delete(&self, event: DeleteEvent) -> AppResult<()> {
        // 参加登録は ON DELETE CASCADE で一緒に消える
        let res = sqlx::query(
            r#"
                DELETE FROM events WHERE event_id = $1
            "#,
        )
        .bind(event.event_id)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(event_not_found());
        }

        Ok(())
    }

    async fn register(&self, event: RegisterParticipant) -> AppResult<Event> {
        let mut tx = self.db.begin().await?;

        // イベント行をロックしてから重複・定員を確認する。
        // 同じイベントへの同時登録はここで直列化される。
        {
            let current = find_event(&mut tx, event.event_id, true)
                .await?
                .ok_or_else(event_not_found)?;

            current
                .ensure_can_register(event.user_id)
                .map_err(|e| AppError::Conflict(e.to_string()))?;
        }

        let res = sqlx::query(
            r#"
                INSERT INTO event_participants (event_id, user_id)
                VALUES ($1, $2)
            "#,
        )
        .bind(event.event_id)
        .bind(event.user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event_participants record has been created".into(),
            ));
        }

        let updated = find_event(&mut tx, event.event_id, false)
            .await?
            .ok_or_else(event_not_found)?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(
            event_id = %event.event_id,
            user_id = %event.user_id,
            participants = updated.participants.len(),
            "participant registered"
        );

        Ok(updated)
    }

    async fn unregister(&self, event: UnregisterParticipant) -> AppResult<Event> {
        let mut tx = self.db.begin().await?;

        {
            let current = find_event(&mut tx, event.event_id, true)
                .await?
                .ok_or_else(event_not_found)?;

            current
                .ensure_can_unregister(event.user_id)
                .map_err(|e| AppError::Conflict(e.to_string()))?;
        }

        let res = sqlx::query(
            r#"
                DELETE FROM event_participants
                WHERE event_id = $1 AND user_id = $2
            "#,
        )
        .bind(event.event_id)
        .bind(event.user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No event_participants record has been deleted".into(),
            ));
        }

        let updated = find_event(&mut tx, event.event_id, false)
            .await?
            .ok_or_else(event_not_found)?;

        tx.commit().await.map_err(AppError::TransactionError)?;

        tracing::info!(
            event_id = %event.event_id,
            user_id = %event.user_id,
            participants = updated.participants.len(),
            "participant unregistered"
        );

        Ok(updated)
    }
}

// for_update = true のときはイベント行を FOR UPDATE でロックする
async fn find_event(
    conn: &mut PgConnection,
    event_id: EventId,
    for_update: bool,
) -> AppResult<Option<Event>> {
    let sql = if for_update {
        r#"
            SELECT event_id, title, description, scheduled_at, max_participants
            FROM events
            WHERE event_id = $1
            FOR UPDATE
        "#
    } else {
        r#"
            SELECT event_id, title, description, scheduled_at, max_participants
            FROM events
            WHERE event_id = $1
        "#
    };

    let row: Option<EventRow> = sqlx::query_as(sql)
        .bind(event_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::SpecificOperationError)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut participants = fetch_participants(conn, &[event_id.raw()]).await?;
    let members = participants.remove(&event_id).unwrap_or_default();

    Ok(Some(row.into_event(members)))
}

async fn fetch_participants(
    conn: &mut PgConnection,
    event_ids: &[i64],
) -> AppResult<HashMap<EventId, Vec<EventParticipant>>> {
    let rows: Vec<EventParticipantRow> = sqlx::query_as(
        r#"
            SELECT
                ep.event_id,
                u.user_id,
                u.user_name
            FROM event_participants AS ep
            INNER JOIN users AS u ON ep.user_id = u.user_id
            WHERE ep.event_id = ANY($1)
            ORDER BY ep.registered_at ASC, u.user_id ASC
        "#,
    )
    .bind(event_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(AppError::SpecificOperationError)?;

    let mut grouped: HashMap<EventId, Vec<EventParticipant>> = HashMap::new();
    for row in rows {
        grouped.entry(row.event_id).or_default().push(row.into());
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kernel::model::id::UserId;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    async fn insert_user(pool: &sqlx::PgPool, name: &str, role: &str) -> anyhow::Result<UserId> {
        let user_id = UserId::new();
        sqlx::query(
            "INSERT INTO users (user_id, user_name, email, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(name)
        .bind(format!("{name}@example.com"))
        .bind(role)
        .execute(pool)
        .await?;
        Ok(user_id)
    }

    fn create_event(max_participants: i32) -> CreateEvent {
        CreateEvent::new(
            "Science fair".into(),
            "Projects from every grade".into(),
            Utc.with_ymd_and_hms(2025, 11, 3, 9, 0, 0).unwrap(),
            max_participants,
        )
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres instance via DATABASE_URL"]
    async fn create_then_find(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = EventRepositoryImpl::new(ConnectionPool::new(pool));

        let created = repo.create(create_event(10)).await?;
        assert!(created.participants.is_empty());

        let found = repo.find_by_id(created.event_id).await?.unwrap();
        assert_eq!(found, created);
        assert_eq!(found.title, "Science fair");
        assert_eq!(found.max_participants, 10);

        let all = repo
            .find_all(EventListOptions { skip: 0, limit: 100 })
            .await?;
        assert_eq!(all.len(), 1);

        let skipped = repo
            .find_all(EventListOptions { skip: 1, limit: 100 })
            .await?;
        assert!(skipped.is_empty());
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres instance via DATABASE_URL"]
    async fn capacity_and_duplicates_are_enforced(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let alice = insert_user(&pool, "alice", "student").await?;
        let bob = insert_user(&pool, "bob", "student").await?;
        let repo = EventRepositoryImpl::new(ConnectionPool::new(pool));
        let event_id = repo.create(create_event(1)).await?.event_id;

        let event = repo.register(RegisterParticipant::new(event_id, alice)).await?;
        assert_eq!(event.participants.len(), 1);
        assert_eq!(event.participants[0].user_name, "alice");

        let dup = repo.register(RegisterParticipant::new(event_id, alice)).await;
        assert!(matches!(dup, Err(AppError::Conflict(m)) if m == "User already registered for this event"));

        let full = repo.register(RegisterParticipant::new(event_id, bob)).await;
        assert!(matches!(full, Err(AppError::Conflict(m)) if m == "Event is already full"));

        let event = repo
            .unregister(UnregisterParticipant::new(event_id, alice))
            .await?;
        assert!(event.participants.is_empty());

        let not_registered = repo
            .unregister(UnregisterParticipant::new(event_id, alice))
            .await;
        assert!(matches!(not_registered, Err(AppError::Conflict(_))));

        let event = repo.register(RegisterParticipant::new(event_id, bob)).await?;
        assert_eq!(event.participants[0].user_id, bob);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres instance via DATABASE_URL"]
    async fn update_keeps_participants_and_delete_cascades(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let alice = insert_user(&pool, "alice", "student").await?;
        let repo = EventRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let event_id = repo.create(create_event(5)).await?.event_id;
        repo.register(RegisterParticipant::new(event_id, alice)).await?;

        let updated = repo
            .update(UpdateEvent::new(
                event_id,
                "Science fair (moved)".into(),
                "Gym instead of hall".into(),
                Utc.with_ymd_and_hms(2025, 11, 10, 9, 0, 0).unwrap(),
                3,
            ))
            .await?;
        assert_eq!(updated.title, "Science fair (moved)");
        assert_eq!(updated.max_participants, 3);
        assert_eq!(updated.participants.len(), 1);

        repo.delete(DeleteEvent::new(event_id)).await?;
        assert!(repo.find_by_id(event_id).await?.is_none());
        assert!(matches!(
            repo.delete(DeleteEvent::new(event_id)).await,
            Err(AppError::EntityNotFound(_))
        ));

        let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_participants")
            .fetch_one(&pool)
            .await?;
        assert_eq!(left, 0);
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres instance via DATABASE_URL"]
    async fn missing_event_is_not_found(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let alice = insert_user(&pool, "alice", "student").await?;
        let repo = EventRepositoryImpl::new(ConnectionPool::new(pool));
        let missing = EventId::new(9999);

        assert!(matches!(
            repo.register(RegisterParticipant::new(missing, alice)).await,
            Err(AppError::EntityNotFound(_))
        ));
        assert!(matches!(
            repo.update(UpdateEvent::new(
                missing,
                "x".into(),
                "y".into(),
                Utc::now(),
                1
            ))
            .await,
            Err(AppError::EntityNotFound(_))
        ));
        Ok(())
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres instance via DATABASE_URL"]
    async fn concurrent_registrations_never_exceed_capacity(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let mut user_ids = Vec::new();
        for name in ["alice", "bob", "carol"] {
            user_ids.push(insert_user(&pool, name, "student").await?);
        }
        let repo = Arc::new(EventRepositoryImpl::new(ConnectionPool::new(pool.clone())));
        let event_id = repo.create(create_event(1)).await?.event_id;

        // 3 人が同時に登録し、行ロックで直列化されることを確認する
        let mut set = JoinSet::new();
        for user_id in user_ids {
            let repo = repo.clone();
            set.spawn(async move {
                repo.register(RegisterParticipant::new(event_id, user_id))
                    .await
            });
        }

        let mut accepted = 0;
        let mut full = 0;
        while let Some(joined) = set.join_next().await {
            match joined? {
                Ok(event) => {
                    assert_eq!(event.participants.len(), 1);
                    accepted += 1;
                }
                Err(AppError::Conflict(m)) if m == "Event is already full" => full += 1,
                Err(e) => return Err(e.into()),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(full, 2);

        let (rows,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM event_participants WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&pool)
                .await?;
        assert_eq!(rows, 1);
        Ok(())
    }
}
