use async_trait::async_trait;
use derive_new::new;
use kernel::{
    model::{id::UserId, user::User},
    repository::user::UserRepository,
};
use shared::error::{AppError, AppResult};

use crate::database::{model::user::UserRow, ConnectionPool};

#[derive(new)]
pub struct UserRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn find_current_user(&self, current_user_id: UserId) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
                SELECT
                    u.user_id,
                    u.user_name,
                    u.email,
                    u.role
                FROM users AS u
                WHERE u.user_id = $1
            "#,
        )
        .bind(current_user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(User::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::model::role::Role;

    #[sqlx::test]
    #[ignore = "requires a Postgres instance via DATABASE_URL"]
    async fn finds_user_with_role(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let user_id = UserId::new();
        sqlx::query(
            "INSERT INTO users (user_id, user_name, email, role) VALUES ($1, 'Sato', 'sato@example.com', 'teacher')",
        )
        .bind(user_id)
        .execute(&pool)
        .await?;

        let repo = UserRepositoryImpl::new(ConnectionPool::new(pool));
        let user = repo.find_current_user(user_id).await?.unwrap();
        assert_eq!(user.user_name, "Sato");
        assert_eq!(user.role, Role::Teacher);

        assert!(repo.find_current_user(UserId::new()).await?.is_none());
        Ok(())
    }
}
