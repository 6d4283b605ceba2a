use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppError;

pub struct FavoriteService;

impl FavoriteService {
    pub async fn is_favorite(
        db: &Pool<Postgres>,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND channel_id = $2)",
        )
        .bind(user_id)
        .bind(channel_id)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    /// Star or unstar a channel. Starring is idempotent under the
    /// (user_id, channel_id) primary key: repeated stars leave exactly
    /// one row. Returns whether the mutation actually applied.
    pub async fn set_favorite(
        db: &Pool<Postgres>,
        user_id: Uuid,
        channel_id: Uuid,
        starred: bool,
    ) -> Result<bool, AppError> {
        let result = if starred {
            sqlx::query(
                "INSERT INTO favorites (user_id, channel_id) VALUES ($1, $2) \
                 ON CONFLICT (user_id, channel_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(channel_id)
            .execute(db)
            .await?
        } else {
            sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND channel_id = $2")
                .bind(user_id)
                .bind(channel_id)
                .execute(db)
                .await?
        };
        Ok(result.rows_affected() > 0)
    }

    /// Channel ids the user has starred, most recent star first.
    pub async fn list_for_user(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<Uuid> = sqlx::query_scalar(
            "SELECT channel_id FROM favorites WHERE user_id = $1 ORDER BY starred_at DESC",
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
