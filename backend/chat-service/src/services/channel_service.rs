use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::channel::pair_key;

pub struct ChannelService;

impl ChannelService {
    /// Find the unique direct channel whose membership set is exactly
    /// {a, b}. The aggregation counts memberships restricted to the two
    /// identities and requires both present AND a total member count of
    /// two, so a larger channel containing both users never matches.
    pub async fn find_direct_channel(
        db: &Pool<Postgres>,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<Uuid>, AppError> {
        let found: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT cm.channel_id
            FROM channel_members cm
            WHERE cm.user_id = ANY($1)
            GROUP BY cm.channel_id
            HAVING COUNT(DISTINCT cm.user_id) = 2
               AND (SELECT COUNT(*) FROM channel_members t WHERE t.channel_id = cm.channel_id) = 2
            LIMIT 1
            "#,
        )
        .bind(vec![a, b])
        .fetch_optional(db)
        .await?;
        Ok(found)
    }

    /// Both identities must have user rows before membership rows can
    /// reference them. A stale token whose subject was removed reads as
    /// NotFound here instead of surfacing as an FK violation later.
    pub async fn assert_identities_exist(
        db: &Pool<Postgres>,
        a: Uuid,
        b: Uuid,
    ) -> Result<(), AppError> {
        let known: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT id) FROM users WHERE id = ANY($1)")
            .bind(vec![a, b])
            .fetch_one(db)
            .await?;
        let expected = if a == b { 1 } else { 2 };
        if known != expected {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Find-or-create the canonical channel for an unordered pair.
    /// Symmetric in argument order. Concurrent callers racing to create
    /// the same pair's channel converge on one id: the channel row is
    /// inserted under the pair_key UNIQUE constraint with
    /// ON CONFLICT DO NOTHING, and the loser re-reads the winner's row.
    pub async fn get_or_create_direct_channel(
        db: &Pool<Postgres>,
        requester: Uuid,
        counterpart: Uuid,
    ) -> Result<Uuid, AppError> {
        if requester == counterpart {
            return Err(AppError::BadRequest(
                "cannot open a conversation with yourself".into(),
            ));
        }

        if let Some(id) = Self::find_direct_channel(db, requester, counterpart).await? {
            return Ok(id);
        }

        let key = pair_key(requester, counterpart);
        let id = Uuid::new_v4();
        let mut tx = db.begin().await?;
        let inserted =
            sqlx::query("INSERT INTO channels (id, pair_key) VALUES ($1, $2) ON CONFLICT (pair_key) DO NOTHING")
                .bind(id)
                .bind(&key)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        if inserted == 0 {
            // Lost the race; the conflicting insert has committed by the
            // time ON CONFLICT returns, so the winner's row is visible.
            drop(tx);
            let existing: Uuid = sqlx::query_scalar("SELECT id FROM channels WHERE pair_key = $1")
                .bind(&key)
                .fetch_one(db)
                .await?;
            return Ok(existing);
        }

        sqlx::query("INSERT INTO channel_members (channel_id, user_id) VALUES ($1, $2), ($1, $3)")
            .bind(id)
            .bind(requester)
            .bind(counterpart)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(id)
    }

    pub async fn is_member(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AppError> {
        let rec = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM channel_members WHERE channel_id = $1 AND user_id = $2 LIMIT 1",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(rec.is_some())
    }

    /// All members of a channel except the given user. For direct
    /// channels this is the single counterpart; used as the broadcast
    /// recipient set.
    pub async fn other_members(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM channel_members WHERE channel_id = $1 AND user_id <> $2",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Channels the user belongs to, most recently active first.
    pub async fn list_for_user(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT cm.channel_id
            FROM channel_members cm
            LEFT JOIN LATERAL (
                SELECT m.created_at FROM messages m
                WHERE m.channel_id = cm.channel_id
                ORDER BY m.created_at DESC LIMIT 1
            ) last ON TRUE
            WHERE cm.user_id = $1
            ORDER BY last.created_at DESC NULLS LAST
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
