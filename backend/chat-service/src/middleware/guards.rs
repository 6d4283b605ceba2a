//! Authorization guards that enforce permission checks at the type level

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Authenticated identity, placed in extensions by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct User {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .ok_or(AppError::Unauthorized)?;
        Ok(User { id: user_id })
    }
}

/// A verified channel membership. One query distinguishes "channel does
/// not exist" (NotFound) from "exists but you are not in it" (Forbidden).
#[derive(Debug, Clone, Copy)]
pub struct ChannelMember {
    pub user_id: Uuid,
    pub channel_id: Uuid,
}

impl ChannelMember {
    pub async fn verify(
        db: &PgPool,
        user_id: Uuid,
        channel_id: Uuid,
    ) -> Result<Self, AppError> {
        let row: (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM channels WHERE id = $1) AS channel_exists,
                EXISTS(SELECT 1 FROM channel_members WHERE channel_id = $1 AND user_id = $2) AS is_member
            "#,
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;

        let (channel_exists, is_member) = row;
        if !channel_exists {
            return Err(AppError::NotFound);
        }
        if !is_member {
            return Err(AppError::Forbidden);
        }
        Ok(ChannelMember { user_id, channel_id })
    }
}
