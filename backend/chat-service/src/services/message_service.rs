use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::attachment::{AttachmentDescriptor, AttachmentKind};
use crate::models::Message;
use crate::storage::BlobStore;

use super::channel_service::ChannelService;

const MESSAGE_COLUMNS: &str = "id, channel_id, sender_id, body, attachment, seen, created_at";

pub struct MessageService;

impl MessageService {
    /// Persist a new message with seen = false. The sender must be a
    /// member of the target channel; an arbitrary authenticated identity
    /// cannot post into a foreign channel id.
    pub async fn create(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        sender_id: Uuid,
        body: Option<String>,
        attachment: Option<AttachmentDescriptor>,
    ) -> Result<Message, AppError> {
        if !ChannelService::is_member(db, channel_id, sender_id).await? {
            return Err(AppError::Forbidden);
        }
        let has_body = body.as_deref().map(|b| !b.trim().is_empty()).unwrap_or(false);
        if !has_body && attachment.is_none() {
            return Err(AppError::BadRequest(
                "message needs a body or an attachment".into(),
            ));
        }

        let attachment_json = attachment
            .map(|a| serde_json::to_value(a))
            .transpose()
            .map_err(|e| AppError::BadRequest(format!("attachment metadata: {e}")))?;

        let msg = sqlx::query_as::<_, Message>(&format!(
            "INSERT INTO messages (id, channel_id, sender_id, body, attachment) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(channel_id)
        .bind(sender_id)
        .bind(body)
        .bind(attachment_json)
        .fetch_one(db)
        .await?;
        Ok(msg)
    }

    pub async fn get(db: &Pool<Postgres>, id: Uuid) -> Result<Option<Message>, AppError> {
        let msg = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(msg)
    }

    /// Flip every unseen message not sent by the viewer to seen, as one
    /// conditional bulk UPDATE. Atomic per invocation and idempotent:
    /// with no new unseen messages the rerun touches zero rows. Returns
    /// the number of messages marked.
    pub async fn mark_seen(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        viewer_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET seen = TRUE \
             WHERE channel_id = $1 AND sender_id <> $2 AND seen = FALSE",
        )
        .bind(channel_id)
        .bind(viewer_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    /// Count over the same predicate mark_seen updates. Performs no
    /// write, so it cannot lose updates under concurrent senders.
    pub async fn count_unseen(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        viewer_id: Uuid,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages \
             WHERE channel_id = $1 AND sender_id <> $2 AND seen = FALSE",
        )
        .bind(channel_id)
        .bind(viewer_id)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    /// Most recent message by insertion order; id is the deterministic
    /// tiebreak for equal timestamps.
    pub async fn last_message(
        db: &Pool<Postgres>,
        channel_id: Uuid,
    ) -> Result<Option<Message>, AppError> {
        let msg = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE channel_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(channel_id)
        .fetch_optional(db)
        .await?;
        Ok(msg)
    }

    pub async fn history(
        db: &Pool<Postgres>,
        channel_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, AppError> {
        let limit = limit.clamp(1, 200);
        let rows = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE channel_id = $1 \
             ORDER BY created_at ASC, id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(channel_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Lazy stream of image-classified attachment descriptors, newest
    /// first. Finite and restartable: calling again re-runs the query.
    pub fn shared_photos<'a>(
        db: &'a Pool<Postgres>,
        channel_id: Uuid,
        allowed_images: &'a [String],
    ) -> BoxStream<'a, Result<AttachmentDescriptor, AppError>> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT attachment FROM messages \
             WHERE channel_id = $1 AND attachment IS NOT NULL \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(channel_id)
        .fetch(db)
        .filter_map(move |row| {
            let item = match row {
                Ok(value) => AttachmentDescriptor::from_value(Some(&value))
                    .filter(|d| d.classification(allowed_images) == AttachmentKind::Image)
                    .map(Ok),
                Err(e) => Some(Err(AppError::from(e))),
            };
            futures_util::future::ready(item)
        })
        .boxed()
    }

    /// Delete a single message. Only the sender may delete; the blob is
    /// removed before the row so a crash cannot orphan a file that the
    /// database no longer references. An already-absent blob counts as
    /// deleted.
    pub async fn delete_message(
        db: &Pool<Postgres>,
        blob: &dyn BlobStore,
        attachments_folder: &str,
        message_id: Uuid,
        requester_id: Uuid,
    ) -> Result<(), AppError> {
        let msg = Self::get(db, message_id).await?.ok_or(AppError::NotFound)?;
        if msg.sender_id != requester_id {
            return Err(AppError::Forbidden);
        }

        if let Some(desc) = msg.attachment_descriptor() {
            let path = format!("{attachments_folder}/{}", desc.stored_name);
            blob.delete(&path).await?;
        }

        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Clear every message in a channel. Blob cleanup is best-effort per
    /// item: a blob-store failure is logged and the rest of the batch
    /// continues. Only a failure of the row delete itself fails the
    /// operation. The channel survives; membership is untouched.
    pub async fn delete_conversation(
        db: &Pool<Postgres>,
        blob: &dyn BlobStore,
        attachments_folder: &str,
        channel_id: Uuid,
    ) -> Result<u64, AppError> {
        let attachments: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT attachment FROM messages WHERE channel_id = $1 AND attachment IS NOT NULL",
        )
        .bind(channel_id)
        .fetch_all(db)
        .await?;

        for value in &attachments {
            if let Some(desc) = AttachmentDescriptor::from_value(Some(value)) {
                let path = format!("{attachments_folder}/{}", desc.stored_name);
                if let Err(e) = blob.delete(&path).await {
                    tracing::warn!(%channel_id, path, error = %e, "attachment cleanup failed, continuing");
                }
            }
        }

        let result = sqlx::query("DELETE FROM messages WHERE channel_id = $1")
            .bind(channel_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}
