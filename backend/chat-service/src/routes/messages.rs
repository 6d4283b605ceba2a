use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::{ChannelMember, User};
use crate::models::attachment::{self, AttachmentDescriptor, AttachmentKind};
use crate::models::message::escape_html;
use crate::models::MessageSummary;
use crate::services::{channel_service::ChannelService, message_service::MessageService};
use crate::state::AppState;
use crate::websocket::events::ChatEvent;
use crate::websocket::pubsub;

#[derive(Debug, Deserialize)]
pub struct AttachmentUpload {
    pub stored_name: String,
    pub original_name: String,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: Option<String>,
    pub attachment: Option<AttachmentUpload>,
}

fn validate_attachment(
    upload: &AttachmentUpload,
    config: &crate::config::Config,
) -> Result<AttachmentDescriptor, AppError> {
    if upload.stored_name.is_empty() || upload.stored_name.len() > 255 {
        return Err(AppError::BadRequest("invalid stored file name".into()));
    }
    if let Some(size) = upload.size_bytes {
        if size <= 0 || size > config.max_upload_bytes {
            return Err(AppError::BadRequest("attachment exceeds size limit".into()));
        }
    }
    let ext = attachment::extension(&upload.stored_name)
        .ok_or_else(|| AppError::BadRequest("attachment has no extension".into()))?;
    let allowed = config
        .allowed_images
        .iter()
        .chain(config.allowed_files.iter())
        .any(|a| a == ext);
    if !allowed {
        return Err(AppError::BadRequest(format!(
            "extension .{ext} is not allowed"
        )));
    }
    Ok(AttachmentDescriptor {
        stored_name: upload.stored_name.clone(),
        original_name: upload.original_name.clone(),
    })
}

/// POST /channels/:id/messages — persist, then broadcast `message.new`
/// to the other members' streams. The broadcast is best-effort; the row
/// is already durable when it happens.
pub async fn send_message(
    State(state): State<AppState>,
    user: User,
    Path(channel_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<MessageSummary>, AppError> {
    let descriptor = body
        .attachment
        .as_ref()
        .map(|upload| validate_attachment(upload, &state.config))
        .transpose()?;

    let message =
        MessageService::create(&state.db, channel_id, user.id, body.body, descriptor).await?;

    let recipients = ChannelService::other_members(&state.db, channel_id, user.id).await?;
    let event = ChatEvent::MessageNew {
        channel_id,
        message_id: message.id,
        sender_id: message.sender_id,
        body: message.body.clone(),
        attachment: message.attachment_descriptor(),
        created_at: message.created_at.to_rfc3339(),
    };
    pubsub::fanout(&state, &recipients, &event).await;

    Ok(Json(message.summarize(user.id, &state.config.allowed_images)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /channels/:id/messages — history in insertion order.
pub async fn get_history(
    State(state): State<AppState>,
    user: User,
    Path(channel_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<MessageSummary>>, AppError> {
    ChannelMember::verify(&state.db, user.id, channel_id).await?;
    let rows = MessageService::history(
        &state.db,
        channel_id,
        params.limit.unwrap_or(50),
        params.offset.unwrap_or(0),
    )
    .await?;
    let summaries = rows
        .into_iter()
        .map(|m| m.summarize(user.id, &state.config.allowed_images))
        .collect();
    Ok(Json(summaries))
}

#[derive(Debug, Serialize)]
pub struct MarkSeenResponse {
    pub marked: u64,
}

/// POST /channels/:id/seen — one conditional bulk update; idempotent.
pub async fn mark_seen(
    State(state): State<AppState>,
    user: User,
    Path(channel_id): Path<Uuid>,
) -> Result<Json<MarkSeenResponse>, AppError> {
    ChannelMember::verify(&state.db, user.id, channel_id).await?;
    let marked = MessageService::mark_seen(&state.db, channel_id, user.id).await?;

    if marked > 0 {
        let recipients = ChannelService::other_members(&state.db, channel_id, user.id).await?;
        let event = ChatEvent::MessagesSeen {
            channel_id,
            seen_by: user.id,
        };
        pubsub::fanout(&state, &recipients, &event).await;
    }
    Ok(Json(MarkSeenResponse { marked }))
}

#[derive(Debug, Serialize)]
pub struct UnseenResponse {
    pub unseen: i64,
}

/// GET /channels/:id/unseen
pub async fn count_unseen(
    State(state): State<AppState>,
    user: User,
    Path(channel_id): Path<Uuid>,
) -> Result<Json<UnseenResponse>, AppError> {
    ChannelMember::verify(&state.db, user.id, channel_id).await?;
    let unseen = MessageService::count_unseen(&state.db, channel_id, user.id).await?;
    Ok(Json(UnseenResponse { unseen }))
}

#[derive(Debug, Serialize)]
pub struct SharedPhoto {
    pub file: String,
    pub title: String,
    pub kind: AttachmentKind,
    pub url: String,
}

/// GET /channels/:id/photos — image attachments shared in the channel,
/// newest first.
pub async fn shared_photos(
    State(state): State<AppState>,
    user: User,
    Path(channel_id): Path<Uuid>,
) -> Result<Json<Vec<SharedPhoto>>, AppError> {
    ChannelMember::verify(&state.db, user.id, channel_id).await?;
    let descriptors: Vec<AttachmentDescriptor> =
        MessageService::shared_photos(&state.db, channel_id, &state.config.allowed_images)
            .try_collect()
            .await?;

    let photos = descriptors
        .into_iter()
        .map(|d| {
            let path = format!("{}/{}", state.config.attachments_folder, d.stored_name);
            SharedPhoto {
                url: state.blob.url(&path),
                title: escape_html(d.original_name.trim()),
                kind: d.classification(&state.config.allowed_images),
                file: d.stored_name,
            }
        })
        .collect();
    Ok(Json(photos))
}

/// DELETE /messages/:id — sender-only; cleans the attachment blob first.
pub async fn delete_message(
    State(state): State<AppState>,
    user: User,
    Path(message_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let message = MessageService::get(&state.db, message_id)
        .await?
        .ok_or(AppError::NotFound)?;

    MessageService::delete_message(
        &state.db,
        state.blob.as_ref(),
        &state.config.attachments_folder,
        message_id,
        user.id,
    )
    .await?;

    let recipients =
        ChannelService::other_members(&state.db, message.channel_id, user.id).await?;
    let event = ChatEvent::MessageDeleted {
        channel_id: message.channel_id,
        message_id,
    };
    pubsub::fanout(&state, &recipients, &event).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct DeleteConversationResponse {
    pub deleted: u64,
}

/// DELETE /channels/:id/messages — clear the conversation. The channel
/// and its membership survive.
pub async fn delete_conversation(
    State(state): State<AppState>,
    user: User,
    Path(channel_id): Path<Uuid>,
) -> Result<Json<DeleteConversationResponse>, AppError> {
    ChannelMember::verify(&state.db, user.id, channel_id).await?;
    let deleted = MessageService::delete_conversation(
        &state.db,
        state.blob.as_ref(),
        &state.config.attachments_folder,
        channel_id,
    )
    .await?;
    Ok(Json(DeleteConversationResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn upload(stored_name: &str, size_bytes: Option<i64>) -> AttachmentUpload {
        AttachmentUpload {
            stored_name: stored_name.to_string(),
            original_name: format!("original {stored_name}"),
            size_bytes,
        }
    }

    #[test]
    fn allowed_upload_passes_through() {
        let cfg = Config::test_defaults();
        let desc = validate_attachment(&upload("photo.jpg", Some(1024)), &cfg).unwrap();
        assert_eq!(desc.stored_name, "photo.jpg");
        assert_eq!(desc.original_name, "original photo.jpg");
    }

    #[test]
    fn oversize_upload_is_rejected() {
        let cfg = Config::test_defaults();
        let result = validate_attachment(
            &upload("photo.jpg", Some(cfg.max_upload_bytes + 1)),
            &cfg,
        );
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(matches!(
            validate_attachment(&upload("photo.jpg", Some(0)), &cfg),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn empty_and_overlong_names_are_rejected() {
        let cfg = Config::test_defaults();
        assert!(matches!(
            validate_attachment(&upload("", Some(1)), &cfg),
            Err(AppError::BadRequest(_))
        ));
        let long = format!("{}.jpg", "a".repeat(300));
        assert!(matches!(
            validate_attachment(&upload(&long, Some(1)), &cfg),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn extensionless_name_is_rejected() {
        let cfg = Config::test_defaults();
        assert!(matches!(
            validate_attachment(&upload("README", Some(1)), &cfg),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn disallowed_extension_is_rejected() {
        let cfg = Config::test_defaults();
        assert!(matches!(
            validate_attachment(&upload("payload.exe", Some(1)), &cfg),
            Err(AppError::BadRequest(_))
        ));
    }
}
