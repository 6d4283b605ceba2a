use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::{MessageSummary, User as UserRecord};
use crate::services::{
    channel_service::ChannelService, favorite_service::FavoriteService,
    message_service::MessageService,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenChannelRequest {
    pub counterpart_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OpenChannelResponse {
    pub channel_id: Uuid,
}

/// POST /channels — open (find-or-create) the direct conversation with
/// a counterpart. Idempotent and symmetric: either side opening the
/// conversation lands on the same channel id.
pub async fn open_channel(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<OpenChannelRequest>,
) -> Result<Json<OpenChannelResponse>, AppError> {
    // The resolver assumes both identities exist; validate here. The
    // requester's row can be gone too (deleted account, live token).
    ChannelService::assert_identities_exist(&state.db, user.id, body.counterpart_id).await?;

    let channel_id =
        ChannelService::get_or_create_direct_channel(&state.db, user.id, body.counterpart_id)
            .await?;
    Ok(Json(OpenChannelResponse { channel_id }))
}

/// Per-conversation summary for the contact list: pure data, rendering
/// belongs to the caller.
#[derive(Debug, Serialize)]
pub struct ContactItem {
    pub channel_id: Uuid,
    pub counterpart: Option<UserRecord>,
    pub last_message: Option<MessageSummary>,
    pub unseen: i64,
    pub favorite: bool,
}

/// GET /contacts — the viewer's conversations, most recently active
/// first, each with counterpart, last message, unseen count, and
/// favorite flag.
pub async fn list_contacts(
    State(state): State<AppState>,
    user: User,
) -> Result<Json<Vec<ContactItem>>, AppError> {
    let channel_ids = ChannelService::list_for_user(&state.db, user.id).await?;

    let mut items = Vec::with_capacity(channel_ids.len());
    for channel_id in channel_ids {
        let counterpart = sqlx::query_as::<_, UserRecord>(
            "SELECT u.id, u.name, u.email, u.avatar, u.created_at \
             FROM users u JOIN channel_members cm ON cm.user_id = u.id \
             WHERE cm.channel_id = $1 AND u.id <> $2",
        )
        .bind(channel_id)
        .bind(user.id)
        .fetch_optional(&state.db)
        .await?;

        let last_message = MessageService::last_message(&state.db, channel_id)
            .await?
            .map(|m| m.summarize(user.id, &state.config.allowed_images));
        let unseen = MessageService::count_unseen(&state.db, channel_id, user.id).await?;
        let favorite = FavoriteService::is_favorite(&state.db, user.id, channel_id).await?;

        items.push(ContactItem {
            channel_id,
            counterpart,
            last_message,
            unseen,
            favorite,
        });
    }
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct SetFavoriteRequest {
    pub starred: bool,
}

#[derive(Debug, Serialize)]
pub struct SetFavoriteResponse {
    pub starred: bool,
    pub applied: bool,
}

/// POST /channels/:id/favorite — star or unstar. Repeated stars are
/// idempotent; `applied` reports whether this call changed anything.
pub async fn set_favorite(
    State(state): State<AppState>,
    user: User,
    Path(channel_id): Path<Uuid>,
    Json(body): Json<SetFavoriteRequest>,
) -> Result<Json<SetFavoriteResponse>, AppError> {
    crate::middleware::guards::ChannelMember::verify(&state.db, user.id, channel_id).await?;
    let applied =
        FavoriteService::set_favorite(&state.db, user.id, channel_id, body.starred).await?;
    Ok(Json(SetFavoriteResponse {
        starred: body.starred,
        applied,
    }))
}

/// GET /favorites — the viewer's starred channel ids.
pub async fn list_favorites(
    State(state): State<AppState>,
    user: User,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let favorites = FavoriteService::list_for_user(&state.db, user.id).await?;
    Ok(Json(favorites))
}
