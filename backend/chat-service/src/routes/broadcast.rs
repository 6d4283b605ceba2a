//! Subscription authorization for the external broker. A client asks to
//! subscribe to a private per-user channel; the grant is an HMAC-SHA256
//! signature over `socket_id:channel_name`, issued only when the
//! authenticated requester owns the channel.

use axum::{extract::State, Json};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::state::AppState;

const PRIVATE_PREFIX: &str = "private-chat.";

#[derive(Debug, Deserialize)]
pub struct SubscriptionAuthRequest {
    pub channel_name: String,
    pub socket_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionAuthResponse {
    pub auth: String,
}

/// Parse the owner identity out of a private channel name.
pub fn channel_owner(channel_name: &str) -> Option<Uuid> {
    channel_name
        .strip_prefix(PRIVATE_PREFIX)
        .and_then(|rest| Uuid::parse_str(rest).ok())
}

/// A subscription is grantable only to the channel's owner. An
/// unparseable name is a client error, a mismatched requester is an
/// authorization failure.
pub fn check_owner(channel_name: &str, requester: Uuid) -> Result<(), AppError> {
    let owner = channel_owner(channel_name)
        .ok_or_else(|| AppError::BadRequest(format!("unknown channel name: {channel_name}")))?;
    if owner != requester {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn sign_grant(
    app_key: &str,
    app_secret: &str,
    socket_id: &str,
    channel_name: &str,
) -> Result<String, AppError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes())
        .map_err(|e| AppError::Config(format!("broker secret: {e}")))?;
    mac.update(format!("{socket_id}:{channel_name}").as_bytes());
    Ok(format!("{app_key}:{}", hex::encode(mac.finalize().into_bytes())))
}

/// POST /broadcasting/auth
///
/// Unauthenticated requests never reach this handler (401 from the auth
/// middleware); an authenticated requester asking for someone else's
/// channel gets 403.
pub async fn authorize_subscription(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<SubscriptionAuthRequest>,
) -> Result<Json<SubscriptionAuthResponse>, AppError> {
    check_owner(&body.channel_name, user.id)?;

    let auth = sign_grant(
        &state.config.broker.app_key,
        &state.config.broker.app_secret,
        &body.socket_id,
        &body.channel_name,
    )?;
    Ok(Json(SubscriptionAuthResponse { auth }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_is_deterministic_and_key_prefixed() {
        let a = sign_grant("key", "secret", "1234.5678", "private-chat.abc").unwrap();
        let b = sign_grant("key", "secret", "1234.5678", "private-chat.abc").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("key:"));

        let other = sign_grant("key", "secret", "1234.5678", "private-chat.xyz").unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn owner_parses_from_private_channel_name() {
        let id = Uuid::new_v4();
        assert_eq!(channel_owner(&format!("private-chat.{id}")), Some(id));
        assert_eq!(channel_owner("presence-lobby"), None);
        assert_eq!(channel_owner("private-chat.not-a-uuid"), None);
    }

    #[test]
    fn only_the_channel_owner_is_granted() {
        let owner = Uuid::new_v4();
        let name = format!("private-chat.{owner}");

        assert!(check_owner(&name, owner).is_ok());
        assert!(matches!(
            check_owner(&name, Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            check_owner("presence-lobby", owner),
            Err(AppError::BadRequest(_))
        ));
    }
}
