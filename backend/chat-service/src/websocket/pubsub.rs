//! Pub/sub gateway. Publishes events to per-user broker channels and
//! bridges the broker back into the in-process connection registry.
//!
//! Delivery is best-effort: the durable message row is authoritative,
//! so a broker failure is logged and never rolls back persistence.

use redis::{AsyncCommands, Client};
use std::time::Duration;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::websocket::events::ChatEvent;
use crate::websocket::ConnectionRegistry;
use axum::extract::ws::Message;

pub fn user_channel(user_id: Uuid) -> String {
    format!("chat:{user_id}")
}

/// Publish one payload to one user's channel, bounded by the configured
/// timeout. A timeout counts as a delivery failure, not a hang.
pub async fn publish(
    client: &Client,
    timeout_ms: u64,
    user_id: Uuid,
    payload: &str,
) -> Result<(), AppError> {
    let attempt = async {
        let mut conn = client.get_multiplexed_async_connection().await?;
        conn.publish::<_, _, ()>(user_channel(user_id), payload).await
    };
    match tokio::time::timeout(Duration::from_millis(timeout_ms), attempt).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AppError::Broker(e.to_string())),
        Err(_) => Err(AppError::Broker("publish timed out".into())),
    }
}

/// Fan an event out to a set of recipients. Failures are swallowed here
/// at the gateway boundary; callers have already persisted their state.
/// Local sockets receive the event through the same subscription path
/// as remote instances, so each subscriber sees it exactly once.
pub async fn fanout(state: &AppState, recipients: &[Uuid], event: &ChatEvent) {
    let payload = match event.to_payload() {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize broadcast event");
            return;
        }
    };
    for &user_id in recipients {
        if let Err(e) = publish(
            &state.redis,
            state.config.broker.publish_timeout_ms,
            user_id,
            &payload,
        )
        .await
        {
            tracing::warn!(%user_id, error = %e, "broker publish failed, event dropped");
        }
    }
}

/// Subscribe to every user channel and forward payloads to the local
/// registry. Run as a background task per instance.
pub async fn start_psub_listener(
    client: Client,
    registry: ConnectionRegistry,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not multiplexed
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("chat:*").await?;
    let mut stream = pubsub.on_message();
    use futures_util::StreamExt;
    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let payload: String = msg.get_payload()?;
        if let Some(rest) = channel.strip_prefix("chat:") {
            if let Ok(user_id) = Uuid::parse_str(rest) {
                registry.broadcast(user_id, Message::Text(payload.clone())).await;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_channel_name_embeds_the_id() {
        let id = Uuid::new_v4();
        assert_eq!(user_channel(id), format!("chat:{id}"));
    }
}
