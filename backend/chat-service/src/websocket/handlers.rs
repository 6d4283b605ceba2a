use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::auth::verify_jwt;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Resolve the requesting identity from the query token or the
/// Authorization header. Browsers cannot set headers on WebSocket
/// upgrades, hence the query fallback.
fn authenticate(
    params: &WsParams,
    headers: &HeaderMap,
    secret: &str,
) -> Result<Uuid, axum::http::StatusCode> {
    let token = params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });
    match token {
        None => Err(axum::http::StatusCode::UNAUTHORIZED),
        Some(t) => verify_jwt(&t, secret).map_err(|_| axum::http::StatusCode::UNAUTHORIZED),
    }
}

/// WS upgrade. The socket attaches to the authenticated user's own
/// notification stream only; there is no parameter to pick another
/// user's stream, so impersonation is structurally impossible here.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let user_id = match authenticate(&params, &headers, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(status) => return status.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket))
}

async fn handle_socket(state: AppState, user_id: Uuid, socket: WebSocket) {
    let mut rx = state.registry.add_subscriber(user_id).await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            maybe = rx.recv() => {
                match maybe {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // pings are answered by the framework
                    Some(Err(_)) => break,
                }
            }
        }
    }
}
