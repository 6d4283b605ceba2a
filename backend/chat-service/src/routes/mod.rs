use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub mod broadcast;
pub mod channels;
pub mod messages;

use broadcast::authorize_subscription;
use channels::{list_contacts, list_favorites, open_channel, set_favorite};
use messages::{
    count_unseen, delete_conversation, delete_message, get_history, mark_seen, send_message,
    shared_photos,
};

pub fn build_router(state: AppState) -> Router {
    // Introspection stays public for healthchecks.
    let introspection: Router<AppState> = Router::new().route("/health", get(|| async { "OK" }));

    let api_v1: Router<AppState> = Router::new()
        .route("/channels", post(open_channel))
        .route("/contacts", get(list_contacts))
        .route("/channels/:id/messages", post(send_message))
        .route("/channels/:id/messages", get(get_history))
        .route("/channels/:id/messages", delete(delete_conversation))
        .route("/channels/:id/seen", post(mark_seen))
        .route("/channels/:id/unseen", get(count_unseen))
        .route("/channels/:id/photos", get(shared_photos))
        .route("/channels/:id/favorite", post(set_favorite))
        .route("/favorites", get(list_favorites))
        .route("/messages/:id", delete(delete_message))
        .route("/broadcasting/auth", post(authorize_subscription))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    // The WS upgrade authenticates in the handler (query token allowed,
    // since browsers cannot set headers on upgrade requests).
    let router = introspection
        .route("/ws", get(crate::websocket::handlers::ws_handler))
        .nest("/api/v1", api_v1)
        .with_state(state);

    crate::middleware::logging::add_tracing(router)
}
