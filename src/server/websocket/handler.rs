//! WebSocket route handler.
//!
//! Handles the upgrade, fans feed and playback broadcasts out to the socket and
//! applies playback commands sent by the client.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::messages::{msg_types, system, ClientMessage, ServerMessage};
use crate::playback::{PlaybackOp, PlaybackSessionManager};
use crate::social::FeedEvent;
use crate::server::error::ApiError;
use crate::server::metrics;
use crate::server::playback_routes::apply_playback_op;
use crate::server::session::Session;
use crate::server::state::{GuardedFeedService, GuardedPlaybackSessions, GuardedUserManager};
use crate::user::policy::require;
use crate::user::Permission;

const OUTGOING_BUFFER: usize = 64;

/// Route handler for `GET /v1/ws`.
pub async fn ws_handler(
    session: Session,
    ws: WebSocketUpgrade,
    State(user_manager): State<GuardedUserManager>,
    State(feed): State<GuardedFeedService>,
    State(playback): State<GuardedPlaybackSessions>,
) -> Result<Response, ApiError> {
    require(&session.actor(), Permission::AccessCatalog)?;
    debug!("WebSocket upgrade for user {}", session.user_id);
    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, session, user_manager, feed, playback)
    }))
}

/// Reloads role and approval so changes made while the socket is open take effect.
/// Returns `None` once the account is gone.
fn refresh_session(user_manager: &GuardedUserManager, session: &Session) -> Option<Session> {
    match user_manager.lock().unwrap().get_user(session.user_id) {
        Ok(Some(user)) => Some(Session {
            role: user.role,
            approved: user.approved,
            ..session.clone()
        }),
        Ok(None) => None,
        Err(e) => {
            error!("Failed to reload user {}: {}", session.user_id, e);
            None
        }
    }
}

async fn handle_socket(
    socket: WebSocket,
    session: Session,
    user_manager: GuardedUserManager,
    feed: GuardedFeedService,
    playback: GuardedPlaybackSessions,
) {
    metrics::WS_CONNECTIONS.inc();
    let (outgoing_tx, outgoing_rx) = mpsc::channel::<ServerMessage>(OUTGOING_BUFFER);
    let (ws_sink, ws_stream) = socket.split();

    let connected_msg = ServerMessage::new(
        msg_types::CONNECTED,
        system::Connected {
            user_id: session.user_id,
            server_version: format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH")),
        },
    );

    let mut relays: Vec<JoinHandle<()>> = vec![tokio::spawn(forward_outgoing(
        ws_sink,
        outgoing_rx,
        connected_msg,
    ))];

    // Unapproved accounts get no feed.
    if session.actor().has(Permission::SocialInteract) {
        relays.push(tokio::spawn(relay_feed(
            feed.subscribe(),
            outgoing_tx.clone(),
            user_manager.clone(),
            session.clone(),
        )));
    }
    relays.push(tokio::spawn(relay_broadcast(
        playback.subscribe(session.user_id).await,
        outgoing_tx.clone(),
        msg_types::PLAYBACK_COMMANDS,
    )));

    process_incoming(ws_stream, &session, &user_manager, &playback, &outgoing_tx).await;

    debug!("WebSocket disconnected: user {}", session.user_id);
    for relay in relays {
        relay.abort();
    }
    metrics::WS_CONNECTIONS.dec();
}

async fn forward_outgoing(
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<ServerMessage>,
    initial_msg: ServerMessage,
) {
    let mut next = Some(initial_msg);
    while let Some(msg) = next {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => error!("Failed to serialize WebSocket message: {}", e),
        }
        next = outgoing_rx.recv().await;
    }
}

/// Like `relay_broadcast`, but drops events while the user lacks `SocialInteract`.
async fn relay_feed(
    mut rx: broadcast::Receiver<FeedEvent>,
    outgoing_tx: mpsc::Sender<ServerMessage>,
    user_manager: GuardedUserManager,
    session: Session,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let allowed = refresh_session(&user_manager, &session)
                    .is_some_and(|s| s.actor().has(Permission::SocialInteract));
                if !allowed {
                    debug!("Dropping feed event for user {}", session.user_id);
                    continue;
                }
                if outgoing_tx
                    .send(ServerMessage::new(msg_types::FEED, event))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("WebSocket feed relay lagged by {} messages", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Wraps every broadcast item in a `msg_type` envelope until either side closes.
async fn relay_broadcast<T: Clone + Serialize>(
    mut rx: broadcast::Receiver<T>,
    outgoing_tx: mpsc::Sender<ServerMessage>,
    msg_type: &'static str,
) {
    loop {
        match rx.recv().await {
            Ok(item) => {
                if outgoing_tx
                    .send(ServerMessage::new(msg_type, item))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("WebSocket relay for {} lagged by {} messages", msg_type, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn process_incoming(
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    session: &Session,
    user_manager: &GuardedUserManager,
    playback: &Arc<PlaybackSessionManager>,
    outgoing_tx: &mpsc::Sender<ServerMessage>,
) {
    while let Some(result) = ws_stream.next().await {
        let reply = match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(msg, session, user_manager, playback).await,
                Err(e) => {
                    debug!("Failed to parse client message: {}", e);
                    Some(ServerMessage::error(
                        "parse_error",
                        format!("Invalid message format: {}", e),
                    ))
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => None,
            Err(e) => {
                debug!("WebSocket error for user {}: {}", session.user_id, e);
                break;
            }
        };
        if let Some(reply) = reply {
            if outgoing_tx.send(reply).await.is_err() {
                break;
            }
        }
    }
}

/// Returns the direct reply, if any. Successful playback commands reach the client
/// through the user's playback broadcast instead.
async fn handle_client_message(
    msg: ClientMessage,
    session: &Session,
    user_manager: &GuardedUserManager,
    playback: &PlaybackSessionManager,
) -> Option<ServerMessage> {
    match msg.msg_type.as_str() {
        msg_types::PING => Some(ServerMessage::empty(msg_types::PONG)),
        msg_types::PLAYBACK_COMMAND => {
            let op = match serde_json::from_value::<PlaybackOp>(msg.payload) {
                Ok(op) => op,
                Err(e) => {
                    return Some(ServerMessage::error(
                        "invalid_command",
                        format!("Invalid playback command: {}", e),
                    ))
                }
            };
            let Some(current) = refresh_session(user_manager, session) else {
                return Some(ServerMessage::error("playback_error", "Account not found"));
            };
            match apply_playback_op(playback, &current, op).await {
                Ok(_) => None,
                Err(e) => Some(ServerMessage::error("playback_error", e.to_string())),
            }
        }
        other => {
            debug!("Unknown client message type {:?}", other);
            Some(ServerMessage::error(
                "unknown_type",
                format!("Unknown message type: {}", other),
            ))
        }
    }
}
