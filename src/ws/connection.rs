//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered feed events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::api::dto::PortfolioSummaryResponse;
use crate::domain::{FeedEvent, UserPrincipal};
use crate::error::GatewayError;
use crate::service::PortfolioService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and answers them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<FeedEvent>,
    service: Arc<PortfolioService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut subs, &service).await;
                        if let Some(json) = reply.to_json()
                            && ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(feed_event) => {
                        if subs.matches(&feed_event) {
                            let msg = WsMessage::event(
                                serde_json::to_value(&feed_event).unwrap_or_default(),
                            );
                            let Some(json) = msg.to_json() else {
                                continue;
                            };
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client and returns the reply.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    service: &PortfolioService,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error(String::new(), 400, "malformed JSON");
    };
    if msg.msg_type != WsMessageType::Command {
        return WsMessage::error(msg.id, 400, "expected a command message");
    }
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(msg.id, 404, "unknown command");
    };

    match command {
        WsCommand::Subscribe { principals } => match parse_principals(&principals) {
            Ok((users, wildcard)) => {
                subs.subscribe(&users, wildcard);
                tracing::debug!(count = subs.count(), wildcard, "ws subscribed");
                WsMessage::response(
                    msg.id,
                    serde_json::json!({
                        "subscribed": users.iter().map(UserPrincipal::as_str).collect::<Vec<_>>(),
                        "count": subs.count(),
                        "wildcard": subs.is_subscribed_all(),
                    }),
                )
            }
            Err(e) => WsMessage::error(msg.id, e.error_code(), &e.to_string()),
        },
        WsCommand::Unsubscribe { principals } => match parse_principals(&principals) {
            Ok((users, _)) => {
                subs.unsubscribe(&users);
                WsMessage::response(
                    msg.id,
                    serde_json::json!({
                        "unsubscribed": users.iter().map(UserPrincipal::as_str).collect::<Vec<_>>(),
                        "remaining_count": subs.count(),
                    }),
                )
            }
            Err(e) => WsMessage::error(msg.id, e.error_code(), &e.to_string()),
        },
        WsCommand::GetPortfolio { principal } => {
            let result = match UserPrincipal::parse(&principal) {
                Ok(user) => service
                    .portfolio_summary(&user)
                    .await
                    .map(|summary| PortfolioSummaryResponse::new(&user, summary)),
                Err(e) => Err(e),
            };
            match result {
                Ok(response) => WsMessage::response(
                    msg.id,
                    serde_json::to_value(&response).unwrap_or_default(),
                ),
                Err(e) => WsMessage::error(msg.id, e.error_code(), &e.to_string()),
            }
        }
    }
}

/// Splits a subscription list into principals and the wildcard flag.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPrincipal`] on the first malformed entry.
fn parse_principals(raw: &[String]) -> Result<(Vec<UserPrincipal>, bool), GatewayError> {
    let mut users = Vec::with_capacity(raw.len());
    let mut wildcard = false;
    for entry in raw {
        if entry == "*" {
            wildcard = true;
        } else {
            users.push(UserPrincipal::parse(entry)?);
        }
    }
    Ok((users, wildcard))
}
