use axum::{debug_handler, extract::{ws::{Message as WsMessage, WebSocket}, State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};
use rand::seq::IndexedRandom;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::store::Message;

use super::{ClientEvent, ConnId, Relay, ServerEvent};

#[debug_handler(state = crate::AppState)]
pub async fn room_ws(
    State(relay): State<Relay>,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| session(relay, stream))
}

/// Drives one connection from upgrade to close.
async fn session(relay: Relay, stream: WebSocket) {
    let id = Uuid::now_v7();
    let (mut sender, mut receiver) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    if let Err(err) = relay.connect(id, tx) {
        tracing::error!(connection = %id, error = %err, "couldn't register connection");
        return;
    }
    tracing::info!(connection = %id, "user connected");

    let mut writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "couldn't encode event");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else {
                    break;
                };
                if let WsMessage::Close(_) = frame {
                    break;
                }
                if let Err(err) = handle_frame(&relay, id, frame) {
                    tracing::error!(connection = %id, error = %err, "couldn't handle event");
                }
            }
            _ = &mut writer => break,
        }
    }

    match relay.disconnect(id) {
        Ok(Some(session)) => {
            let name = session.display_name.unwrap_or_else(|| id.to_string());
            tracing::info!(connection = %id, "{name} left the chat");
        }
        Ok(None) => {}
        Err(err) => tracing::error!(connection = %id, error = %err, "couldn't clean up connection"),
    }
    writer.abort();
}

fn handle_frame(relay: &Relay, id: ConnId, frame: WsMessage) -> anyhow::Result<()> {
    if !matches!(frame, WsMessage::Text(_) | WsMessage::Binary(_)) {
        return Ok(());
    }

    let event = match serde_json::from_slice::<ClientEvent>(&frame.into_data()) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(connection = %id, error = %err, "dropping malformed event");
            return Ok(());
        }
    };

    match event {
        ClientEvent::JoinRoom { room, .. } | ClientEvent::Message { room, .. } if room.is_empty() => {
            tracing::warn!(connection = %id, "dropping event without a room");
        }
        ClientEvent::JoinRoom { room, username } => {
            let name = username
                .filter(|name| !name.is_empty())
                .unwrap_or_else(random_alias);

            tracing::info!(connection = %id, room = %room, "{name} joined");
            relay.join(id, &room, Some(name))?;
        }
        ClientEvent::Message { room, username, msg } => {
            let username = match username {
                Some(username) => username,
                None => relay.display_name(id)?.unwrap_or_default(),
            };

            tracing::debug!(connection = %id, "[{room}] {username}: {msg}");
            relay.send_msg(id, &room, Message::new(username, msg))?;
        }
    }
    Ok(())
}

fn random_alias() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).unwrap_or(&"Nameless"),
        nouns.choose(&mut rng).unwrap_or(&"User"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_is_two_words() {
        assert_eq!(random_alias().split(' ').count(), 2);
    }
}
