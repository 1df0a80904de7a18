use serde::{Deserialize, Serialize};

use crate::store::Message;

/// Frames a client sends over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room: String,
        #[serde(default)]
        username: Option<String>,
    },
    Message {
        room: String,
        #[serde(default)]
        username: Option<String>,
        msg: String,
    },
}

/// Frames the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// History replay, only ever sent to the connection that joined.
    LoadMessages {
        room: String,
        messages: Vec<Message>,
    },
    Message {
        room: String,
        #[serde(flatten)]
        message: Message,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_without_username() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"joinRoom","room":"lobby"}"#).unwrap();
        assert_eq!(event, ClientEvent::JoinRoom { room: "lobby".into(), username: None });
    }

    #[test]
    fn message_requires_room_and_msg() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"message","msg":"hi"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"message","room":"lobby"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"shout","room":"lobby"}"#).is_err());
    }

    #[test]
    fn broadcast_frame_is_flat() {
        let event = ServerEvent::Message {
            room: "lobby".into(),
            message: Message::new("ana", "hi"),
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({ "type": "message", "room": "lobby", "username": "ana", "msg": "hi" })
        );
    }
}
