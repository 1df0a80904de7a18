use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::event::ServerEvent;

pub type ConnId = Uuid;
pub type Outbound = mpsc::UnboundedSender<ServerEvent>;

/// Server side state of one live connection.
#[derive(Debug)]
pub struct Session {
    outbound: Outbound,
    pub room: Option<String>,
    pub display_name: Option<String>,
}

/// Which connections sit in which room.
///
/// Sessions are keyed by connection id and every `Session::room` has a
/// matching entry in `rooms`. Rooms with no members aren't kept around.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    sessions: HashMap<ConnId, Session>,
    rooms: HashMap<String, HashSet<ConnId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, id: ConnId, outbound: Outbound) {
        self.sessions.insert(id, Session {
            outbound,
            room: None,
            display_name: None,
        });
    }

    /// Moves `id` into `room`, leaving whatever room it was in before.
    ///
    /// Returns `false` for connections that never connected.
    pub fn join(&mut self, id: ConnId, room: &str, display_name: Option<String>) -> bool {
        if !self.sessions.contains_key(&id) {
            return false;
        }

        self.leave(id);

        self.rooms
            .entry(room.to_owned())
            .or_default()
            .insert(id);

        if let Some(session) = self.sessions.get_mut(&id) {
            session.room = Some(room.to_owned());
            session.display_name = display_name;
        }
        true
    }

    /// Drops `id` from its room. Returns the room it left, if any.
    pub fn leave(&mut self, id: ConnId) -> Option<String> {
        let session = self.sessions.get_mut(&id)?;
        let room = session.room.take()?;
        session.display_name = None;

        self.drop_member(id, &room);
        Some(room)
    }

    /// Forgets the connection entirely. The returned session still carries
    /// the room and display name it had.
    pub fn disconnect(&mut self, id: ConnId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        if let Some(room) = &session.room {
            self.drop_member(id, room);
        }
        Some(session)
    }

    fn drop_member(&mut self, id: ConnId, room: &str) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }

    pub fn members(&self, room: &str) -> HashSet<ConnId> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    pub fn session(&self, id: ConnId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Fire and forget; a closed channel just means the socket is going away.
    pub fn deliver(&self, id: ConnId, event: ServerEvent) -> bool {
        self.sessions
            .get(&id)
            .is_some_and(|session| session.outbound.send(event).is_ok())
    }

    pub fn connections(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(registry: &mut RoomRegistry) -> (ConnId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = Uuid::now_v7();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.connect(id, tx);
        (id, rx)
    }

    #[test]
    fn join_adds_member() {
        let mut registry = RoomRegistry::new();
        let (a, _rx) = connected(&mut registry);

        assert!(registry.join(a, "lobby", Some("ana".into())));

        assert_eq!(registry.members("lobby"), HashSet::from([a]));
        let session = registry.session(a).unwrap();
        assert_eq!(session.room.as_deref(), Some("lobby"));
        assert_eq!(session.display_name.as_deref(), Some("ana"));
    }

    #[test]
    fn join_unknown_connection_is_refused() {
        let mut registry = RoomRegistry::new();

        assert!(!registry.join(Uuid::now_v7(), "lobby", None));
        assert!(registry.members("lobby").is_empty());
    }

    #[test]
    fn members_of_empty_room() {
        assert!(RoomRegistry::new().members("lobby").is_empty());
    }

    #[test]
    fn rejoin_leaves_previous_room() {
        let mut registry = RoomRegistry::new();
        let (a, _rx) = connected(&mut registry);
        let (b, _rx_b) = connected(&mut registry);

        registry.join(a, "lobby", None);
        registry.join(b, "lobby", None);
        registry.join(a, "games", None);

        assert_eq!(registry.members("lobby"), HashSet::from([b]));
        assert_eq!(registry.members("games"), HashSet::from([a]));
    }

    #[test]
    fn leave_clears_session_room() {
        let mut registry = RoomRegistry::new();
        let (a, _rx) = connected(&mut registry);
        registry.join(a, "lobby", Some("ana".into()));

        assert_eq!(registry.leave(a).as_deref(), Some("lobby"));
        assert!(registry.members("lobby").is_empty());
        let session = registry.session(a).unwrap();
        assert!(session.room.is_none());
        assert!(session.display_name.is_none());

        assert_eq!(registry.leave(a), None);
    }

    #[test]
    fn leave_without_join_is_noop() {
        let mut registry = RoomRegistry::new();
        let (a, _rx) = connected(&mut registry);

        assert_eq!(registry.leave(a), None);
        assert_eq!(registry.leave(Uuid::now_v7()), None);
    }

    #[test]
    fn disconnect_forgets_connection() {
        let mut registry = RoomRegistry::new();
        let (a, _rx) = connected(&mut registry);
        registry.join(a, "lobby", None);

        assert!(registry.disconnect(a).is_some());

        assert!(registry.members("lobby").is_empty());
        assert!(registry.disconnect(a).is_none());
        assert!(registry.session(a).is_none());
        assert_eq!(registry.connections(), 0);
    }

    #[test]
    fn disconnect_returns_name_and_room() {
        let mut registry = RoomRegistry::new();
        let (a, _rx) = connected(&mut registry);
        let (b, _rx_b) = connected(&mut registry);
        registry.join(a, "lobby", Some("ana".into()));
        registry.join(b, "lobby", Some("bo".into()));

        let session = registry.disconnect(a).unwrap();

        assert_eq!(session.display_name.as_deref(), Some("ana"));
        assert_eq!(session.room.as_deref(), Some("lobby"));
        assert_eq!(registry.members("lobby"), HashSet::from([b]));
    }

    #[test]
    fn deliver_to_closed_channel_fails_quietly() {
        let mut registry = RoomRegistry::new();
        let (a, rx) = connected(&mut registry);
        drop(rx);

        let event = ServerEvent::LoadMessages { room: "lobby".into(), messages: vec![] };
        assert!(!registry.deliver(a, event));
    }
}
