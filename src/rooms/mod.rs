mod event;
mod msg;
mod registry;
mod room;
mod ws;

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use axum::{routing::get, Router};

use crate::{store::{Message, MessageStore}, AppState};

pub use event::{ClientEvent, ServerEvent};
pub use msg::EchoPolicy;
pub use registry::{ConnId, Outbound, RoomRegistry, Session};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/r/{room}", get(room::history))
        .route("/ws", get(ws::room_ws))
}

/// Shared handle over the message store and the room registry.
///
/// Lock order is store, then registry. Anything that appends or replays
/// history holds the store lock for the whole step, which gives every
/// append a single global order.
#[derive(Clone)]
pub struct Relay {
    store: Arc<Mutex<MessageStore>>,
    registry: Arc<Mutex<RoomRegistry>>,
    echo: EchoPolicy,
}

impl Relay {
    pub fn new(store: MessageStore, echo: EchoPolicy) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            registry: Arc::new(Mutex::new(RoomRegistry::new())),
            echo,
        }
    }

    fn store(&self) -> anyhow::Result<MutexGuard<'_, MessageStore>> {
        self.store.lock().map_err(|_| anyhow!("message store lock poisoned"))
    }

    fn registry(&self) -> anyhow::Result<MutexGuard<'_, RoomRegistry>> {
        self.registry.lock().map_err(|_| anyhow!("room registry lock poisoned"))
    }

    pub fn connect(&self, id: ConnId, outbound: Outbound) -> anyhow::Result<()> {
        let mut registry = self.registry()?;
        registry.connect(id, outbound);
        tracing::debug!(connections = registry.connections(), "connection registered");
        Ok(())
    }

    /// Puts `id` in `room` and replays the room's history to it alone.
    pub fn join(&self, id: ConnId, room: &str, display_name: Option<String>) -> anyhow::Result<()> {
        let store = self.store()?;
        let mut registry = self.registry()?;

        if !registry.join(id, room, display_name) {
            return Err(anyhow!("connection {id} isn't registered"));
        }

        registry.deliver(id, ServerEvent::LoadMessages {
            room: room.to_owned(),
            messages: store.history(room).to_vec(),
        });
        Ok(())
    }

    pub fn disconnect(&self, id: ConnId) -> anyhow::Result<Option<Session>> {
        Ok(self.registry()?.disconnect(id))
    }

    pub fn history(&self, room: &str) -> anyhow::Result<Vec<Message>> {
        Ok(self.store()?.history(room).to_vec())
    }

    pub fn display_name(&self, id: ConnId) -> anyhow::Result<Option<String>> {
        Ok(self.registry()?
            .session(id)
            .and_then(|session| session.display_name.clone()))
    }

    pub fn members(&self, room: &str) -> anyhow::Result<usize> {
        Ok(self.registry()?.members(room).len())
    }
}
