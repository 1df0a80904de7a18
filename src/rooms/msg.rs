use clap::ValueEnum;

use crate::store::Message;

use super::{ConnId, Relay, ServerEvent};

/// Whether the sender gets its own message back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum EchoPolicy {
    #[default]
    Include,
    Exclude,
}

impl Relay {
    /// Persists `message` to `room`, then fans it out to the room's members.
    ///
    /// A failed snapshot write is logged and the message is still delivered.
    /// Returns how many connections it was handed to.
    pub fn send_msg(&self, from: ConnId, room: &str, message: Message) -> anyhow::Result<usize> {
        let mut store = self.store()?;

        if let Err(err) = store.append(room, message.clone()) {
            tracing::error!(
                room,
                path = %store.path().display(),
                error = %err,
                "couldn't write message history, keeping it in memory"
            );
        }

        let registry = self.registry()?;
        let event = ServerEvent::Message {
            room: room.to_owned(),
            message,
        };

        let mut delivered = 0;
        for member in registry.members(room) {
            if member == from && self.echo == EchoPolicy::Exclude {
                continue;
            }
            if registry.deliver(member, event.clone()) {
                delivered += 1;
            }
        }

        drop(registry);
        drop(store);
        Ok(delivered)
    }
}
