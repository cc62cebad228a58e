//! Events delivered by the chat platform for the bot to consume.

/// A platform user, as seen in message author and mention lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Platform identifier, the token that appears inside mention markup.
    pub id: String,
    /// Human-readable name to substitute for the identifier.
    pub display_name: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// An incoming message, reduced to what the bot needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub author: UserRef,
    pub channel_id: String,
    /// Raw message text, mention markup included.
    pub content: String,
    /// Users mentioned in the message.
    pub mentions: Vec<UserRef>,
}

impl MessageEvent {
    /// Whether the given user id appears in the mention list.
    pub fn mentions_user(&self, id: &str) -> bool {
        self.mentions.iter().any(|u| u.id == id)
    }
}

/// Events that the platform adapter emits to the consumer.
#[derive(Debug, Clone)]
pub enum Event {
    /// Transport established.
    Connected,

    /// Login complete. `bot` is our own user as the platform reports it.
    Ready { bot: UserRef },

    /// A message in a channel.
    Message(MessageEvent),

    /// Connection was closed.
    Disconnected { reason: String },
}
