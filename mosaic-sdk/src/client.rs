//! Commands the bot issues toward the chat platform.
//!
//! [`PlatformHandle`] is a cloneable wrapper over an mpsc sender. Whatever
//! owns the matching receiver (a platform adapter, the console harness, a
//! test) drains the [`Command`]s and performs the actual sends. This keeps
//! the bot core free of wire-protocol concerns and makes delivery trivially
//! observable in tests.

use anyhow::Result;
use tokio::sync::mpsc;

/// A labeled value inside an embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// A rich-text block attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub description: String,
    pub fields: Vec<EmbedField>,
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// An outgoing channel message: embeds plus optional file attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub embeds: Vec<Embed>,
    pub files: Vec<Attachment>,
}

impl OutgoingMessage {
    /// A message holding a single embed with the given description.
    pub fn embed(description: impl Into<String>) -> Self {
        Self {
            embeds: vec![Embed {
                description: description.into(),
                fields: Vec::new(),
            }],
            files: Vec::new(),
        }
    }

    /// Add a labeled field to the last embed.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(embed) = self.embeds.last_mut() {
            embed.fields.push(EmbedField {
                name: name.into(),
                value: value.into(),
            });
        }
        self
    }

    /// Attach a file.
    pub fn with_file(mut self, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.push(Attachment {
            filename: filename.into(),
            bytes,
        });
        self
    }
}

/// Commands the consumer can send to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Short interim text reply in a channel.
    Reply { channel_id: String, text: String },
    /// Full message with embeds and attachments.
    Send {
        channel_id: String,
        message: OutgoingMessage,
    },
}

/// A handle for pushing commands toward the platform adapter.
#[derive(Clone)]
pub struct PlatformHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl PlatformHandle {
    pub async fn reply(&self, channel_id: &str, text: &str) -> Result<()> {
        self.cmd_tx
            .send(Command::Reply {
                channel_id: channel_id.to_string(),
                text: text.to_string(),
            })
            .await?;
        Ok(())
    }

    pub async fn send(&self, channel_id: &str, message: OutgoingMessage) -> Result<()> {
        self.cmd_tx
            .send(Command::Send {
                channel_id: channel_id.to_string(),
                message,
            })
            .await?;
        Ok(())
    }
}

/// Create a handle and the receiver a platform adapter drains.
pub fn command_channel(capacity: usize) -> (PlatformHandle, mpsc::Receiver<Command>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    (PlatformHandle { cmd_tx }, cmd_rx)
}
