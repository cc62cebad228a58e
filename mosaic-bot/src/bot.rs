//! Event handling: trigger detection, opt-in registration, dispatch.
//!
//! The bot reacts only to messages that mention it. In a registered
//! channel the message becomes a generation request; elsewhere the only
//! recognized content is the opt-in keyword, everything else gets a hint.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use mosaic_sdk::client::PlatformHandle;
use mosaic_sdk::event::{Event, MessageEvent, UserRef};

use crate::pipeline::Pipeline;
use crate::registry::ChannelRegistry;
use crate::sanitize;

/// Keyword that registers the current channel.
pub const DEFAULT_KEYWORD: &str = "here";

const ACK_TEXT: &str = "workin on it - gimme a sec";
const REGISTERED_TEXT: &str =
    "All set - if you tag me in this channel I will make an image from your message.";

pub struct Bot {
    self_user: UserRef,
    handle: PlatformHandle,
    registry: Arc<ChannelRegistry>,
    pipeline: Arc<Pipeline>,
    keyword: String,
}

impl Bot {
    pub fn new(
        self_user: UserRef,
        handle: PlatformHandle,
        registry: Arc<ChannelRegistry>,
        pipeline: Arc<Pipeline>,
        keyword: impl Into<String>,
    ) -> Self {
        Self {
            self_user,
            handle,
            registry,
            pipeline,
            keyword: keyword.into(),
        }
    }

    /// Handle one platform event. Errors bubble to the event loop, which
    /// logs them and keeps going.
    pub async fn handle_event(&self, event: &Event) -> Result<()> {
        match event {
            Event::Connected => info!("connected"),
            Event::Ready { bot } => {
                info!(id = %bot.id, name = %bot.display_name, "logged in");
            }
            Event::Message(msg) => self.handle_message(msg).await?,
            Event::Disconnected { reason } => warn!(reason = %reason, "disconnected"),
        }
        Ok(())
    }

    async fn handle_message(&self, msg: &MessageEvent) -> Result<()> {
        // Never react to our own messages, and only to ones that tag us.
        if msg.author.id == self.self_user.id {
            return Ok(());
        }
        if !msg.mentions_user(&self.self_user.id) {
            return Ok(());
        }

        let prompt = sanitize::sanitize(&msg.content, &msg.mentions, &self.self_user.id);

        if self.registry.contains(&msg.channel_id).await {
            info!(channel = %msg.channel_id, prompt = %prompt, "executing generation request");
            self.handle.reply(&msg.channel_id, ACK_TEXT).await?;
            self.pipeline
                .spawn(self.handle.clone(), msg.channel_id.clone(), prompt);
            return Ok(());
        }

        if prompt.eq_ignore_ascii_case(&self.keyword) {
            if let Err(err) = self.registry.add(&msg.channel_id).await {
                // In-memory registration still took; the next successful
                // write persists it.
                warn!(channel = %msg.channel_id, error = %err, "failed to persist channel registration");
            }
            self.handle.reply(&msg.channel_id, REGISTERED_TEXT).await?;
        } else {
            let hint = format!(
                "If you want me to generate images in this channel - tag me in a message and type \"{}\"",
                self.keyword
            );
            self.handle.reply(&msg.channel_id, &hint).await?;
        }
        Ok(())
    }
}
