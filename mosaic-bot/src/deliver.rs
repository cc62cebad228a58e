//! Delivery of pipeline results back to the originating channel.
//!
//! Failures here are terminal for the message, not for the bot: a send
//! error is logged with its context and swallowed, never propagated back
//! into the orchestrator.

use mosaic_sdk::client::{OutgoingMessage, PlatformHandle};
use tracing::error;

/// Filename the composite is attached under.
pub const ATTACHMENT_NAME: &str = "mosaic.jpg";

/// Post the composite (or a failure notice when there is none).
pub async fn deliver(
    handle: &PlatformHandle,
    channel_id: &str,
    composite: Option<Vec<u8>>,
    caption: &str,
    prompt: &str,
) {
    let message = match composite {
        Some(bytes) => OutgoingMessage::embed(caption)
            .with_field("Prompt", prompt)
            .with_file(ATTACHMENT_NAME, bytes),
        None => OutgoingMessage::embed(format!("Unable to generate: {prompt}")),
    };

    if let Err(err) = handle.send(channel_id, message).await {
        error!(channel = channel_id, prompt, error = %err, "failed to deliver generation result");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_sdk::client::{Command, command_channel};

    #[tokio::test]
    async fn success_carries_caption_prompt_and_attachment() {
        let (handle, mut rx) = command_channel(4);
        deliver(&handle, "chan", Some(vec![0xff, 0xd8]), "\"a red fox\"", "a red fox").await;

        let Some(Command::Send { channel_id, message }) = rx.recv().await else {
            panic!("expected a send command");
        };
        assert_eq!(channel_id, "chan");
        assert_eq!(message.embeds[0].description, "\"a red fox\"");
        assert_eq!(message.embeds[0].fields[0].name, "Prompt");
        assert_eq!(message.embeds[0].fields[0].value, "a red fox");
        assert_eq!(message.files.len(), 1);
        assert_eq!(message.files[0].filename, ATTACHMENT_NAME);
        assert_eq!(message.files[0].bytes, vec![0xff, 0xd8]);
    }

    #[tokio::test]
    async fn failure_posts_a_notice_with_the_prompt() {
        let (handle, mut rx) = command_channel(4);
        deliver(&handle, "chan", None, "\"a red fox\"", "a red fox").await;

        let Some(Command::Send { message, .. }) = rx.recv().await else {
            panic!("expected a send command");
        };
        assert_eq!(message.embeds[0].description, "Unable to generate: a red fox");
        assert!(message.files.is_empty());
    }

    #[tokio::test]
    async fn send_error_is_swallowed() {
        let (handle, rx) = command_channel(1);
        drop(rx);
        // Must not panic or return an error; the failure only gets logged.
        deliver(&handle, "chan", None, "caption", "prompt").await;
    }
}
