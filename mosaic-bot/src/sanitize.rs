//! Prompt sanitization for incoming messages.
//!
//! Raw message text carries mention markup and platform control characters.
//! Sanitization strips the markup, names the mentioned humans, and erases
//! the bot's own mention so the remainder reads as a plain prompt.

use mosaic_sdk::event::UserRef;

/// Platform markup characters removed from prompts.
const STRIPPED: &[char] = &['\\', '<', '>', '@', '#', '&', '!'];

/// Turn raw message text into a clean prompt.
///
/// Strips markup characters, then replaces each mentioned user's id token
/// with their display name. The bot's own id (matched by `self_id`)
/// collapses to nothing instead. Always succeeds; the result may be empty.
pub fn sanitize(raw: &str, mentions: &[UserRef], self_id: &str) -> String {
    let mut text: String = raw.chars().filter(|c| !STRIPPED.contains(c)).collect();

    for user in mentions {
        let replacement = if user.id == self_id {
            ""
        } else {
            user.display_name.as_str()
        };
        text = text.replace(&user.id, replacement);
    }

    text.trim().to_string()
}
