//! mosaic-bot: a chat bot that turns prompt messages into 3x3 image mosaics.
//!
//! Mentioning the bot in a registered channel sends the message text to an
//! external text-to-image service; the nine returned images are merged into
//! a single composite and posted back to the channel. Channels register by
//! mentioning the bot with the opt-in keyword ("here"), persisted to a flat
//! file.

pub mod bot;
pub mod compose;
pub mod deliver;
pub mod generation;
pub mod pipeline;
pub mod registry;
pub mod sanitize;
