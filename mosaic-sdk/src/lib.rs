//! mosaic-sdk: the narrow surface between the mosaic bot and a chat platform.
//!
//! The bot core never speaks a platform wire protocol. Incoming traffic
//! arrives as [`event::Event`] values; outgoing traffic leaves as
//! [`client::Command`] values pushed through a [`client::PlatformHandle`].
//! A concrete platform adapter owns the other end of the command channel
//! and translates both directions to its wire protocol.

pub mod client;
pub mod event;
