//! Lightning Network gossip decoding.
//!
//! This module turns a single gossip message (2-byte type tag followed by
//! the payload) into a typed record:
//!
//! - `channel_announcement` (256) → [`ChannelAnnouncement`]
//! - `node_announcement` (257) → [`NodeAnnouncement`]
//! - `channel_update` (258) → [`ChannelUpdate`]
//! - gossip_store channel amount (3503) → no record
//!
//! Decoding is a pure function of the input bytes. Nothing is validated
//! against the chain and signatures are not checked.
//!
//! Protocol reference:
//! https://github.com/lightning/bolts/blob/master/07-routing-gossip.md
pub mod base32;
pub mod codec;

pub mod decode;
pub mod encode;
pub mod error;
pub mod message;

pub mod constants;

pub use codec::{FrameError, Frames};
pub use decode::decode_address;
pub use encode::Encode;
pub use error::DecodeError;
pub use message::{
    ChannelAnnouncement, ChannelUpdate, Decode, Message, MessageType, NetAddress,
    NodeAnnouncement, ShortChannelId,
};
