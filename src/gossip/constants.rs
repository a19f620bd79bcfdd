//! Wire constants for the Lightning gossip protocol (BOLT #7).
//!
//! Reference:
//! https://github.com/lightning/bolts/blob/master/07-routing-gossip.md

/// `channel_announcement` message type.
pub const CHANNEL_ANNOUNCEMENT: u16 = 256;

/// `node_announcement` message type.
pub const NODE_ANNOUNCEMENT: u16 = 257;

/// `channel_update` message type.
pub const CHANNEL_UPDATE: u16 = 258;

/// Private `gossip_store` bookkeeping record written by Core Lightning
/// (`WIRE_GOSSIP_STORE_CHANNEL_AMOUNT`). It carries nothing a topology
/// consumer needs and is skipped without decoding.
pub const GOSSIP_STORE_CHANNEL_AMOUNT: u16 = 3503;

/// Size of a compact ECDSA signature on the wire.
pub const SIGNATURE_LEN: usize = 64;

/// Size of a compressed secp256k1 public key.
pub const PUBKEY_LEN: usize = 33;

/// Size of a chain hash (genesis block hash of the chain).
pub const CHAIN_HASH_LEN: usize = 32;

/// Node aliases are always exactly 32 bytes, NUL padded.
pub const ALIAS_LEN: usize = 32;

/// `rgb_color` of a node announcement.
pub const RGB_COLOR_LEN: usize = 3;

/// Address descriptor discriminants as used in `node_announcement`.
///
/// | Type | Kind     | Payload |
/// |------|----------|---------|
/// | 1    | IPv4     | 4 B     |
/// | 2    | IPv6     | 16 B    |
/// | 3    | Tor v2   | 10 B    | (deprecated)
/// | 4    | Tor v3   | 35 B    |
pub const ADDR_IPV4: u8 = 1;
pub const ADDR_IPV6: u8 = 2;
pub const ADDR_TORV2: u8 = 3;
pub const ADDR_TORV3: u8 = 4;

pub const ADDR_IPV4_LEN: usize = 4;
pub const ADDR_IPV6_LEN: usize = 16;
pub const ADDR_TORV2_LEN: usize = 10;
pub const ADDR_TORV3_LEN: usize = 35;

/// Magic prefix of a gossip dataset file: `GSP` followed by the format version.
pub const DATASET_MAGIC: [u8; 3] = *b"GSP";

/// The only dataset format version understood by this crate.
pub const DATASET_VERSION: u8 = 1;
