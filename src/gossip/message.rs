use std::fmt::{self, Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::gossip::base32;
use crate::gossip::constants::{
    ADDR_IPV4, ADDR_IPV4_LEN, ADDR_IPV6, ADDR_IPV6_LEN, ADDR_TORV2, ADDR_TORV2_LEN, ADDR_TORV3,
    ADDR_TORV3_LEN, ALIAS_LEN, CHAIN_HASH_LEN, CHANNEL_ANNOUNCEMENT, CHANNEL_UPDATE,
    GOSSIP_STORE_CHANNEL_AMOUNT, NODE_ANNOUNCEMENT, PUBKEY_LEN, RGB_COLOR_LEN, SIGNATURE_LEN,
};
use crate::gossip::error::DecodeError;

/// Implemented by types that can be decoded from a gossip message payload.
///
/// Decoders read from `payload` starting at `*c` and leave `*c` just past
/// the last byte they consumed, so the cursor doubles as the
/// bytes-consumed count.
pub trait Decode: Sized {
    fn decode_from(payload: &[u8], c: &mut usize) -> Result<Self, DecodeError>;

    /// Decodes `Self` from the start of `payload`.
    fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut c = 0;
        Self::decode_from(payload, &mut c)
    }
}

/// The gossip message types this crate knows about.
///
/// The 2-byte big-endian type tag at the front of every message selects
/// the variant. Tags outside this set are rejected with
/// [`DecodeError::UnknownMessageType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    ChannelAnnouncement,
    NodeAnnouncement,
    ChannelUpdate,
    /// Known, but carries nothing of interest. Decodes to no record.
    Ignored,
}

impl TryFrom<u16> for MessageType {
    type Error = DecodeError;

    fn try_from(tag: u16) -> Result<Self, DecodeError> {
        match tag {
            CHANNEL_ANNOUNCEMENT => Ok(MessageType::ChannelAnnouncement),
            NODE_ANNOUNCEMENT => Ok(MessageType::NodeAnnouncement),
            CHANNEL_UPDATE => Ok(MessageType::ChannelUpdate),
            GOSSIP_STORE_CHANNEL_AMOUNT => Ok(MessageType::Ignored),
            other => Err(DecodeError::UnknownMessageType(other)),
        }
    }
}

impl MessageType {
    /// Wire tag for this message type.
    pub const fn tag(self) -> u16 {
        match self {
            MessageType::ChannelAnnouncement => CHANNEL_ANNOUNCEMENT,
            MessageType::NodeAnnouncement => NODE_ANNOUNCEMENT,
            MessageType::ChannelUpdate => CHANNEL_UPDATE,
            MessageType::Ignored => GOSSIP_STORE_CHANNEL_AMOUNT,
        }
    }
}

/// A decoded gossip record.
///
/// The set of variants is closed: it mirrors the message types of
/// BOLT #7 that carry topology information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    ChannelAnnouncement(ChannelAnnouncement),
    NodeAnnouncement(NodeAnnouncement),
    ChannelUpdate(ChannelUpdate),
}

impl Message {
    /// Decodes exactly one message from `bytes`.
    ///
    /// Returns `Ok(None)` for message types that are known but carry no
    /// topology data, so callers can tell "nothing to record" apart from
    /// a decode failure.
    ///
    /// ```
    /// use lntopo::gossip::{DecodeError, Message};
    ///
    /// // gossip_store bookkeeping record: valid, but no record produced
    /// assert_eq!(Message::parse(&3503u16.to_be_bytes()), Ok(None));
    ///
    /// // unregistered tag
    /// assert_eq!(
    ///     Message::parse(&[0x00, 0x11]),
    ///     Err(DecodeError::UnknownMessageType(17)),
    /// );
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Option<Message>, DecodeError> {
        let mut c = 0;
        let tag = u16::from_be_bytes(crate::gossip::decode::array(bytes, &mut c, "type")?);

        let message = match MessageType::try_from(tag)? {
            MessageType::ChannelAnnouncement => {
                Message::ChannelAnnouncement(ChannelAnnouncement::decode_from(bytes, &mut c)?)
            }
            MessageType::NodeAnnouncement => {
                Message::NodeAnnouncement(NodeAnnouncement::decode_from(bytes, &mut c)?)
            }
            MessageType::ChannelUpdate => {
                Message::ChannelUpdate(ChannelUpdate::decode_from(bytes, &mut c)?)
            }
            MessageType::Ignored => return Ok(None),
        };

        Ok(Some(message))
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::ChannelAnnouncement(_) => MessageType::ChannelAnnouncement,
            Message::NodeAnnouncement(_) => MessageType::NodeAnnouncement,
            Message::ChannelUpdate(_) => MessageType::ChannelUpdate,
        }
    }

    /// Short channel id of channel-bearing records, `None` for node announcements.
    pub fn short_channel_id(&self) -> Option<ShortChannelId> {
        match self {
            Message::ChannelAnnouncement(m) => Some(m.short_channel_id()),
            Message::ChannelUpdate(m) => Some(m.short_channel_id()),
            Message::NodeAnnouncement(_) => None,
        }
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Message::ChannelAnnouncement(m) => Display::fmt(m, f),
            Message::NodeAnnouncement(m) => Display::fmt(m, f),
            Message::ChannelUpdate(m) => Display::fmt(m, f),
        }
    }
}

/// A packed short channel id.
///
/// On the wire this is a single big-endian `u64` made of the funding
/// transaction's block height (24 bits), its index in the block (24 bits)
/// and the funding output index (16 bits).
///
/// The display form is `{block}x{tx_index}x{output_index}`. The output
/// index is masked to its low 8 bits for display, which matches the
/// identifiers already present in existing exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortChannelId(pub u64);

impl ShortChannelId {
    pub const fn block(self) -> u32 {
        ((self.0 >> 40) & 0xFF_FFFF) as u32
    }

    pub const fn tx_index(self) -> u32 {
        ((self.0 >> 16) & 0xFF_FFFF) as u32
    }

    pub const fn output_index(self) -> u16 {
        (self.0 & 0xFF) as u16
    }
}

impl From<u64> for ShortChannelId {
    fn from(value: u64) -> Self {
        ShortChannelId(value)
    }
}

impl Display for ShortChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.block(),
            self.tx_index(),
            self.output_index()
        )
    }
}

/// `channel_announcement` (type 256).
///
/// Layout:
///
/// ```text
/// 64 bytes  node_signature_1
/// 64 bytes  node_signature_2
/// 64 bytes  bitcoin_signature_1
/// 64 bytes  bitcoin_signature_2
/// u16       len
/// len bytes features
/// 32 bytes  chain_hash
/// u64       short_channel_id
/// 33 bytes  node_id_1
/// 33 bytes  node_id_2
/// 33 bytes  bitcoin_key_1
/// 33 bytes  bitcoin_key_2
/// ```
///
/// The node and bitcoin key pairs keep the announcer's order; they are
/// not sorted, and equality compares them position by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAnnouncement {
    pub node_signatures: [[u8; SIGNATURE_LEN]; 2],
    pub bitcoin_signatures: [[u8; SIGNATURE_LEN]; 2],
    pub features: Vec<u8>,
    /// Stored byte-reversed relative to the wire.
    pub chain_hash: [u8; CHAIN_HASH_LEN],
    pub num_short_channel_id: u64,
    pub node_ids: [[u8; PUBKEY_LEN]; 2],
    pub bitcoin_keys: [[u8; PUBKEY_LEN]; 2],
}

impl ChannelAnnouncement {
    pub fn short_channel_id(&self) -> ShortChannelId {
        ShortChannelId(self.num_short_channel_id)
    }
}

impl Display for ChannelAnnouncement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChannelAnnouncement(scid={}, nodes=[{},{}])",
            self.short_channel_id(),
            hex::encode(self.node_ids[0]),
            hex::encode(self.node_ids[1])
        )
    }
}

/// `channel_update` (type 258).
///
/// Layout:
///
/// ```text
/// 64 bytes  signature
/// 32 bytes  chain_hash
/// u64       short_channel_id
/// u32       timestamp
/// u8        message_flags
/// u8        channel_flags
/// u16       cltv_expiry_delta
/// u64       htlc_minimum_msat
/// u32       fee_base_msat
/// u32       fee_proportional_millionths
/// u64       htlc_maximum_msat   (optional, later protocol versions)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpdate {
    pub signature: [u8; SIGNATURE_LEN],
    /// Stored byte-reversed relative to the wire.
    pub chain_hash: [u8; CHAIN_HASH_LEN],
    pub num_short_channel_id: u64,
    pub timestamp: u32,
    pub message_flags: u8,
    pub channel_flags: u8,
    pub cltv_expiry_delta: u16,
    pub htlc_minimum_msat: u64,
    pub fee_base_msat: u32,
    pub fee_proportional_millionths: u32,
    pub htlc_maximum_msat: Option<u64>,
}

impl ChannelUpdate {
    pub fn short_channel_id(&self) -> ShortChannelId {
        ShortChannelId(self.num_short_channel_id)
    }

    /// Which endpoint issued the update: 0 for `node_id_1`, 1 for `node_id_2`.
    pub fn direction(&self) -> u8 {
        self.channel_flags & 0x01
    }

    pub fn is_disabled(&self) -> bool {
        (self.channel_flags >> 1) & 0x01 == 1
    }
}

impl Display for ChannelUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChannelUpdate(scid={}, timestamp={})",
            self.short_channel_id(),
            self.timestamp
        )
    }
}

/// `node_announcement` (type 257).
///
/// Layout:
///
/// ```text
/// 64 bytes  signature
/// u16       flen
/// flen      features
/// u32       timestamp
/// 33 bytes  node_id
/// 3 bytes   rgb_color
/// 32 bytes  alias
/// u16       addrlen
/// addrlen   addresses
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAnnouncement {
    pub signature: [u8; SIGNATURE_LEN],
    pub features: Vec<u8>,
    pub timestamp: u32,
    pub node_id: [u8; PUBKEY_LEN],
    pub rgb_color: [u8; RGB_COLOR_LEN],
    /// Raw alias, NUL padded to 32 bytes.
    pub alias: [u8; ALIAS_LEN],
    /// Addresses in announcement order, which is the node's preference order.
    pub addresses: Vec<NetAddress>,
}

impl NodeAnnouncement {
    /// The alias with its trailing NUL padding removed.
    pub fn alias_str(&self) -> String {
        let end = self
            .alias
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.alias[..end]).into_owned()
    }
}

impl Display for NodeAnnouncement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NodeAnnouncement(id={}, alias={}, color={})",
            hex::encode(self.node_id),
            self.alias_str(),
            hex::encode(self.rgb_color)
        )
    }
}

/// A network address descriptor from a `node_announcement`.
///
/// | Type | Variant  | Payload |
/// |------|----------|---------|
/// | 1    | Ipv4     | 4 B     |
/// | 2    | Ipv6     | 16 B    |
/// | 3    | TorV2    | 10 B    | (deprecated, Tor v2 shut down in 2021)
/// | 4    | TorV3    | 35 B    |
///
/// Every known type is followed by a big-endian `u16` port. Any other
/// type swallows the rest of the address list as an opaque payload and
/// has no port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetAddress {
    Ipv4 { addr: Ipv4Addr, port: u16 },
    Ipv6 { addr: Ipv6Addr, port: u16 },
    TorV2 { onion: [u8; ADDR_TORV2_LEN], port: u16 },
    TorV3 { onion: [u8; ADDR_TORV3_LEN], port: u16 },
    Unknown { typ: u8, payload: Vec<u8> },
}

impl NetAddress {
    /// The wire discriminant.
    pub fn typ(&self) -> u8 {
        match self {
            NetAddress::Ipv4 { .. } => ADDR_IPV4,
            NetAddress::Ipv6 { .. } => ADDR_IPV6,
            NetAddress::TorV2 { .. } => ADDR_TORV2,
            NetAddress::TorV3 { .. } => ADDR_TORV3,
            NetAddress::Unknown { typ, .. } => *typ,
        }
    }

    /// Host in display form: dotted decimal, bracketed IPv6, `<base32>.onion`,
    /// or hex for unknown types.
    ///
    /// ```
    /// use lntopo::gossip::NetAddress;
    ///
    /// let a = NetAddress::TorV2 { onion: [0xFF; 10], port: 9735 };
    /// assert_eq!(a.host(), "7777777777777777.onion");
    /// ```
    pub fn host(&self) -> String {
        match self {
            NetAddress::Ipv4 { addr, .. } => addr.to_string(),
            NetAddress::Ipv6 { addr, .. } => format!("[{addr}]"),
            NetAddress::TorV2 { onion, .. } => format!("{}.onion", base32::encode(onion)),
            NetAddress::TorV3 { onion, .. } => format!("{}.onion", base32::encode(onion)),
            NetAddress::Unknown { payload, .. } => hex::encode(payload),
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            NetAddress::Ipv4 { port, .. }
            | NetAddress::Ipv6 { port, .. }
            | NetAddress::TorV2 { port, .. }
            | NetAddress::TorV3 { port, .. } => Some(*port),
            NetAddress::Unknown { .. } => None,
        }
    }

    /// Number of bytes this descriptor occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        let body = match self {
            NetAddress::Ipv4 { .. } => ADDR_IPV4_LEN + 2,
            NetAddress::Ipv6 { .. } => ADDR_IPV6_LEN + 2,
            NetAddress::TorV2 { .. } => ADDR_TORV2_LEN + 2,
            NetAddress::TorV3 { .. } => ADDR_TORV3_LEN + 2,
            NetAddress::Unknown { payload, .. } => payload.len(),
        };
        1 + body
    }

    fn proto(&self) -> &'static str {
        match self {
            NetAddress::Ipv4 { .. } => "ipv4",
            NetAddress::Ipv6 { .. } => "ipv6",
            NetAddress::TorV2 { .. } => "torv2",
            NetAddress::TorV3 { .. } => "torv3",
            NetAddress::Unknown { .. } => "unknown",
        }
    }
}

impl Display for NetAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.port() {
            Some(port) => write!(f, "{}://{}:{}", self.proto(), self.host(), port),
            None => write!(f, "{}://{}", self.proto(), self.host()),
        }
    }
}
