use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::gossip::message::{
    ChannelAnnouncement, ChannelUpdate, Message, NetAddress, NodeAnnouncement,
};

/// Implemented by records that can be written back in wire format.
///
/// Encoding is the exact inverse of [`Decode`](crate::gossip::Decode):
/// the chain hash is re-reversed, and an absent `htlc_maximum_msat`
/// writes nothing.
pub trait Encode {
    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()>;
}

impl Message {
    /// Serializes the message including its 2-byte type tag.
    ///
    /// ```
    /// use lntopo::gossip::{Message, NetAddress, NodeAnnouncement};
    ///
    /// let na = NodeAnnouncement {
    ///     signature: [0; 64],
    ///     features: vec![],
    ///     timestamp: 1_600_000_000,
    ///     node_id: [2; 33],
    ///     rgb_color: [0; 3],
    ///     alias: [0; 32],
    ///     addresses: vec![NetAddress::Ipv4 { addr: [127, 0, 0, 1].into(), port: 9735 }],
    /// };
    ///
    /// let msg = Message::NodeAnnouncement(na);
    /// let bytes = msg.to_bytes().unwrap();
    ///
    /// assert_eq!(&bytes[..2], &257u16.to_be_bytes());
    /// assert_eq!(Message::parse(&bytes).unwrap(), Some(msg));
    /// ```
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();

        out.write_u16::<BigEndian>(self.message_type().tag())?;

        match self {
            Message::ChannelAnnouncement(m) => m.encode(&mut out)?,
            Message::NodeAnnouncement(m) => m.encode(&mut out)?,
            Message::ChannelUpdate(m) => m.encode(&mut out)?,
        }

        Ok(out)
    }
}

impl Encode for ChannelAnnouncement {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for sig in &self.node_signatures {
            w.write_all(sig)?;
        }
        for sig in &self.bitcoin_signatures {
            w.write_all(sig)?;
        }

        write_u16_prefixed(w, &self.features, "features")?;
        write_chain_hash(w, &self.chain_hash)?;
        w.write_u64::<BigEndian>(self.num_short_channel_id)?;

        for key in self.node_ids.iter().chain(&self.bitcoin_keys) {
            w.write_all(key)?;
        }

        Ok(())
    }
}

impl Encode for ChannelUpdate {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.signature)?;
        write_chain_hash(w, &self.chain_hash)?;
        w.write_u64::<BigEndian>(self.num_short_channel_id)?;
        w.write_u32::<BigEndian>(self.timestamp)?;
        w.write_u8(self.message_flags)?;
        w.write_u8(self.channel_flags)?;
        w.write_u16::<BigEndian>(self.cltv_expiry_delta)?;
        w.write_u64::<BigEndian>(self.htlc_minimum_msat)?;
        w.write_u32::<BigEndian>(self.fee_base_msat)?;
        w.write_u32::<BigEndian>(self.fee_proportional_millionths)?;

        if let Some(max) = self.htlc_maximum_msat {
            w.write_u64::<BigEndian>(max)?;
        }

        Ok(())
    }
}

impl Encode for NodeAnnouncement {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.signature)?;
        write_u16_prefixed(w, &self.features, "features")?;
        w.write_u32::<BigEndian>(self.timestamp)?;
        w.write_all(&self.node_id)?;
        w.write_all(&self.rgb_color)?;
        w.write_all(&self.alias)?;

        let mut list: Vec<u8> = Vec::new();
        for addr in &self.addresses {
            addr.encode(&mut list)?;
        }
        write_u16_prefixed(w, &list, "addresses")
    }
}

impl Encode for NetAddress {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(self.typ())?;

        match self {
            NetAddress::Ipv4 { addr, .. } => w.write_all(&addr.octets())?,
            NetAddress::Ipv6 { addr, .. } => w.write_all(&addr.octets())?,
            NetAddress::TorV2 { onion, .. } => w.write_all(onion)?,
            NetAddress::TorV3 { onion, .. } => w.write_all(onion)?,
            NetAddress::Unknown { payload, .. } => w.write_all(payload)?,
        }

        if let Some(port) = self.port() {
            w.write_u16::<BigEndian>(port)?;
        }

        Ok(())
    }
}

fn write_u16_prefixed<W: Write>(w: &mut W, bytes: &[u8], field: &'static str) -> io::Result<()> {
    let len = u16::try_from(bytes.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{field}: {} bytes exceeds u16 length prefix", bytes.len()),
        )
    })?;

    w.write_u16::<BigEndian>(len)?;
    w.write_all(bytes)
}

fn write_chain_hash<W: Write>(w: &mut W, hash: &[u8; 32]) -> io::Result<()> {
    let mut wire = *hash;
    wire.reverse();
    w.write_all(&wire)
}
