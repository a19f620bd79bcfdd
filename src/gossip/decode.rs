use std::net::{Ipv4Addr, Ipv6Addr};

use crate::gossip::constants::{
    ADDR_IPV4, ADDR_IPV4_LEN, ADDR_IPV6, ADDR_IPV6_LEN, ADDR_TORV2, ADDR_TORV2_LEN, ADDR_TORV3,
    ADDR_TORV3_LEN, CHAIN_HASH_LEN,
};
use crate::gossip::error::DecodeError;
use crate::gossip::message::{
    ChannelAnnouncement, ChannelUpdate, Decode, NetAddress, NodeAnnouncement,
};

impl Decode for ChannelAnnouncement {
    fn decode_from(payload: &[u8], c: &mut usize) -> Result<Self, DecodeError> {
        let node_signatures = [
            array(payload, c, "channel_announcement: node_signature_1")?,
            array(payload, c, "channel_announcement: node_signature_2")?,
        ];
        let bitcoin_signatures = [
            array(payload, c, "channel_announcement: bitcoin_signature_1")?,
            array(payload, c, "channel_announcement: bitcoin_signature_2")?,
        ];

        let flen = read_u16(payload, c, "channel_announcement: features length")? as usize;
        let features = bytes(payload, c, flen, "channel_announcement: features")?.to_vec();

        let chain_hash = read_chain_hash(payload, c, "channel_announcement: chain_hash")?;
        let num_short_channel_id =
            read_u64(payload, c, "channel_announcement: short_channel_id")?;

        let node_ids = [
            array(payload, c, "channel_announcement: node_id_1")?,
            array(payload, c, "channel_announcement: node_id_2")?,
        ];
        let bitcoin_keys = [
            array(payload, c, "channel_announcement: bitcoin_key_1")?,
            array(payload, c, "channel_announcement: bitcoin_key_2")?,
        ];

        Ok(ChannelAnnouncement {
            node_signatures,
            bitcoin_signatures,
            features,
            chain_hash,
            num_short_channel_id,
            node_ids,
            bitcoin_keys,
        })
    }
}

impl Decode for ChannelUpdate {
    fn decode_from(payload: &[u8], c: &mut usize) -> Result<Self, DecodeError> {
        let signature = array(payload, c, "channel_update: signature")?;
        let chain_hash = read_chain_hash(payload, c, "channel_update: chain_hash")?;
        let num_short_channel_id = read_u64(payload, c, "channel_update: short_channel_id")?;
        let timestamp = read_u32(payload, c, "channel_update: timestamp")?;
        let message_flags = read_u8(payload, c, "channel_update: message_flags")?;
        let channel_flags = read_u8(payload, c, "channel_update: channel_flags")?;
        let cltv_expiry_delta = read_u16(payload, c, "channel_update: cltv_expiry_delta")?;
        let htlc_minimum_msat = read_u64(payload, c, "channel_update: htlc_minimum_msat")?;
        let fee_base_msat = read_u32(payload, c, "channel_update: fee_base_msat")?;
        let fee_proportional_millionths =
            read_u32(payload, c, "channel_update: fee_proportional_millionths")?;

        // Older updates end here. Anything between "nothing" and a full
        // u64 is a cut-off message, not the legacy layout.
        let htlc_maximum_msat = match payload.len() - *c {
            0 => None,
            8 => Some(read_u64(payload, c, "channel_update: htlc_maximum_msat")?),
            remaining => {
                return Err(DecodeError::MalformedOptionalField {
                    field: "channel_update: htlc_maximum_msat",
                    remaining,
                });
            }
        };

        Ok(ChannelUpdate {
            signature,
            chain_hash,
            num_short_channel_id,
            timestamp,
            message_flags,
            channel_flags,
            cltv_expiry_delta,
            htlc_minimum_msat,
            fee_base_msat,
            fee_proportional_millionths,
            htlc_maximum_msat,
        })
    }
}

impl Decode for NodeAnnouncement {
    fn decode_from(payload: &[u8], c: &mut usize) -> Result<Self, DecodeError> {
        let signature = array(payload, c, "node_announcement: signature")?;

        let flen = read_u16(payload, c, "node_announcement: features length")? as usize;
        let features = bytes(payload, c, flen, "node_announcement: features")?.to_vec();

        let timestamp = read_u32(payload, c, "node_announcement: timestamp")?;
        let node_id = array(payload, c, "node_announcement: node_id")?;
        let rgb_color = array(payload, c, "node_announcement: rgb_color")?;
        let alias = array(payload, c, "node_announcement: alias")?;

        let alen = read_u16(payload, c, "node_announcement: addresses length")? as usize;
        let list = bytes(payload, c, alen, "node_announcement: addresses")?;

        let mut addresses = Vec::new();
        let mut ac = 0;
        while let Some(addr) = decode_address(list, &mut ac)? {
            addresses.push(addr);
        }

        Ok(NodeAnnouncement {
            signature,
            features,
            timestamp,
            node_id,
            rgb_color,
            alias,
            addresses,
        })
    }
}

/// Decodes the next address descriptor from an address list.
///
/// Returns `Ok(None)` once the list is exhausted. An unrecognised type
/// takes every remaining byte of the list as its payload, which also ends
/// the list: the format gives no length for unknown types, so nothing
/// after one can be located.
pub fn decode_address(list: &[u8], c: &mut usize) -> Result<Option<NetAddress>, DecodeError> {
    let Some(&typ) = list.get(*c) else {
        return Ok(None);
    };
    *c += 1;

    let addr = match typ {
        ADDR_IPV4 => {
            let ip: [u8; ADDR_IPV4_LEN] = array(list, c, "address: ipv4")?;
            NetAddress::Ipv4 {
                addr: Ipv4Addr::from(ip),
                port: read_u16(list, c, "address: port")?,
            }
        }
        ADDR_IPV6 => {
            let ip: [u8; ADDR_IPV6_LEN] = array(list, c, "address: ipv6")?;
            NetAddress::Ipv6 {
                addr: Ipv6Addr::from(ip),
                port: read_u16(list, c, "address: port")?,
            }
        }
        ADDR_TORV2 => {
            let onion: [u8; ADDR_TORV2_LEN] = array(list, c, "address: torv2")?;
            NetAddress::TorV2 {
                onion,
                port: read_u16(list, c, "address: port")?,
            }
        }
        ADDR_TORV3 => {
            let onion: [u8; ADDR_TORV3_LEN] = array(list, c, "address: torv3")?;
            NetAddress::TorV3 {
                onion,
                port: read_u16(list, c, "address: port")?,
            }
        }
        typ => {
            let payload = list[*c..].to_vec();
            *c = list.len();
            NetAddress::Unknown { typ, payload }
        }
    };

    Ok(Some(addr))
}

fn eof(field: &'static str, needed: usize, p: &[u8], c: usize) -> DecodeError {
    DecodeError::TruncatedInput {
        field,
        needed,
        remaining: p.len().saturating_sub(c),
    }
}

/// Reads exactly `len` bytes.
pub(crate) fn bytes<'a>(
    p: &'a [u8],
    c: &mut usize,
    len: usize,
    field: &'static str,
) -> Result<&'a [u8], DecodeError> {
    let b = p
        .get(*c..c.saturating_add(len))
        .ok_or_else(|| eof(field, len, p, *c))?;
    *c += len;
    Ok(b)
}

/// Reads a fixed-size field.
pub(crate) fn array<const N: usize>(
    p: &[u8],
    c: &mut usize,
    field: &'static str,
) -> Result<[u8; N], DecodeError> {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes(p, c, N, field)?);
    Ok(out)
}

fn read_chain_hash(
    p: &[u8],
    c: &mut usize,
    field: &'static str,
) -> Result<[u8; CHAIN_HASH_LEN], DecodeError> {
    let mut hash: [u8; CHAIN_HASH_LEN] = array(p, c, field)?;
    hash.reverse();
    Ok(hash)
}

fn read_u8(p: &[u8], c: &mut usize, field: &'static str) -> Result<u8, DecodeError> {
    Ok(u8::from_be_bytes(array(p, c, field)?))
}
fn read_u16(p: &[u8], c: &mut usize, field: &'static str) -> Result<u16, DecodeError> {
    Ok(u16::from_be_bytes(array(p, c, field)?))
}
fn read_u32(p: &[u8], c: &mut usize, field: &'static str) -> Result<u32, DecodeError> {
    Ok(u32::from_be_bytes(array(p, c, field)?))
}
fn read_u64(p: &[u8], c: &mut usize, field: &'static str) -> Result<u64, DecodeError> {
    Ok(u64::from_be_bytes(array(p, c, field)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gossip::message::*;

    /// Chain hash bytes 01 02 .. 20 as they appear on the wire.
    fn wire_chain_hash() -> [u8; 32] {
        std::array::from_fn(|i| i as u8 + 1)
    }

    fn scid(block: u64, tx: u64, out: u64) -> u64 {
        (block << 40) | (tx << 16) | out
    }

    /// channel_announcement payload (no type tag) with a 2-byte feature bitmap.
    fn channel_announcement_payload() -> Vec<u8> {
        let mut p = vec![];
        p.extend_from_slice(&[0x11; 64]); // node_signature_1
        p.extend_from_slice(&[0x12; 64]); // node_signature_2
        p.extend_from_slice(&[0x21; 64]); // bitcoin_signature_1
        p.extend_from_slice(&[0x22; 64]); // bitcoin_signature_2
        p.extend_from_slice(&2u16.to_be_bytes()); // len
        p.extend_from_slice(&[0x01, 0x00]); // features
        p.extend_from_slice(&wire_chain_hash());
        p.extend_from_slice(&scid(556_500, 1_337, 1).to_be_bytes());
        p.extend_from_slice(&[0x02; 33]); // node_id_1
        p.extend_from_slice(&[0x03; 33]); // node_id_2
        p.extend_from_slice(&[0x04; 33]); // bitcoin_key_1
        p.extend_from_slice(&[0x05; 33]); // bitcoin_key_2
        p
    }

    /// channel_update payload (no type tag) up to and including
    /// fee_proportional_millionths.
    fn channel_update_payload() -> Vec<u8> {
        let mut p = vec![];
        p.extend_from_slice(&[0xAA; 64]); // signature
        p.extend_from_slice(&wire_chain_hash());
        p.extend_from_slice(&scid(600_000, 42, 0).to_be_bytes());
        p.extend_from_slice(&1_554_000_000u32.to_be_bytes()); // timestamp
        p.push(0x01); // message_flags
        p.push(0x03); // channel_flags: direction 1, disabled
        p.extend_from_slice(&144u16.to_be_bytes()); // cltv_expiry_delta
        p.extend_from_slice(&1_000u64.to_be_bytes()); // htlc_minimum_msat
        p.extend_from_slice(&1_000u32.to_be_bytes()); // fee_base_msat
        p.extend_from_slice(&100u32.to_be_bytes()); // fee_proportional_millionths
        p
    }

    /// node_announcement payload (no type tag) around the given address list.
    fn node_announcement_payload(addresses: &[u8]) -> Vec<u8> {
        let mut p = vec![];
        p.extend_from_slice(&[0xBB; 64]); // signature
        p.extend_from_slice(&1u16.to_be_bytes()); // flen
        p.push(0x22); // features
        p.extend_from_slice(&1_560_000_000u32.to_be_bytes()); // timestamp
        p.extend_from_slice(&[0x02; 33]); // node_id
        p.extend_from_slice(&[0x68, 0xf4, 0x42]); // rgb_color
        let mut alias = [0u8; 32];
        alias[..5].copy_from_slice(b"alice");
        p.extend_from_slice(&alias);
        p.extend_from_slice(&(addresses.len() as u16).to_be_bytes());
        p.extend_from_slice(addresses);
        p
    }

    fn ipv4_descriptor(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut b = vec![ADDR_IPV4];
        b.extend_from_slice(&ip);
        b.extend_from_slice(&port.to_be_bytes());
        b
    }

    #[test]
    fn decode_channel_announcement_all_fields() {
        let payload = channel_announcement_payload();
        let mut c = 0;
        let ca = ChannelAnnouncement::decode_from(&payload, &mut c).unwrap();

        assert_eq!(c, payload.len());
        assert_eq!(ca.node_signatures, [[0x11; 64], [0x12; 64]]);
        assert_eq!(ca.bitcoin_signatures, [[0x21; 64], [0x22; 64]]);
        assert_eq!(ca.features, vec![0x01, 0x00]);
        assert_eq!(ca.node_ids, [[0x02; 33], [0x03; 33]]);
        assert_eq!(ca.bitcoin_keys, [[0x04; 33], [0x05; 33]]);
        assert_eq!(ca.short_channel_id().to_string(), "556500x1337x1");
    }

    #[test]
    fn decode_channel_announcement_reverses_chain_hash() {
        let ca = ChannelAnnouncement::decode(&channel_announcement_payload()).unwrap();

        let expected: [u8; 32] = std::array::from_fn(|i| 0x20 - i as u8);
        assert_eq!(ca.chain_hash, expected);
        assert_eq!(ca.chain_hash[0], 0x20);
        assert_eq!(ca.chain_hash[31], 0x01);
    }

    #[test]
    fn decode_channel_announcement_empty_features() {
        let mut payload = vec![];
        payload.extend_from_slice(&[0u8; 256]); // signatures
        payload.extend_from_slice(&0u16.to_be_bytes());
        payload.extend_from_slice(&[0u8; 32]);
        payload.extend_from_slice(&scid(1, 2, 3).to_be_bytes());
        payload.extend_from_slice(&[0u8; 33 * 4]);

        let ca = ChannelAnnouncement::decode(&payload).unwrap();
        assert!(ca.features.is_empty());
        assert_eq!(ca.short_channel_id().to_string(), "1x2x3");
    }

    #[test]
    fn decode_channel_announcement_truncated_names_field() {
        let mut payload = channel_announcement_payload();
        payload.truncate(payload.len() - 10); // cut into bitcoin_key_2

        let err = ChannelAnnouncement::decode(&payload).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedInput {
                field: "channel_announcement: bitcoin_key_2",
                needed: 33,
                remaining: 23,
            }
        );
    }

    #[test]
    fn decode_channel_announcement_feature_length_past_end() {
        let mut payload = vec![0u8; 256];
        payload.extend_from_slice(&1000u16.to_be_bytes());
        payload.extend_from_slice(&[0u8; 10]);

        let err = ChannelAnnouncement::decode(&payload).unwrap_err();
        assert_eq!(err.field(), Some("channel_announcement: features"));
    }

    #[test]
    fn decode_channel_update_without_htlc_maximum() {
        let cu = ChannelUpdate::decode(&channel_update_payload()).unwrap();

        assert_eq!(cu.signature, [0xAA; 64]);
        assert_eq!(cu.short_channel_id().to_string(), "600000x42x0");
        assert_eq!(cu.timestamp, 1_554_000_000);
        assert_eq!(cu.message_flags, 0x01);
        assert_eq!(cu.channel_flags, 0x03);
        assert_eq!(cu.direction(), 1);
        assert!(cu.is_disabled());
        assert_eq!(cu.cltv_expiry_delta, 144);
        assert_eq!(cu.htlc_minimum_msat, 1_000);
        assert_eq!(cu.fee_base_msat, 1_000);
        assert_eq!(cu.fee_proportional_millionths, 100);
        assert_eq!(cu.htlc_maximum_msat, None);
        assert_eq!(cu.chain_hash[0], 0x20);
    }

    #[test]
    fn decode_channel_update_with_htlc_maximum() {
        let mut payload = channel_update_payload();
        payload.extend_from_slice(&4_294_967_295u64.to_be_bytes());

        let mut c = 0;
        let cu = ChannelUpdate::decode_from(&payload, &mut c).unwrap();
        assert_eq!(cu.htlc_maximum_msat, Some(4_294_967_295));
        assert_eq!(c, payload.len());
    }

    #[test]
    fn decode_channel_update_partial_htlc_maximum_is_malformed() {
        for extra in 1..8 {
            let mut payload = channel_update_payload();
            payload.extend(std::iter::repeat_n(0xFF, extra));

            assert_eq!(
                ChannelUpdate::decode(&payload),
                Err(DecodeError::MalformedOptionalField {
                    field: "channel_update: htlc_maximum_msat",
                    remaining: extra,
                }),
                "{extra} trailing bytes"
            );
        }
    }

    #[test]
    fn decode_channel_update_truncated_before_optional_field() {
        let mut payload = channel_update_payload();
        payload.truncate(payload.len() - 2); // cut into fee_proportional_millionths

        let err = ChannelUpdate::decode(&payload).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TruncatedInput {
                field: "channel_update: fee_proportional_millionths",
                ..
            }
        ));
    }

    #[test]
    fn decode_node_announcement_single_ipv4() {
        let addrs = ipv4_descriptor([203, 0, 113, 7], 9735);
        assert_eq!(addrs.len(), 7);

        let na = NodeAnnouncement::decode(&node_announcement_payload(&addrs)).unwrap();

        assert_eq!(na.features, vec![0x22]);
        assert_eq!(na.timestamp, 1_560_000_000);
        assert_eq!(na.node_id, [0x02; 33]);
        assert_eq!(na.rgb_color, [0x68, 0xf4, 0x42]);
        assert_eq!(na.alias_str(), "alice");
        assert_eq!(
            na.addresses,
            vec![NetAddress::Ipv4 {
                addr: Ipv4Addr::new(203, 0, 113, 7),
                port: 9735,
            }]
        );
    }

    #[test]
    fn decode_node_announcement_no_addresses() {
        let na = NodeAnnouncement::decode(&node_announcement_payload(&[])).unwrap();
        assert!(na.addresses.is_empty());
    }

    #[test]
    fn decode_node_announcement_keeps_address_order() {
        let mut addrs = vec![];

        let v6: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        addrs.push(ADDR_IPV6);
        addrs.extend_from_slice(&v6);
        addrs.extend_from_slice(&9736u16.to_be_bytes());

        addrs.extend(ipv4_descriptor([10, 0, 0, 1], 9735));

        addrs.push(ADDR_TORV3);
        addrs.extend_from_slice(&[0u8; 35]);
        addrs.extend_from_slice(&9737u16.to_be_bytes());

        let na = NodeAnnouncement::decode(&node_announcement_payload(&addrs)).unwrap();

        assert_eq!(na.addresses.len(), 3);
        assert_eq!(na.addresses[0].to_string(), "ipv6://[2001:db8::1]:9736");
        assert_eq!(na.addresses[1].to_string(), "ipv4://10.0.0.1:9735");
        assert_eq!(na.addresses[2].typ(), ADDR_TORV3);
        assert_eq!(na.addresses[2].port(), Some(9737));
        assert!(na.addresses[2].host().ends_with(".onion"));
    }

    #[test]
    fn decode_node_announcement_address_list_truncated() {
        let mut payload = node_announcement_payload(&ipv4_descriptor([1, 2, 3, 4], 9735));
        payload.pop();

        let err = NodeAnnouncement::decode(&payload).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedInput {
                field: "node_announcement: addresses",
                needed: 7,
                remaining: 6,
            }
        );
    }

    #[test]
    fn decode_node_announcement_descriptor_cut_inside_list() {
        // list length covers the descriptor type and half an IPv4 address
        let payload = node_announcement_payload(&[ADDR_IPV4, 1, 2]);

        let err = NodeAnnouncement::decode(&payload).unwrap_err();
        assert_eq!(err.field(), Some("address: ipv4"));
    }

    #[test]
    fn decode_address_empty_list_ends() {
        assert_eq!(decode_address(&[], &mut 0), Ok(None));
    }

    #[test]
    fn decode_address_torv2() {
        let mut list = vec![ADDR_TORV2];
        list.extend_from_slice(&[0xFF; 10]);
        list.extend_from_slice(&9735u16.to_be_bytes());

        let mut c = 0;
        let addr = decode_address(&list, &mut c).unwrap().unwrap();
        assert_eq!(c, 13);
        assert_eq!(addr.host(), "7777777777777777.onion");
        assert_eq!(addr.port(), Some(9735));
        assert_eq!(decode_address(&list, &mut c), Ok(None));
    }

    #[test]
    fn decode_address_missing_port() {
        let list = [ADDR_IPV4, 1, 2, 3, 4, 0x26];
        let err = decode_address(&list, &mut 0).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedInput {
                field: "address: port",
                needed: 2,
                remaining: 1,
            }
        );
    }

    #[test]
    fn decode_address_unknown_type_consumes_rest_of_list() {
        let mut list = ipv4_descriptor([1, 2, 3, 4], 9735);
        list.extend_from_slice(&[0x05, 0xDE, 0xAD, 0xBE, 0xEF]);
        list.extend(ipv4_descriptor([5, 6, 7, 8], 9735));

        let na = NodeAnnouncement::decode(&node_announcement_payload(&list)).unwrap();

        assert_eq!(na.addresses.len(), 2);
        let NetAddress::Unknown { typ, payload } = &na.addresses[1] else {
            panic!("expected NetAddress::Unknown");
        };
        assert_eq!(*typ, 0x05);
        assert_eq!(payload.len(), 4 + 7);
        assert_eq!(&payload[..4], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(na.addresses[1].port(), None);
    }
}
