//! Lowercase, unpadded base-32 as used for `.onion` host names.
//!
//! The alphabet is the RFC 4648 one (`a-z`, `2-7`), emitted in lowercase and
//! without `=` padding: `n` input bytes always produce `ceil(8 * n / 5)`
//! characters.

const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Encodes `bytes` as lowercase base-32 without padding.
///
/// ```
/// use lntopo::gossip::base32;
///
/// assert_eq!(base32::encode(b""), "");
/// assert_eq!(base32::encode(b"foobar"), "mzxw6ytboi");
/// ```
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(encoded_len(bytes.len()));

    // At most 4 bits are carried between bytes, so 12 bits is the peak.
    let mut buffer: u16 = 0;
    let mut bits: u32 = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | u16::from(byte);
        bits += 8;

        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[usize::from((buffer >> bits) & 0x1f)] as char);
        }

        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        out.push(ALPHABET[usize::from((buffer << (5 - bits)) & 0x1f)] as char);
    }

    out
}

/// Number of characters [`encode`] produces for `n` input bytes.
pub const fn encoded_len(n: usize) -> usize {
    (n * 8).div_ceil(5)
}
