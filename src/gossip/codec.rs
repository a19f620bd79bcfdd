//! Gossip dataset framing.
//!
//! A dataset is a plain byte stream:
//!
//! ```text
//! +-----------+--------------------+----------------+-----
//! | "GSP" 01  | length (CompactSize)| message bytes  | ...
//! +-----------+--------------------+----------------+-----
//! ```
//!
//! The length uses the CompactSize scheme with big-endian multi-byte
//! forms: a first byte below `0xFD` is the length itself, `0xFD`, `0xFE`
//! and `0xFF` are followed by a `u16`, `u32` and `u64` respectively.
//!
//! Published datasets are bz2 compressed; decompress them before reading
//! (`bzcat gossip.gsp.bz2 | lntopo reforme -`).

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

use crate::gossip::constants::{DATASET_MAGIC, DATASET_VERSION};

/// Errors raised while splitting a dataset into messages.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not a gossip dataset: header {}", hex::encode(.0))]
    BadHeader([u8; 4]),

    #[error("truncated frame: expected {expected} bytes, got {got}")]
    TruncatedFrame { expected: u64, got: u64 },
}

/// Reads and checks the 4-byte dataset header.
pub fn read_header<R: Read>(reader: &mut R) -> Result<(), FrameError> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;

    if header[..3] != DATASET_MAGIC || header[3] != DATASET_VERSION {
        return Err(FrameError::BadHeader(header));
    }

    Ok(())
}

/// Writes the 4-byte dataset header.
pub fn write_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(&DATASET_MAGIC)?;
    writer.write_u8(DATASET_VERSION)
}

/// Reads the next message frame.
///
/// Returns `Ok(None)` on a clean end of stream, i.e. when the stream ends
/// exactly at a frame boundary.
///
/// ```
/// use std::io::Cursor;
/// use lntopo::gossip::codec;
///
/// let mut bytes: Vec<u8> = vec![];
/// codec::write_frame(&mut bytes, &[0x01, 0x02]).unwrap();
///
/// let mut cursor = Cursor::new(bytes);
/// assert_eq!(codec::read_frame(&mut cursor).unwrap(), Some(vec![0x01, 0x02]));
/// assert_eq!(codec::read_frame(&mut cursor).unwrap(), None);
/// ```
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut first = [0u8; 1];
    if reader.read(&mut first)? == 0 {
        return Ok(None);
    }

    let length = match first[0] {
        0xFD => read_length(reader, 2, |r| r.read_u16::<BigEndian>().map(u64::from))?,
        0xFE => read_length(reader, 4, |r| r.read_u32::<BigEndian>().map(u64::from))?,
        0xFF => read_length(reader, 8, |r| r.read_u64::<BigEndian>())?,
        n => u64::from(n),
    };

    // Read through `take` instead of pre-allocating: a corrupt length
    // must not turn into a huge allocation.
    let mut payload = Vec::new();
    let got = reader.by_ref().take(length).read_to_end(&mut payload)? as u64;
    if got != length {
        return Err(FrameError::TruncatedFrame {
            expected: length,
            got,
        });
    }

    Ok(Some(payload))
}

/// Writes one message frame (length prefix + bytes).
pub fn write_frame<W: Write>(writer: &mut W, message: &[u8]) -> io::Result<()> {
    let len = message.len() as u64;

    match len {
        0..=0xFC => writer.write_u8(len as u8)?,
        0xFD..=0xFFFF => {
            writer.write_u8(0xFD)?;
            writer.write_u16::<BigEndian>(len as u16)?;
        }
        0x1_0000..=0xFFFF_FFFF => {
            writer.write_u8(0xFE)?;
            writer.write_u32::<BigEndian>(len as u32)?;
        }
        _ => {
            writer.write_u8(0xFF)?;
            writer.write_u64::<BigEndian>(len)?;
        }
    }

    writer.write_all(message)
}

fn read_length<R: Read>(
    reader: &mut R,
    width: u64,
    read: impl FnOnce(&mut R) -> io::Result<u64>,
) -> Result<u64, FrameError> {
    read(reader).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FrameError::TruncatedFrame {
            expected: width,
            got: 0,
        },
        _ => FrameError::Io(e),
    })
}

/// Iterator over the message frames of a dataset.
///
/// The header is checked by [`Frames::new`]. Iteration stops after the
/// first error.
pub struct Frames<R> {
    reader: R,
    done: bool,
}

impl<R: Read> Frames<R> {
    pub fn new(mut reader: R) -> Result<Self, FrameError> {
        read_header(&mut reader)?;
        Ok(Self {
            reader,
            done: false,
        })
    }
}

impl<R: Read> Iterator for Frames<R> {
    type Item = Result<Vec<u8>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match read_frame(&mut self.reader) {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
