//! Derived outputs for decoded gossip: CSV rows and JSON export.
//!
//! Replaying a dataset produces two kinds of CSV files:
//!
//! - `dictionary.csv`: one row per channel announcement, mapping the
//!   numeric channel id to its two endpoints.
//! - `channels/<channelId>.csv`: one row per channel update of that channel.
//!
//! Files are appended to, so several datasets can be replayed into the
//! same output directory. The header row is written only when a file is
//! created.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::gossip::{
    ChannelAnnouncement, ChannelUpdate, DecodeError, FrameError, Message, NodeAnnouncement,
};

/// A row that can be appended to a CSV file.
pub trait CsvRow {
    fn header() -> &'static [&'static str];
    fn to_record(&self) -> Vec<String>;
}

/// `dictionary.csv` row.
///
/// The endpoint keys are ordered by their hex form so the row does not
/// depend on which node announced first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRow {
    pub channel_id: u64,
    pub node1_pub: String,
    pub node2_pub: String,
}

impl From<&ChannelAnnouncement> for ChannelRow {
    fn from(ca: &ChannelAnnouncement) -> Self {
        let a = hex::encode(ca.node_ids[0]);
        let b = hex::encode(ca.node_ids[1]);
        let (node1_pub, node2_pub) = if a <= b { (a, b) } else { (b, a) };

        ChannelRow {
            channel_id: ca.num_short_channel_id,
            node1_pub,
            node2_pub,
        }
    }
}

impl CsvRow for ChannelRow {
    fn header() -> &'static [&'static str] {
        &["channelId", "node1Pub", "node2Pub"]
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.channel_id.to_string(),
            self.node1_pub.clone(),
            self.node2_pub.clone(),
        ]
    }
}

/// `channels/<channelId>.csv` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRow {
    /// Selects the file; not written as a column.
    pub channel_id: u64,
    pub last_update: u32,
    /// Direction bit + 1, i.e. 1 or 2.
    pub direction: u8,
    pub time_lock_delta: u16,
    pub min_htlc: u64,
    pub fee_rate_milli_msat: u32,
    pub fee_base_msat: u32,
    pub disabled: bool,
    pub max_htlc_msat: Option<u64>,
}

impl From<&ChannelUpdate> for UpdateRow {
    fn from(cu: &ChannelUpdate) -> Self {
        UpdateRow {
            channel_id: cu.num_short_channel_id,
            last_update: cu.timestamp,
            direction: cu.direction() + 1,
            time_lock_delta: cu.cltv_expiry_delta,
            min_htlc: cu.htlc_minimum_msat,
            fee_rate_milli_msat: cu.fee_proportional_millionths,
            fee_base_msat: cu.fee_base_msat,
            disabled: cu.is_disabled(),
            max_htlc_msat: cu.htlc_maximum_msat,
        }
    }
}

impl CsvRow for UpdateRow {
    fn header() -> &'static [&'static str] {
        &[
            "lastUpdate",
            "direction",
            "timeLockDelta",
            "minHtlc",
            "feeRateMilliMsat",
            "feeBaseMsat",
            "disabled",
            "maxHtlcMsat",
        ]
    }

    fn to_record(&self) -> Vec<String> {
        vec![
            self.last_update.to_string(),
            self.direction.to_string(),
            self.time_lock_delta.to_string(),
            self.min_htlc.to_string(),
            self.fee_rate_milli_msat.to_string(),
            self.fee_base_msat.to_string(),
            u8::from(self.disabled).to_string(),
            self.max_htlc_msat.map(|v| v.to_string()).unwrap_or_default(),
        ]
    }
}

/// Appends `rows` to the CSV file at `path`, creating it (and its parent
/// directories) with a header row if it does not exist yet.
pub fn append_rows<T: CsvRow>(path: &Path, rows: &[T]) -> io::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let is_new = !path.exists();
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    if is_new {
        let header: Vec<String> = T::header().iter().map(|h| h.to_string()).collect();
        write_record(&mut file, &header)?;
    }

    for row in rows {
        write_record(&mut file, &row.to_record())?;
    }

    Ok(())
}

fn write_record<W: Write>(w: &mut W, fields: &[String]) -> io::Result<()> {
    let line = fields
        .iter()
        .map(|f| {
            if f.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",");

    // `\r\n` like Python's csv writer, which produced the existing exports.
    write!(w, "{line}\r\n")
}

/// Writes derived rows for decoded records under an output directory.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    out_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.out_dir.join("dictionary.csv")
    }

    pub fn channel_path(&self, channel_id: u64) -> PathBuf {
        self.out_dir.join("channels").join(format!("{channel_id}.csv"))
    }

    /// Appends the row derived from `message`. Node announcements produce no row.
    pub fn record(&self, message: &Message) -> io::Result<()> {
        match message {
            Message::ChannelAnnouncement(ca) => {
                append_rows(&self.dictionary_path(), &[ChannelRow::from(ca)])
            }
            Message::ChannelUpdate(cu) => {
                let row = UpdateRow::from(cu);
                append_rows(&self.channel_path(row.channel_id), &[row])
            }
            Message::NodeAnnouncement(_) => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("dataset error: {0}")]
    Frame(#[from] FrameError),

    #[error("output error: {0}")]
    Sink(#[from] io::Error),
}

/// Counters collected while replaying a dataset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Messages decoded into a record and handed to the sink.
    pub decoded: u64,
    /// Known message types that carry no record.
    pub ignored: u64,
    /// Messages that failed to decode and were skipped.
    pub skipped: u64,
}

/// Decodes every frame and hands each record to `sink`.
///
/// A message that fails to decode is logged and skipped; the replay goes
/// on with the next one. Framing errors and sink errors stop the replay.
pub fn replay<I, F>(frames: I, mut sink: F) -> Result<ReplayStats, ReplayError>
where
    I: IntoIterator<Item = Result<Vec<u8>, FrameError>>,
    F: FnMut(Message) -> io::Result<()>,
{
    let mut stats = ReplayStats::default();

    for (index, frame) in frames.into_iter().enumerate() {
        let frame = frame?;

        match Message::parse(&frame) {
            Ok(Some(message)) => {
                trace!(index, %message, "decoded");
                stats.decoded += 1;
                sink(message)?;
            }
            Ok(None) => {
                stats.ignored += 1;
            }
            Err(DecodeError::UnknownMessageType(tag)) => {
                debug!(index, tag, "skipping message with unknown type");
                stats.skipped += 1;
            }
            Err(e) => {
                warn!(index, len = frame.len(), error = %e, "skipping malformed message");
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

impl Serialize for ChannelAnnouncement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ChannelAnnouncement", 6)?;
        s.serialize_field("_type", "channel_announcement")?;
        s.serialize_field("scid", &self.short_channel_id().to_string())?;
        s.serialize_field("features", &hex::encode(&self.features))?;
        s.serialize_field("node_id_1", &hex::encode(self.node_ids[0]))?;
        s.serialize_field("node_id_2", &hex::encode(self.node_ids[1]))?;
        s.serialize_field("chain_hash", &hex::encode(self.chain_hash))?;
        s.end()
    }
}

impl Serialize for ChannelUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ChannelUpdate", 12)?;
        s.serialize_field("_type", "channel_update")?;
        s.serialize_field("scid", &self.short_channel_id().to_string())?;
        s.serialize_field("timestamp", &self.timestamp)?;
        s.serialize_field("message_flags", &hex::encode([self.message_flags]))?;
        s.serialize_field("channel_flags", &hex::encode([self.channel_flags]))?;
        s.serialize_field("cltv_expiry_delta", &self.cltv_expiry_delta)?;
        s.serialize_field("htlc_minimum_msat", &self.htlc_minimum_msat)?;
        s.serialize_field("fee_base_msat", &self.fee_base_msat)?;
        s.serialize_field(
            "fee_proportional_millionths",
            &self.fee_proportional_millionths,
        )?;
        s.serialize_field("htlc_maximum_msat", &self.htlc_maximum_msat)?;
        s.serialize_field("disabled", &self.is_disabled())?;
        s.serialize_field("chain_hash", &hex::encode(self.chain_hash))?;
        s.end()
    }
}

impl Serialize for NodeAnnouncement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let addresses: Vec<String> = self.addresses.iter().map(|a| a.to_string()).collect();

        let mut s = serializer.serialize_struct("NodeAnnouncement", 7)?;
        s.serialize_field("_type", "node_announcement")?;
        s.serialize_field("features", &hex::encode(&self.features))?;
        s.serialize_field("timestamp", &self.timestamp)?;
        s.serialize_field("node_id", &hex::encode(self.node_id))?;
        s.serialize_field("rgb_color", &hex::encode(self.rgb_color))?;
        s.serialize_field("alias", &self.alias_str())?;
        s.serialize_field("addresses", &addresses)?;
        s.end()
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Message::ChannelAnnouncement(m) => m.serialize(serializer),
            Message::NodeAnnouncement(m) => m.serialize(serializer),
            Message::ChannelUpdate(m) => m.serialize(serializer),
        }
    }
}
