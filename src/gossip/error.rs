use thiserror::Error;

/// Reasons a single gossip message cannot be decoded.
///
/// Every variant is fatal for the message being decoded. A caller walking
/// a stream of messages decides whether to skip the message or stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes remain than the field requires.
    #[error("truncated input reading {field}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// An optional trailing field is neither fully present nor fully absent.
    #[error("malformed optional field {field}: {remaining} trailing bytes")]
    MalformedOptionalField {
        field: &'static str,
        remaining: usize,
    },

    /// No decoder is registered for the message type tag.
    #[error("no decoder registered for message type {0}")]
    UnknownMessageType(u16),
}

impl DecodeError {
    /// Name of the field that failed to decode, if the error is field-specific.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DecodeError::TruncatedInput { field, .. }
            | DecodeError::MalformedOptionalField { field, .. } => Some(field),
            DecodeError::UnknownMessageType(_) => None,
        }
    }
}
