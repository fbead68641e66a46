use thiserror::Error;

use crate::sensor::SensorKind;

/// Failures raised while decoding telemetry.
///
/// Every variant is local: it discards one field, one pair, one frame or one
/// overlong line, and decoding carries on with the next input.
///
/// # Examples
/// ```
/// use aqualink_core::DecodeError;
///
/// let err = DecodeError::UnknownKey { key: "DO".to_string() };
/// assert_eq!(err.id(), "AQ-UNKNOWN-KEY");
/// assert!(err.to_string().contains("unknown key"));
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("not a number: '{token}'")]
    NotANumber { token: String },
    #[error("incomplete frame: need {needed} fields, got {actual} in '{raw}'")]
    IncompleteFrame {
        needed: usize,
        actual: usize,
        raw: String,
    },
    #[error("malformed pair: '{piece}'")]
    MalformedPair { piece: String },
    #[error("unknown key: '{key}'")]
    UnknownKey { key: String },
    #[error("{kind} value {value} outside {min}..={max}")]
    OutOfRange {
        kind: SensorKind,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("frame exceeds {limit} bytes")]
    FrameTooLong { limit: usize },
}

impl DecodeError {
    /// Stable identifier used when aggregating failures in reports.
    pub fn id(&self) -> &'static str {
        match self {
            DecodeError::NotANumber { .. } => "AQ-NOT-A-NUMBER",
            DecodeError::IncompleteFrame { .. } => "AQ-INCOMPLETE-FRAME",
            DecodeError::MalformedPair { .. } => "AQ-MALFORMED-PAIR",
            DecodeError::UnknownKey { .. } => "AQ-UNKNOWN-KEY",
            DecodeError::OutOfRange { .. } => "AQ-OUT-OF-RANGE",
            DecodeError::FrameTooLong { .. } => "AQ-FRAME-TOO-LONG",
        }
    }

    /// Short description shared by every failure with the same id.
    pub fn summary(&self) -> &'static str {
        match self {
            DecodeError::NotANumber { .. } => "Field value is not a decimal number",
            DecodeError::IncompleteFrame { .. } => "Frame has fewer fields than the dialect requires",
            DecodeError::MalformedPair { .. } => "Piece is missing the key/value separator",
            DecodeError::UnknownKey { .. } => "Key does not name a known sensor",
            DecodeError::OutOfRange { .. } => "Value is outside the sensor bounds",
            DecodeError::FrameTooLong { .. } => "Frame exceeded the length limit and was discarded",
        }
    }

    /// Whether the whole frame (rather than a single field) was dropped.
    pub fn is_frame_level(&self) -> bool {
        matches!(
            self,
            DecodeError::IncompleteFrame { .. } | DecodeError::FrameTooLong { .. }
        )
    }
}

/// Raised when a dialect name cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown dialect '{0}' (expected csv or keyvalue)")]
pub struct UnknownDialect(pub String);
