use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sensor::SensorKind;

use super::error::{DecodeError, UnknownDialect};
use super::field::parse_field;
use super::layout;
use super::reader::{FrameReader, lookup_key, split_pair};

/// Syntactic convention used to lay out fields within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `<ph>,<temp>,<turb>`: positional, at least three fields.
    #[default]
    Csv,
    /// `PH:<v>,TEMP:<v>,...`: keyed, any subset, any order.
    KeyValue,
}

/// Values decoded from one frame, plus the fields that failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFrame {
    /// Successfully parsed pairs in frame order.
    pub fields: Vec<(SensorKind, f64)>,
    /// Field-local failures; the frame itself was still accepted.
    pub failures: Vec<DecodeError>,
}

/// Outcome of decoding a frame: `Err` only when the frame as a whole is unusable.
pub type DecodeResult = Result<DecodedFrame, DecodeError>;

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Csv => "csv",
            Dialect::KeyValue => "keyvalue",
        }
    }

    /// Decode one frame (terminator already removed).
    pub fn decode(self, raw: &str) -> DecodeResult {
        let reader = FrameReader::new(raw);
        match self {
            Dialect::Csv => decode_csv(&reader),
            Dialect::KeyValue => Ok(decode_key_value(&reader)),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Dialect::Csv),
            "keyvalue" | "key-value" | "kv" => Ok(Dialect::KeyValue),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

/// Decode `raw` with the given dialect.
///
/// # Examples
/// ```
/// use aqualink_core::{Dialect, SensorKind, decode_frame};
///
/// let frame = decode_frame(Dialect::KeyValue, "PH:7.2,GARBAGE,TEMP:24")?;
/// assert_eq!(
///     frame.fields,
///     vec![(SensorKind::Ph, 7.2), (SensorKind::Temperature, 24.0)]
/// );
/// assert_eq!(frame.failures.len(), 1);
/// # Ok::<(), aqualink_core::DecodeError>(())
/// ```
///
/// # Errors
/// Returns `DecodeError::IncompleteFrame` when a CSV frame has fewer than
/// three fields. Field-level failures are reported in `DecodedFrame::failures`.
pub fn decode_frame(dialect: Dialect, raw: &str) -> DecodeResult {
    dialect.decode(raw)
}

fn decode_csv(reader: &FrameReader<'_>) -> DecodeResult {
    let actual = reader.field_count();
    if actual < layout::CSV_MIN_FIELDS {
        return Err(DecodeError::IncompleteFrame {
            needed: layout::CSV_MIN_FIELDS,
            actual,
            raw: reader.raw().to_string(),
        });
    }

    let mut frame = DecodedFrame::default();
    for (kind, token) in layout::CSV_FIELD_ORDER.iter().zip(reader.fields()) {
        match parse_field(token) {
            Ok(value) => frame.fields.push((*kind, value)),
            Err(err) => frame.failures.push(err),
        }
    }
    Ok(frame)
}

fn decode_key_value(reader: &FrameReader<'_>) -> DecodedFrame {
    let mut frame = DecodedFrame::default();
    for piece in reader.fields() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let Some((key, value)) = split_pair(piece) else {
            frame.failures.push(DecodeError::MalformedPair {
                piece: piece.to_string(),
            });
            continue;
        };
        let Some(kind) = lookup_key(key) else {
            frame.failures.push(DecodeError::UnknownKey {
                key: key.to_string(),
            });
            continue;
        };
        match parse_field(value) {
            Ok(value) => frame.fields.push((kind, value)),
            Err(err) => frame.failures.push(err),
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::{DecodedFrame, Dialect, decode_frame};
    use crate::protocol::error::DecodeError;
    use crate::sensor::SensorKind;

    #[test]
    fn csv_maps_fields_positionally() {
        let frame = decode_frame(Dialect::Csv, "7.2, 24.5 ,3.1").unwrap();
        assert_eq!(
            frame,
            DecodedFrame {
                fields: vec![
                    (SensorKind::Ph, 7.2),
                    (SensorKind::Temperature, 24.5),
                    (SensorKind::Turbidity, 3.1),
                ],
                failures: vec![],
            }
        );
    }

    #[test]
    fn csv_ignores_extra_fields() {
        let frame = decode_frame(Dialect::Csv, "7.2,24.5,3.1,999,extra").unwrap();
        assert_eq!(frame.fields.len(), 3);
        assert!(frame.failures.is_empty());
    }

    #[test]
    fn csv_rejects_short_frame() {
        let err = decode_frame(Dialect::Csv, "7.1,31.2\r").unwrap_err();
        assert_eq!(
            err,
            DecodeError::IncompleteFrame {
                needed: 3,
                actual: 2,
                raw: "7.1,31.2".to_string(),
            }
        );
    }

    #[test]
    fn csv_field_failure_keeps_other_fields() {
        let frame = decode_frame(Dialect::Csv, "6.9,abc,4").unwrap();
        assert_eq!(
            frame.fields,
            vec![(SensorKind::Ph, 6.9), (SensorKind::Turbidity, 4.0)]
        );
        assert_eq!(frame.failures.len(), 1);
        assert_eq!(frame.failures[0].id(), "AQ-NOT-A-NUMBER");
    }

    #[test]
    fn key_value_accepts_subset_in_any_case() {
        let frame = decode_frame(Dialect::KeyValue, "tds:180 , Turb:3.4").unwrap();
        assert_eq!(
            frame.fields,
            vec![(SensorKind::Tds, 180.0), (SensorKind::Turbidity, 3.4)]
        );
        assert!(frame.failures.is_empty());
    }

    #[test]
    fn key_value_skips_malformed_and_unknown_pieces() {
        let frame = decode_frame(Dialect::KeyValue, "PH:7.2,GARBAGE,FOO:1,TEMP:x,TEMP:24").unwrap();
        assert_eq!(
            frame.fields,
            vec![(SensorKind::Ph, 7.2), (SensorKind::Temperature, 24.0)]
        );
        let ids: Vec<_> = frame.failures.iter().map(|err| err.id()).collect();
        assert_eq!(ids, vec!["AQ-MALFORMED-PAIR", "AQ-UNKNOWN-KEY", "AQ-NOT-A-NUMBER"]);
    }

    #[test]
    fn key_value_ignores_empty_pieces() {
        let frame = decode_frame(Dialect::KeyValue, "PH:7.0,,").unwrap();
        assert_eq!(frame.fields, vec![(SensorKind::Ph, 7.0)]);
        assert!(frame.failures.is_empty());
    }

    #[test]
    fn dialect_parses_from_str() {
        assert_eq!("CSV".parse::<Dialect>().unwrap(), Dialect::Csv);
        assert_eq!("keyvalue".parse::<Dialect>().unwrap(), Dialect::KeyValue);
        assert_eq!("key-value".parse::<Dialect>().unwrap(), Dialect::KeyValue);
        let err = "json".parse::<Dialect>().unwrap_err();
        assert!(err.to_string().contains("unknown dialect"));
    }
}
