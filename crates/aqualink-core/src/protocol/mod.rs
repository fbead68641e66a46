//! Telemetry frame decoding.
//!
//! The protocol follows the same layered structure as every decoder in the
//! crate:
//! - `layout`: separators, key table and positional field order (source of truth)
//! - `reader`: tokenising conventions (splitting, trimming, key lookup)
//! - `field`: numeric token grammar
//! - `parser`: per-dialect frame decoding (no direct string slicing)
//! - `error`: explicit, local failures
//!
//! Everything here is pure and contains no I/O.

pub mod error;
pub mod field;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::{DecodeError, UnknownDialect};
pub use field::parse_field;
pub use parser::{DecodeResult, DecodedFrame, Dialect, decode_frame};
