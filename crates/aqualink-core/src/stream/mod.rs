//! Stateful stream decoding.
//!
//! `StreamDecoder` is the entry point transports feed text chunks into. It
//! buffers partial frames across chunk boundaries, decodes each complete frame
//! with the configured dialect and folds the values into an owned
//! `SensorReading`. No I/O happens here; chunks arrive from whichever source
//! wraps the transport.

mod config;
mod decoder;
mod framer;

pub use config::{ConfigError, DecoderConfig, MAX_PRECISION, SpecOverride, parse_terminator};
pub use decoder::{StreamDecoder, StreamState, StreamStats};
