//! Transport-side chunk sources.
//!
//! Sources own all I/O: they pull bytes from a file, a serial device node or
//! stdin and hand text chunks to the decoder. `SimulatedSource` stands in for
//! a probe when none is attached. Bytes are mapped to text with
//! ISO-8859-1, so every byte value survives unchanged as one `char`.

mod reader;
mod simulated;

pub use reader::{DEFAULT_CHUNK_SIZE, ReaderSource, latin1_to_string};
pub use simulated::{SIMULATION_START, SIMULATION_STEP, SimulatedSource};

use thiserror::Error;

/// Pull-based supplier of text chunks.
pub trait ChunkSource {
    /// Next chunk, or `None` once the transport is exhausted.
    fn next_chunk(&mut self) -> Result<Option<String>, SourceError>;

    /// Total bytes consumed so far.
    fn bytes_read(&self) -> u64;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}
