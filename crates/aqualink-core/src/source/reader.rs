use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use log::trace;

use super::{ChunkSource, SourceError};

/// Default read size, a handful of serial lines.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// `ChunkSource` over any byte reader.
///
/// Each call reads at most `chunk_size` bytes; a short read is returned as
/// is, so live device nodes yield data as soon as it arrives.
pub struct ReaderSource<R> {
    reader: R,
    buf: Vec<u8>,
    bytes_read: u64,
}

impl<R: Read> ReaderSource<R> {
    /// # Errors
    /// Returns `SourceError::InvalidChunkSize` when `chunk_size` is zero.
    pub fn new(reader: R, chunk_size: usize) -> Result<Self, SourceError> {
        if chunk_size == 0 {
            return Err(SourceError::InvalidChunkSize);
        }
        Ok(Self {
            reader,
            buf: vec![0u8; chunk_size],
            bytes_read: 0,
        })
    }
}

impl ReaderSource<File> {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Self::new(file, chunk_size)
    }
}

impl<R: Read> ChunkSource for ReaderSource<R> {
    fn next_chunk(&mut self) -> Result<Option<String>, SourceError> {
        loop {
            match self.reader.read(&mut self.buf) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.bytes_read += n as u64;
                    trace!("read {n} bytes");
                    return Ok(Some(latin1_to_string(&self.buf[..n])));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

/// Map bytes to text with ISO-8859-1.
///
/// # Examples
/// ```
/// use aqualink_core::latin1_to_string;
///
/// assert_eq!(latin1_to_string(b"PH:7.2\n"), "PH:7.2\n");
/// assert_eq!(latin1_to_string(&[0xB0, b'C']), "°C");
/// ```
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::{ReaderSource, latin1_to_string};
    use crate::source::{ChunkSource, SourceError};
    use std::io::Cursor;

    #[test]
    fn yields_bounded_chunks_until_eof() {
        let mut source = ReaderSource::new(Cursor::new(b"7.2,24.5,3.1\n".to_vec()), 5).unwrap();
        let mut chunks = Vec::new();
        while let Some(chunk) = source.next_chunk().unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(chunks, vec!["7.2,2", "4.5,3", ".1\n"]);
        assert_eq!(source.bytes_read(), 13);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = match ReaderSource::new(Cursor::new(Vec::new()), 0) {
            Ok(_) => panic!("expected zero chunk size to be rejected"),
            Err(err) => err,
        };
        assert!(matches!(err, SourceError::InvalidChunkSize));
    }

    #[test]
    fn high_bytes_map_to_single_chars() {
        let text = latin1_to_string(&[b'a', 0xFF, 0x80]);
        assert_eq!(text.chars().count(), 3);
        assert_eq!(text.chars().nth(1), Some('\u{ff}'));
    }
}
