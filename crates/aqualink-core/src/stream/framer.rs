use crate::protocol::DecodeError;

/// Frames cut from the buffer by one `push`, in input order.
///
/// A frame longer than the limit is replaced by its `FrameTooLong` failure.
#[derive(Debug, Default)]
pub(crate) struct Extracted {
    pub frames: Vec<Result<String, DecodeError>>,
}

/// Accumulates chunk text and cuts it into terminator-delimited frames.
///
/// Frame length is judged on the text between terminators, so the outcome
/// does not depend on how the input was chunked. Once an unterminated
/// remainder is known to be overlong it is dropped, and everything up to and
/// including the next terminator is discarded with it.
#[derive(Debug)]
pub(crate) struct FrameBuffer {
    buf: String,
    terminator: Option<String>,
    max_len: usize,
    discarding: bool,
}

impl FrameBuffer {
    pub(crate) fn new(terminator: Option<String>, max_len: usize) -> Self {
        Self {
            buf: String::new(),
            terminator,
            max_len,
            discarding: false,
        }
    }

    /// Append `chunk` and return every complete frame, terminator removed.
    ///
    /// Without a terminator the chunk itself is the frame.
    pub(crate) fn push(&mut self, chunk: &str) -> Extracted {
        let Some(terminator) = self.terminator.clone() else {
            return Extracted {
                frames: vec![self.bounded(chunk.to_string())],
            };
        };

        self.buf.push_str(chunk);
        let mut extracted = Extracted::default();
        let mut start = 0;
        while let Some(pos) = self.buf[start..].find(terminator.as_str()) {
            let end = start + pos;
            if self.discarding {
                self.discarding = false;
            } else {
                let frame = self.buf[start..end].to_string();
                extracted.frames.push(self.bounded(frame));
            }
            start = end + terminator.len();
        }
        self.buf.drain(..start);

        if self.discarding {
            self.keep_terminator_prefix(terminator.len());
        } else if self.buf.len() >= self.max_len + terminator.len() {
            // No terminator fits in the remainder, so its frame is overlong.
            extracted.frames.push(Err(self.too_long()));
            self.discarding = true;
            self.keep_terminator_prefix(terminator.len());
        }
        extracted
    }

    /// Take the unterminated remainder as a final frame.
    ///
    /// Returns `None` when nothing is buffered or the remainder belongs to a
    /// frame that was already reported as overlong.
    pub(crate) fn finish(&mut self) -> Option<Result<String, DecodeError>> {
        let discarding = std::mem::take(&mut self.discarding);
        let remainder = std::mem::take(&mut self.buf);
        if discarding || remainder.is_empty() {
            return None;
        }
        Some(self.bounded(remainder))
    }

    /// Unterminated text of the frame in progress.
    pub(crate) fn pending(&self) -> &str {
        if self.discarding { "" } else { &self.buf }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty() && !self.discarding
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }

    fn bounded(&self, frame: String) -> Result<String, DecodeError> {
        if frame.len() > self.max_len {
            Err(self.too_long())
        } else {
            Ok(frame)
        }
    }

    fn too_long(&self) -> DecodeError {
        DecodeError::FrameTooLong {
            limit: self.max_len,
        }
    }

    /// Keep only the tail that could still start a split terminator.
    fn keep_terminator_prefix(&mut self, terminator_len: usize) {
        let mut cut = self.buf.len().saturating_sub(terminator_len - 1);
        while !self.buf.is_char_boundary(cut) {
            cut += 1;
        }
        self.buf.drain(..cut);
    }
}
