//! Terminator-based frame extraction for the receive stream
//!
//! TCP delivers the device's output in arbitrary chunks. [`LineFramer`] keeps
//! the bytes that have not yet been terminated and hands out complete frames
//! in arrival order.

use bytes::{Buf, BytesMut};

/// Default cap on bytes buffered without seeing a terminator
pub const DEFAULT_MAX_BUFFER: usize = 4096;

const FALLBACK_TERMINATOR: &[u8] = b"$";

/// Accumulates received bytes and splits them into terminator-delimited frames.
///
/// Frames are yielded FIFO. Empty frames (two terminators in a row) are
/// skipped. Frame bytes outside the ASCII range are dropped while decoding.
/// If more than `max_buffer` bytes pile up without a terminator, the buffer is
/// discarded along with the rest of that frame, up to and including its
/// terminator.
#[derive(Debug, Clone)]
pub struct LineFramer {
    terminator: Vec<u8>,
    buffer: BytesMut,
    max_buffer: usize,
    /// Inside an oversized frame whose head was discarded
    skipping: bool,
}

impl LineFramer {
    /// Create a framer splitting on `terminator`.
    ///
    /// An empty terminator cannot delimit anything and is replaced by `$`.
    pub fn new(terminator: impl AsRef<[u8]>) -> Self {
        Self::with_max_buffer(terminator, DEFAULT_MAX_BUFFER)
    }

    /// Create a framer with a custom overflow limit
    pub fn with_max_buffer(terminator: impl AsRef<[u8]>, max_buffer: usize) -> Self {
        let terminator = terminator.as_ref();
        let terminator = if terminator.is_empty() {
            FALLBACK_TERMINATOR.to_vec()
        } else {
            terminator.to_vec()
        };

        Self {
            terminator,
            buffer: BytesMut::with_capacity(max_buffer.min(DEFAULT_MAX_BUFFER)),
            max_buffer,
            skipping: false,
        }
    }

    /// The terminator this framer splits on
    pub fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    /// Append a received chunk
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<String> {
        loop {
            let Some(position) = find(&self.buffer, &self.terminator) else {
                self.discard_on_overflow();
                return None;
            };

            let frame = self.buffer.split_to(position);
            self.buffer.advance(self.terminator.len());

            if self.skipping {
                self.skipping = false;
                tracing::debug!("Dropped {} trailing bytes of an oversized frame", frame.len());
                continue;
            }
            if frame.is_empty() {
                continue;
            }

            return Some(decode_ascii(&frame));
        }
    }

    /// Iterate over every complete frame currently buffered
    pub fn drain(&mut self) -> impl Iterator<Item = String> + '_ {
        std::iter::from_fn(move || self.next_frame())
    }

    /// Number of bytes waiting for a terminator
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially received frame
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.skipping = false;
    }

    /// Whether bytes are being dropped until the next terminator
    pub fn is_skipping(&self) -> bool {
        self.skipping
    }

    fn discard_on_overflow(&mut self) {
        if !self.skipping && self.buffer.len() <= self.max_buffer {
            return;
        }
        // keep a possible terminator prefix split across chunks
        let keep = self.terminator.len() - 1;
        let dropped = self.buffer.len().saturating_sub(keep);
        if dropped == 0 {
            return;
        }
        if !self.skipping {
            tracing::warn!(
                "Discarding {} buffered bytes without a frame terminator",
                self.buffer.len()
            );
        }
        self.buffer.advance(dropped);
        self.skipping = true;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|byte| byte.is_ascii())
        .map(|&byte| char::from(byte))
        .collect()
}
