//! Splitting a chunked body into `\n\n`-delimited blocks
//!
//! Reads land in a byte buffer and only complete blocks leave it. Whatever
//! follows the last delimiter stays buffered until the next read, so an
//! event (or a multi-byte character) split across reads is reassembled
//! before it is decoded. The delimiter is ASCII and can never occur inside
//! a UTF-8 sequence.

const DELIMITER: &[u8] = b"\n\n";

#[derive(Debug, Default)]
pub struct EventFramer {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known not to contain a delimiter
    scanned: usize,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the bytes of one read
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Take the next complete block (without its delimiter)
    pub fn next_block(&mut self) -> Option<Vec<u8>> {
        // back up one byte: the first '\n' may be the previous read's last byte
        let start = self.scanned.saturating_sub(1);
        let found = self.buffer[start..]
            .windows(DELIMITER.len())
            .position(|w| w == DELIMITER);

        match found {
            Some(offset) => {
                let end = start + offset;
                let block = self.buffer[..end].to_vec();
                self.buffer.drain(..end + DELIMITER.len());
                self.scanned = 0;
                Some(block)
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Bytes waiting for a delimiter
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
