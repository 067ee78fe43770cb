//! Streaming UTF-8 decoding
//!
//! Bytes arrive in arbitrary chunks, so a multi-byte sequence may be split
//! across `feed` calls. The decoder keeps the partial sequence between calls.

/// Incremental UTF-8 decoder
#[derive(Debug, Clone, Default)]
pub struct Utf8Decoder {
    /// Bytes accumulated for current character
    buffer: [u8; 4],
    /// Number of bytes in buffer
    len: usize,
    /// Expected total bytes for current character
    expected: usize,
}

/// Result of feeding a byte to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Result {
    /// Need more bytes
    Pending,
    /// Successfully decoded a character
    Char(char),
    /// Invalid sequence; emit a replacement character
    Invalid,
    /// A partial sequence was cut short by this byte. Emit a replacement
    /// character, then process the byte again from a clean state.
    Interrupted,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.len = 0;
        self.expected = 0;
    }

    /// Check if decoder is in the middle of a sequence
    pub fn is_pending(&self) -> bool {
        self.len > 0
    }

    pub const fn replacement_char() -> char {
        '\u{FFFD}'
    }

    /// Feed one byte. ASCII bytes are expected to be handled by the caller
    /// while no sequence is pending.
    pub fn feed(&mut self, byte: u8) -> Utf8Result {
        if self.len == 0 {
            self.expected = match byte {
                0x00..=0x7F => return Utf8Result::Char(byte as char),
                0xC2..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF4 => 4,
                _ => return Utf8Result::Invalid,
            };
            self.buffer[0] = byte;
            self.len = 1;
            return Utf8Result::Pending;
        }

        if byte & 0b1100_0000 != 0b1000_0000 {
            self.reset();
            return Utf8Result::Interrupted;
        }

        self.buffer[self.len] = byte;
        self.len += 1;
        if self.len < self.expected {
            return Utf8Result::Pending;
        }

        let decoded = std::str::from_utf8(&self.buffer[..self.len])
            .ok()
            .and_then(|s| s.chars().next());
        self.reset();
        match decoded {
            Some(c) => Utf8Result::Char(c),
            None => Utf8Result::Invalid,
        }
    }
}
