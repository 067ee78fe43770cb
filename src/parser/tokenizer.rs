//! Terminal byte-stream tokenizer
//!
//! Implements a state machine based on the VT500 series parser model.
//! Reference: https://vt100.net/emu/dec_ansi_parser
//!
//! All parse position lives in the tokenizer, so any sequence may be split
//! at any byte across `feed` calls. Malformed input never produces an error:
//! offending bytes are dropped and the machine resynchronizes at the next
//! introducer (ESC, 0x9B, ...).
//!
//! OSC handling comes in two flavours. Standard OSCs start with a numeric
//! command and are buffered whole (`Token::Osc`). An OSC whose first field
//! does not start with a digit is an application OSC: after its first two
//! fields the tokenizer emits `Token::OscStart` and streams the rest as
//! `Token::OscPut` chunks so that large payloads are never buffered.

use std::collections::VecDeque;

use super::params::Params;
use super::token::{CsiToken, Token};
use super::utf8::{Utf8Decoder, Utf8Result};

/// Maximum length for buffered OSC/DCS data to prevent DoS
const MAX_STRING_LEN: usize = 65536;
/// Maximum length for intermediate bytes
const MAX_INTERMEDIATES: usize = 4;
/// Maximum raw CSI parameter bytes
const MAX_PARAM_BYTES: usize = 256;
/// Maximum size of the two leading fields of an application OSC
const MAX_HEADER_LEN: usize = 256;
/// Streamed OSC payload is emitted in chunks of at most this many bytes
pub const STREAM_CHUNK_LEN: usize = 4096;

/// Tokenizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerState {
    /// Normal text processing
    Ground,
    /// After ESC
    Escape,
    /// ESC followed by intermediate bytes
    EscapeIntermediate,
    /// After ESC [
    CsiEntry,
    /// Collecting CSI parameters
    CsiParam,
    /// Collecting CSI intermediate bytes
    CsiIntermediate,
    /// CSI sequence is invalid, consume until final byte
    CsiIgnore,
    /// Buffering a standard OSC
    OscString,
    /// Reading the leading fields of an application OSC
    OscHeader,
    /// Streaming the payload of an application OSC
    OscStream,
    /// After ESC P
    DcsEntry,
    /// Collecting DCS parameters
    DcsParam,
    /// Collecting DCS intermediate bytes
    DcsIntermediate,
    /// DCS passthrough mode
    DcsPassthrough,
    /// DCS sequence is invalid, consume until ST
    DcsIgnore,
    /// SOS, PM or APC string (consumed and ignored)
    IgnoreString,
}

impl TokenizerState {
    fn is_string(self) -> bool {
        matches!(
            self,
            TokenizerState::OscString
                | TokenizerState::OscHeader
                | TokenizerState::OscStream
                | TokenizerState::DcsPassthrough
                | TokenizerState::DcsIgnore
                | TokenizerState::IgnoreString
        )
    }

    fn is_osc(self) -> bool {
        matches!(
            self,
            TokenizerState::OscString | TokenizerState::OscHeader | TokenizerState::OscStream
        )
    }
}

/// Resumable terminal tokenizer
#[derive(Debug, Clone)]
pub struct Tokenizer {
    state: TokenizerState,
    utf8: Utf8Decoder,
    /// Pending printable run, flushed before any other token
    print: String,
    params_buf: Vec<u8>,
    intermediates: Vec<u8>,
    marker: u8,
    /// OSC/DCS string data, or the pending chunk of a streamed OSC
    string: Vec<u8>,
    /// Completed leading fields of an application OSC
    header: Vec<Vec<u8>>,
    /// Continuation bytes still expected inside string payload, so that a
    /// 0x9C continuation byte is not taken for an 8-bit ST
    string_utf8_remaining: u8,
    dcs_final: u8,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: TokenizerState::Ground,
            utf8: Utf8Decoder::new(),
            print: String::with_capacity(256),
            params_buf: Vec::with_capacity(64),
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            marker: 0,
            string: Vec::with_capacity(256),
            header: Vec::with_capacity(2),
            string_utf8_remaining: 0,
            dcs_final: 0,
        }
    }

    /// Get current tokenizer state
    pub fn state(&self) -> TokenizerState {
        self.state
    }

    /// Reset to ground state, dropping any partial sequence
    pub fn reset(&mut self) {
        self.state = TokenizerState::Ground;
        self.utf8.reset();
        self.print.clear();
        self.params_buf.clear();
        self.intermediates.clear();
        self.marker = 0;
        self.string.clear();
        self.header.clear();
        self.string_utf8_remaining = 0;
        self.dcs_final = 0;
    }

    /// Tokenize a chunk lazily. The returned iterator must be drained for
    /// the whole chunk to be consumed.
    pub fn feed<'a>(&'a mut self, bytes: &'a [u8]) -> Tokens<'a> {
        Tokens {
            tokenizer: self,
            bytes,
            pos: 0,
            queue: VecDeque::new(),
            finished: false,
        }
    }

    /// Tokenize a chunk, calling the callback for each token
    pub fn parse<F>(&mut self, bytes: &[u8], mut callback: F)
    where
        F: FnMut(Token),
    {
        for &byte in bytes {
            self.advance(byte, &mut callback);
        }
        self.end_of_chunk(&mut callback);
    }

    /// Tokenize a chunk and collect the tokens into a vector
    pub fn parse_collect(&mut self, bytes: &[u8]) -> Vec<Token> {
        let mut tokens = Vec::new();
        self.parse(bytes, |token| tokens.push(token));
        tokens
    }

    /// Flush state that must not wait for the next chunk
    fn end_of_chunk<F>(&mut self, callback: &mut F)
    where
        F: FnMut(Token),
    {
        self.flush_print(callback);
        if self.state == TokenizerState::OscStream && !self.string.is_empty() {
            callback(Token::OscPut(std::mem::take(&mut self.string)));
        }
    }

    fn flush_print<F>(&mut self, callback: &mut F)
    where
        F: FnMut(Token),
    {
        if !self.print.is_empty() {
            callback(Token::Print(std::mem::take(&mut self.print)));
        }
    }

    fn emit<F>(&mut self, token: Token, callback: &mut F)
    where
        F: FnMut(Token),
    {
        self.flush_print(callback);
        callback(token);
    }

    /// Advance the tokenizer by one byte
    fn advance<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        if self.utf8.is_pending() {
            match self.utf8.feed(byte) {
                Utf8Result::Pending => return,
                Utf8Result::Char(c) => {
                    self.print_char(c);
                    return;
                }
                Utf8Result::Invalid => {
                    self.print.push(Utf8Decoder::replacement_char());
                    return;
                }
                Utf8Result::Interrupted => {
                    self.print.push(Utf8Decoder::replacement_char());
                }
            }
        }

        if self.state.is_string() {
            self.advance_string(byte, callback);
            return;
        }

        match byte {
            0x1B => {
                self.enter_escape();
                return;
            }
            0x18 | 0x1A => {
                // CAN, SUB: cancel any sequence in progress
                if self.state != TokenizerState::Ground {
                    self.state = TokenizerState::Ground;
                    return;
                }
            }
            0x7F => return,
            0xA0..=0xFF if self.state != TokenizerState::Ground => return,
            0x80..=0x9F => {
                self.c1_control(byte, callback);
                return;
            }
            _ => {}
        }

        if byte < 0x20 {
            // C0 controls execute immediately, even in the middle of a
            // sequence, except inside DCS headers where they are ignored
            if !matches!(
                self.state,
                TokenizerState::DcsEntry | TokenizerState::DcsParam | TokenizerState::DcsIntermediate
            ) {
                self.emit(Token::Execute(byte), callback);
            }
            return;
        }

        match self.state {
            TokenizerState::Ground => self.handle_ground(byte),
            TokenizerState::Escape => self.handle_escape(byte, callback),
            TokenizerState::EscapeIntermediate => self.handle_escape_intermediate(byte, callback),
            TokenizerState::CsiEntry => self.handle_csi_entry(byte, callback),
            TokenizerState::CsiParam => self.handle_csi_param(byte, callback),
            TokenizerState::CsiIntermediate => self.handle_csi_intermediate(byte, callback),
            TokenizerState::CsiIgnore => {
                if (0x40..=0x7E).contains(&byte) {
                    self.state = TokenizerState::Ground;
                }
            }
            TokenizerState::DcsEntry | TokenizerState::DcsParam | TokenizerState::DcsIntermediate => {
                self.handle_dcs_header(byte)
            }
            // String states are routed to advance_string above
            TokenizerState::OscString
            | TokenizerState::OscHeader
            | TokenizerState::OscStream
            | TokenizerState::DcsPassthrough
            | TokenizerState::DcsIgnore
            | TokenizerState::IgnoreString => {}
        }
    }

    fn c1_control<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            0x90 => self.enter_dcs(),
            0x9B => self.enter_csi(),
            0x9D => self.enter_osc(),
            0x98 | 0x9E | 0x9F => self.state = TokenizerState::IgnoreString,
            0x9C => self.state = TokenizerState::Ground,
            _ => {
                // Remaining C1 controls are 8-bit forms of ESC Fe
                self.state = TokenizerState::Ground;
                self.emit(
                    Token::Esc {
                        intermediates: Vec::new(),
                        final_byte: byte - 0x40,
                    },
                    callback,
                );
            }
        }
    }

    fn handle_ground(&mut self, byte: u8) {
        if byte < 0x80 {
            self.print.push(byte as char);
            return;
        }
        match self.utf8.feed(byte) {
            Utf8Result::Char(c) => self.print_char(c),
            Utf8Result::Invalid | Utf8Result::Interrupted => {
                self.print.push(Utf8Decoder::replacement_char())
            }
            Utf8Result::Pending => {}
        }
    }

    fn print_char(&mut self, c: char) {
        // Decoded C1 code points (U+0080..U+009F) are not printable
        if !c.is_control() {
            self.print.push(c);
        }
    }

    fn enter_escape(&mut self) {
        self.state = TokenizerState::Escape;
        self.intermediates.clear();
    }

    fn handle_escape<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            b'[' => self.enter_csi(),
            b']' => self.enter_osc(),
            b'P' => self.enter_dcs(),
            b'X' | b'^' | b'_' => self.state = TokenizerState::IgnoreString,
            b'\\' => {
                // Stray ST
                self.state = TokenizerState::Ground;
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = TokenizerState::EscapeIntermediate;
            }
            _ => {
                self.state = TokenizerState::Ground;
                self.emit(
                    Token::Esc {
                        intermediates: Vec::new(),
                        final_byte: byte,
                    },
                    callback,
                );
            }
        }
    }

    fn handle_escape_intermediate<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(byte);
                }
            }
            _ => {
                self.state = TokenizerState::Ground;
                let intermediates = std::mem::take(&mut self.intermediates);
                self.emit(
                    Token::Esc {
                        intermediates,
                        final_byte: byte,
                    },
                    callback,
                );
            }
        }
    }

    fn enter_csi(&mut self) {
        self.state = TokenizerState::CsiEntry;
        self.params_buf.clear();
        self.intermediates.clear();
        self.marker = 0;
    }

    fn handle_csi_entry<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            b'<' | b'=' | b'>' | b'?' => {
                self.marker = byte;
                self.state = TokenizerState::CsiParam;
            }
            _ => {
                self.state = TokenizerState::CsiParam;
                self.handle_csi_param(byte, callback);
            }
        }
    }

    fn handle_csi_param<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            b'0'..=b'9' | b';' | b':' => {
                if self.params_buf.len() < MAX_PARAM_BYTES {
                    self.params_buf.push(byte);
                }
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = TokenizerState::CsiIntermediate;
            }
            0x40..=0x7E => self.dispatch_csi(byte, callback),
            _ => {
                // Private marker in wrong position
                self.state = TokenizerState::CsiIgnore;
            }
        }
    }

    fn handle_csi_intermediate<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(byte);
                } else {
                    self.state = TokenizerState::CsiIgnore;
                }
            }
            0x40..=0x7E => self.dispatch_csi(byte, callback),
            _ => self.state = TokenizerState::CsiIgnore,
        }
    }

    fn dispatch_csi<F>(&mut self, final_byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        self.state = TokenizerState::Ground;
        let token = CsiToken {
            params: Params::parse(&self.params_buf),
            intermediates: std::mem::take(&mut self.intermediates),
            marker: self.marker,
            final_byte,
        };
        self.emit(Token::Csi(token), callback);
    }

    fn enter_osc(&mut self) {
        self.state = TokenizerState::OscString;
        self.string.clear();
        self.header.clear();
        self.string_utf8_remaining = 0;
    }

    fn enter_dcs(&mut self) {
        self.state = TokenizerState::DcsEntry;
        self.params_buf.clear();
        self.intermediates.clear();
        self.string.clear();
        self.string_utf8_remaining = 0;
    }

    fn handle_dcs_header(&mut self, byte: u8) {
        match (self.state, byte) {
            (TokenizerState::DcsEntry, b'<' | b'=' | b'>' | b'?') => {
                self.state = TokenizerState::DcsParam;
            }
            (TokenizerState::DcsEntry | TokenizerState::DcsParam, b'0'..=b'9' | b';' | b':') => {
                if self.params_buf.len() < MAX_PARAM_BYTES {
                    self.params_buf.push(byte);
                }
                self.state = TokenizerState::DcsParam;
            }
            (_, 0x20..=0x2F) => {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(byte);
                }
                self.state = TokenizerState::DcsIntermediate;
            }
            (_, 0x40..=0x7E) => {
                self.dcs_final = byte;
                self.state = TokenizerState::DcsPassthrough;
            }
            _ => self.state = TokenizerState::DcsIgnore,
        }
    }

    /// Handle a byte while inside OSC, DCS passthrough or an ignored string
    fn advance_string<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            0x1B => {
                // Either ST (ESC \) or a new sequence; both end the string
                self.finish_string(callback);
                self.enter_escape();
                return;
            }
            0x07 if self.state.is_osc() => {
                self.finish_string(callback);
                self.state = TokenizerState::Ground;
                return;
            }
            0x9C if self.string_utf8_remaining == 0 => {
                self.finish_string(callback);
                self.state = TokenizerState::Ground;
                return;
            }
            0x18 | 0x1A => {
                if self.state == TokenizerState::OscStream
                    || (self.state == TokenizerState::OscHeader && !self.header.is_empty())
                {
                    self.string.clear();
                    self.emit(Token::OscAbort, callback);
                }
                self.header.clear();
                self.string.clear();
                self.state = TokenizerState::Ground;
                return;
            }
            // Streamed payloads are forwarded verbatim
            0x00..=0x1F | 0x7F if self.state != TokenizerState::OscStream => return,
            _ => {}
        }

        self.track_string_utf8(byte);

        match self.state {
            TokenizerState::OscString => {
                if self.string.is_empty() && self.header.is_empty() && !byte.is_ascii_digit() {
                    self.state = TokenizerState::OscHeader;
                    self.header_byte(byte, callback);
                } else if self.string.len() < MAX_STRING_LEN {
                    self.string.push(byte);
                }
            }
            TokenizerState::OscHeader => self.header_byte(byte, callback),
            TokenizerState::OscStream => {
                self.string.push(byte);
                if self.string.len() >= STREAM_CHUNK_LEN {
                    let chunk = std::mem::take(&mut self.string);
                    self.emit(Token::OscPut(chunk), callback);
                }
            }
            TokenizerState::DcsPassthrough => {
                if self.string.len() < MAX_STRING_LEN {
                    self.string.push(byte);
                }
            }
            _ => {}
        }
    }

    fn track_string_utf8(&mut self, byte: u8) {
        self.string_utf8_remaining = match byte {
            0x80..=0xBF => self.string_utf8_remaining.saturating_sub(1),
            0xC0..=0xDF => 1,
            0xE0..=0xEF => 2,
            0xF0..=0xF7 => 3,
            _ => 0,
        };
    }

    fn header_byte<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        if byte == b';' {
            self.header.push(std::mem::take(&mut self.string));
            if self.header.len() == 2 {
                self.start_stream(callback);
            }
            return;
        }
        if self.string.len() >= MAX_HEADER_LEN {
            // Oversized field: stream from here on without a second field
            self.header.push(std::mem::take(&mut self.string));
            self.start_stream(callback);
        }
        self.string.push(byte);
    }

    fn start_stream<F>(&mut self, callback: &mut F)
    where
        F: FnMut(Token),
    {
        let params = std::mem::take(&mut self.header);
        self.state = TokenizerState::OscStream;
        self.emit(Token::OscStart { params }, callback);
    }

    fn finish_string<F>(&mut self, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match self.state {
            TokenizerState::OscString => {
                let params = self
                    .string
                    .split(|&b| b == b';')
                    .map(<[u8]>::to_vec)
                    .collect();
                self.emit(Token::Osc { params }, callback);
            }
            TokenizerState::OscHeader => {
                self.header.push(std::mem::take(&mut self.string));
                let params = std::mem::take(&mut self.header);
                self.emit(Token::OscStart { params }, callback);
                self.emit(Token::OscEnd, callback);
            }
            TokenizerState::OscStream => {
                if !self.string.is_empty() {
                    let chunk = std::mem::take(&mut self.string);
                    self.emit(Token::OscPut(chunk), callback);
                }
                self.emit(Token::OscEnd, callback);
            }
            TokenizerState::DcsPassthrough => {
                let token = Token::Dcs {
                    params: Params::parse(&self.params_buf),
                    intermediates: std::mem::take(&mut self.intermediates),
                    final_byte: self.dcs_final,
                    data: std::mem::take(&mut self.string),
                };
                self.emit(token, callback);
            }
            _ => {}
        }
        self.string.clear();
        self.header.clear();
        self.string_utf8_remaining = 0;
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy token iterator over one chunk, see [`Tokenizer::feed`]
pub struct Tokens<'a> {
    tokenizer: &'a mut Tokenizer,
    bytes: &'a [u8],
    pos: usize,
    queue: VecDeque<Token>,
    finished: bool,
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(token);
            }
            let queue = &mut self.queue;
            if let Some(&byte) = self.bytes.get(self.pos) {
                self.pos += 1;
                self.tokenizer.advance(byte, &mut |token| queue.push_back(token));
            } else if !self.finished {
                self.finished = true;
                self.tokenizer
                    .end_of_chunk(&mut |token| queue.push_back(token));
            } else {
                return None;
            }
        }
    }
}
