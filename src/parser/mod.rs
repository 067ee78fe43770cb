//! Terminal input tokenizer
//!
//! Turns raw pty bytes into structural tokens. This is the only part of the
//! engine that knows about byte framing, UTF-8 and control-sequence grammar.

mod params;
mod token;
mod tokenizer;
mod utf8;

pub use params::Params;
pub use token::{CsiToken, Token};
pub use tokenizer::{Tokenizer, TokenizerState, Tokens, STREAM_CHUNK_LEN};
pub use utf8::{Utf8Decoder, Utf8Result};
