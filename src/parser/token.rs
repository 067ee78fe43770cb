//! Structural tokens produced by the tokenizer
//!
//! Tokens carry syntax only. Interpreting them (what `CSI 2 J` means) is the
//! emulator's job.

use super::params::Params;

/// One structural unit of the input stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of printable code points
    Print(String),

    /// A single C0 control byte
    Execute(u8),

    /// ESC sequence (non-CSI)
    Esc {
        intermediates: Vec<u8>,
        final_byte: u8,
    },

    /// CSI (Control Sequence Introducer) sequence
    Csi(CsiToken),

    /// A complete OSC, split on `;`
    Osc { params: Vec<Vec<u8>> },

    /// Start of a streamed (private) OSC. `params` holds the leading two
    /// fields; the remainder arrives as `OscPut` chunks.
    OscStart { params: Vec<Vec<u8>> },

    /// Payload chunk of a streamed OSC
    OscPut(Vec<u8>),

    /// Terminator of a streamed OSC
    OscEnd,

    /// A streamed OSC was cancelled (CAN/SUB) before its terminator
    OscAbort,

    /// DCS passthrough payload
    Dcs {
        params: Params,
        intermediates: Vec<u8>,
        final_byte: u8,
        data: Vec<u8>,
    },
}

/// CSI sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiToken {
    pub params: Params,
    pub intermediates: Vec<u8>,
    /// Private marker byte (`?`, `>`, `<`, `=`), or 0 for none
    pub marker: u8,
    pub final_byte: u8,
}

impl CsiToken {
    /// Get a parameter with a default when absent or zero
    pub fn param(&self, index: usize, default: u16) -> u16 {
        self.params.get_or(index, default)
    }

    pub fn is_private(&self) -> bool {
        self.marker == b'?'
    }
}
