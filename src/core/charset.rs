//! G0-G3 character set designation
//!
//! Only the sets that shells and curses programs still use are supported:
//! ASCII, DEC Special Graphics (line drawing) and UK.

/// Character set designations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Ascii,
    /// Line drawing
    DecSpecialGraphics,
    /// ASCII with `#` replaced by the pound sign
    Uk,
}

impl Charset {
    /// Map the final byte of `ESC ( F` and friends to a charset
    pub fn from_designator(final_byte: u8) -> Option<Self> {
        match final_byte {
            b'B' | b'@' => Some(Charset::Ascii),
            b'0' | b'2' => Some(Charset::DecSpecialGraphics),
            b'A' => Some(Charset::Uk),
            _ => None,
        }
    }

    pub fn translate(self, c: char) -> char {
        match self {
            Charset::Ascii => c,
            Charset::Uk if c == '#' => '£',
            Charset::Uk => c,
            Charset::DecSpecialGraphics => match c {
                '_'..='~' => DEC_GRAPHICS[c as usize - '_' as usize],
                _ => c,
            },
        }
    }
}

/// DEC Special Graphics glyphs for 0x5F..=0x7E
const DEC_GRAPHICS: [char; 32] = [
    ' ', '◆', '▒', '␉', '␌', '␍', '␊', '°', '±', '␤', '␋', '┘', '┐', '┌', '└', '┼', '⎺', '⎻',
    '─', '⎼', '⎽', '├', '┤', '┴', '┬', '│', '≤', '≥', 'π', '≠', '£', '·',
];

/// Designated sets plus the shift state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharsetState {
    slots: [Charset; 4],
    /// Slot invoked into GL (0 after SI, 1 after SO)
    active: usize,
    /// Single shift (SS2/SS3) for the next character only
    single_shift: Option<usize>,
}

impl CharsetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn designate(&mut self, slot: usize, charset: Charset) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = charset;
        }
    }

    pub fn shift_in(&mut self) {
        self.active = 0;
    }

    pub fn shift_out(&mut self) {
        self.active = 1;
    }

    pub fn single_shift(&mut self, slot: usize) {
        if slot < 4 {
            self.single_shift = Some(slot);
        }
    }

    /// Translate one printed character, consuming any single shift
    pub fn translate(&mut self, c: char) -> char {
        let slot = self.single_shift.take().unwrap_or(self.active);
        self.slots[slot].translate(c)
    }

    /// True when every printable character maps to itself
    pub fn is_identity(&self) -> bool {
        self.single_shift.is_none() && self.slots[self.active] == Charset::Ascii
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_line_drawing() {
        let g = Charset::DecSpecialGraphics;
        assert_eq!(g.translate('q'), '─');
        assert_eq!(g.translate('x'), '│');
        assert_eq!(g.translate('l'), '┌');
        assert_eq!(g.translate('j'), '┘');
        assert_eq!(g.translate('A'), 'A');
    }

    #[test]
    fn test_charset_shift_out_in() {
        let mut state = CharsetState::new();
        state.designate(1, Charset::DecSpecialGraphics);
        assert_eq!(state.translate('q'), 'q');
        state.shift_out();
        assert_eq!(state.translate('q'), '─');
        state.shift_in();
        assert_eq!(state.translate('q'), 'q');
        assert!(state.is_identity());
    }

    #[test]
    fn test_charset_single_shift_applies_once() {
        let mut state = CharsetState::new();
        state.designate(2, Charset::Uk);
        state.single_shift(2);
        assert_eq!(state.translate('#'), '£');
        assert_eq!(state.translate('#'), '#');
    }

    #[test]
    fn test_charset_designators() {
        assert_eq!(Charset::from_designator(b'0'), Some(Charset::DecSpecialGraphics));
        assert_eq!(Charset::from_designator(b'B'), Some(Charset::Ascii));
        assert_eq!(Charset::from_designator(b'Z'), None);
    }
}
