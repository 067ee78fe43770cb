//! Terminal mode flags

use serde::{Deserialize, Serialize};

/// Mode flags toggled by SM/RM and DECSET/DECRST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// DECAWM - wrap at the right margin
    pub autowrap: bool,
    /// DECOM - cursor addressing relative to the scroll region
    pub origin: bool,
    /// IRM - insert instead of overwrite
    pub insert: bool,
    /// LNM - LF also performs CR
    pub linefeed_newline: bool,
    /// DECCKM - cursor keys send application sequences
    pub cursor_keys_application: bool,
    /// DECKPAM/DECKPNM
    pub keypad_application: bool,
    /// DECSET 2004
    pub bracketed_paste: bool,
    /// DECSET 1004
    pub focus_reporting: bool,
    /// DECSCNM - reverse video
    pub reverse_video: bool,
    /// DECTCEM - cursor visible
    pub cursor_visible: bool,
    /// Alternate screen buffer active (DECSET 47/1047/1049)
    pub alternate_screen: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            autowrap: true,
            origin: false,
            insert: false,
            linefeed_newline: false,
            cursor_keys_application: false,
            keypad_application: false,
            bracketed_paste: false,
            focus_reporting: false,
            reverse_video: false,
            cursor_visible: true,
            alternate_screen: false,
        }
    }
}

impl Modes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or reset a DEC private mode that is a plain flag.
    /// Returns false for modes that need screen-level handling or are
    /// unknown. Alternate screen modes are handled by the screen.
    pub fn set_dec_mode(&mut self, mode: u16, on: bool) -> bool {
        let flag = match mode {
            1 => &mut self.cursor_keys_application,
            5 => &mut self.reverse_video,
            7 => &mut self.autowrap,
            25 => &mut self.cursor_visible,
            1004 => &mut self.focus_reporting,
            2004 => &mut self.bracketed_paste,
            _ => return false,
        };
        *flag = on;
        true
    }

    /// Set or reset an ANSI mode (SM/RM)
    pub fn set_ansi_mode(&mut self, mode: u16, on: bool) -> bool {
        match mode {
            4 => self.insert = on,
            20 => self.linefeed_newline = on,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_default() {
        let modes = Modes::default();
        assert!(modes.autowrap);
        assert!(modes.cursor_visible);
        assert!(!modes.insert);
        assert!(!modes.alternate_screen);
    }

    #[test]
    fn test_modes_dec_toggle() {
        let mut modes = Modes::new();
        assert!(modes.set_dec_mode(25, false));
        assert!(!modes.cursor_visible);
        assert!(modes.set_dec_mode(2004, true));
        assert!(modes.bracketed_paste);
        assert!(!modes.set_dec_mode(9999, true));
    }

    #[test]
    fn test_modes_ansi_toggle() {
        let mut modes = Modes::new();
        assert!(modes.set_ansi_mode(4, true));
        assert!(modes.insert);
        assert!(!modes.set_ansi_mode(12, true));
    }
}
