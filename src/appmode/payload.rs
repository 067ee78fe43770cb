//! Payload grammar of the buffered modes

use tracing::warn;

/// Exit code used when BRACKET_END carries no parsable number
pub const DEFAULT_EXIT_CODE: i32 = 0;

/// Shell names accepted in front of a BRACKET_START command line
const KNOWN_SHELLS: &[&str] = &[
    "bash", "zsh", "fish", "sh", "ksh", "dash", "tcsh", "nu", "pwsh", "xonsh",
];

/// Split a BRACKET_START payload of the form `[shell;]command`.
///
/// The shell prefix is only recognized for known shell names, so a bare
/// command containing `;` is kept whole. Bash integration reports the
/// command through `history 1`, whose output starts with the history
/// number; for bash that prefix is removed by slicing at the first
/// whitespace. Other shells send the command verbatim.
pub fn parse_command_line(payload: &str) -> (Option<String>, String) {
    let (shell, rest) = match payload.split_once(';') {
        Some((shell, rest)) if KNOWN_SHELLS.contains(&shell.trim()) => (Some(shell.trim()), rest),
        _ => (None, payload),
    };
    let command = match shell {
        Some("bash") => strip_history_number(rest),
        _ => rest.trim(),
    };
    (shell.map(str::to_string), command.to_string())
}

/// `"  42  ls -la"` becomes `"ls -la"`
pub fn strip_history_number(line: &str) -> &str {
    let line = line.trim_start();
    match line.find(char::is_whitespace) {
        Some(index) => line[index..].trim(),
        None => "",
    }
}

pub fn parse_exit_code(payload: &str) -> i32 {
    match payload.trim().parse::<i32>() {
        Ok(code) => code,
        Err(_) => {
            warn!(
                payload,
                default = DEFAULT_EXIT_CODE,
                "unparsable exit code, using default"
            );
            DEFAULT_EXIT_CODE
        }
    }
}
