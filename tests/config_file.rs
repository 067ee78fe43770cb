//! Configuration files on disk

use std::io::Write;

use tempfile::NamedTempFile;
use termframe::config::ConfigError;
use termframe::retention::{FrameAction, FrameRuleConfig};
use termframe::{EngineConfig, Emulator};

#[test]
fn test_save_then_load() {
    let mut config = EngineConfig::with_size(30, 100);
    config.scrollback_max_lines = 2_000;
    config.answerback = "tf".into();
    config.frames.default = FrameAction::IfLinesExceed(10);
    config.frames.rules = vec![
        FrameRuleConfig::command("vim", FrameAction::Never),
        FrameRuleConfig::regex("^docker (build|pull)", FrameAction::Always),
    ];

    let file = NamedTempFile::new().unwrap();
    config.save(file.path()).unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    assert!(text.contains("if-lines-exceed:10"));

    let loaded = EngineConfig::load(file.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = EngineConfig::load(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_load_rejects_bad_rules() {
    let cases = [
        ("[frames]\ndefault = \"sometimes\"\n", "action"),
        (
            "[[frames.rules]]\nregex = \"(unclosed\"\naction = \"never\"\n",
            "regex",
        ),
        (
            "[[frames.rules]]\ncommand = \"ls\"\nregex = \"ls\"\naction = \"never\"\n",
            "ambiguous",
        ),
    ];
    for (content, label) in cases {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let result = EngineConfig::load(file.path());
        assert!(result.is_err(), "{} should be rejected", label);
    }
}

#[test]
fn test_emulator_from_loaded_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "rows = 6\ncolumns = 30\n\n[[frames.rules]]\ncommand = \"ls\"\naction = \"never\""
    )
    .unwrap();
    let config = EngineConfig::load(file.path()).unwrap();
    let mut emu = Emulator::with_cookie(config, "abc123").unwrap();
    assert_eq!((emu.rows(), emu.cols()), (6, 30));
    emu.feed(b"\x1b]abc123;2;ls\x07a\r\n\x1b]abc123;3;0\x07");
    assert_eq!(emu.frames().count(), 0);
}

#[test]
fn test_emulator_rejects_invalid_config() {
    let config = EngineConfig::with_size(0, 80);
    assert!(Emulator::new(config).is_err());
}
