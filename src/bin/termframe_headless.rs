//! Headless runner
//!
//! Feeds a byte stream through the engine and prints the resulting state.
//! Useful for testing and generating deterministic snapshots.
//!
//! # Usage
//!
//! ```bash
//! # Process input from stdin and output a JSON snapshot
//! printf 'Hello\x1b[31mRed\x1b[0m' | termframe-headless
//!
//! # Process a recorded session and print the text plus history
//! termframe-headless --input session.bin --text --history
//! ```

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use termframe::{EngineConfig, Emulator};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Input is fed in chunks of this size so that sequences cross batch
/// boundaries the way they do when read from a pty
const CHUNK_SIZE: usize = 4096;

/// Command-line arguments
struct Args {
    /// Input file (stdin if not specified)
    input: Option<PathBuf>,
    /// Output file (stdout if not specified)
    output: Option<PathBuf>,
    /// TOML configuration file
    config: Option<PathBuf>,
    /// Session cookie for application-mode sequences
    cookie: Option<String>,
    /// Output as text instead of JSON
    text: bool,
    /// Include retained history in text output
    history: bool,
    cols: Option<usize>,
    rows: Option<usize>,
    scrollback: Option<usize>,
    help: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        input: None,
        output: None,
        config: None,
        cookie: None,
        text: false,
        history: false,
        cols: None,
        rows: None,
        scrollback: None,
        help: false,
    };
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let mut i = 0;
    while i < argv.len() {
        let value = argv.get(i + 1).cloned();
        match argv[i].as_str() {
            "-h" | "--help" => args.help = true,
            "-t" | "--text" => args.text = true,
            "--history" => args.history = true,
            "-i" | "--input" => {
                args.input = value.map(PathBuf::from);
                i += 1;
            }
            "-o" | "--output" => {
                args.output = value.map(PathBuf::from);
                i += 1;
            }
            "--config" => {
                args.config = value.map(PathBuf::from);
                i += 1;
            }
            "--cookie" => {
                args.cookie = value;
                i += 1;
            }
            "-c" | "--cols" => {
                args.cols = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "-r" | "--rows" => {
                args.rows = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "-s" | "--scrollback" => {
                args.scrollback = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            other => eprintln!("ignoring unknown argument {:?}", other),
        }
        i += 1;
    }

    args
}

fn print_help() {
    eprintln!(
        r#"termframe-headless - Headless terminal engine for testing

USAGE:
    termframe-headless [OPTIONS]

OPTIONS:
    -h, --help              Show this help message
    -i, --input <FILE>      Input file (stdin if not specified)
    -o, --output <FILE>     Output file (stdout if not specified)
    -t, --text              Output as plain text instead of JSON
        --history           Prepend retained history to text output
        --config <FILE>     TOML configuration
        --cookie <TOKEN>    Session cookie for shell integration
    -c, --cols <N>          Terminal columns (default: 80)
    -r, --rows <N>          Terminal rows (default: 24)
    -s, --scrollback <N>    Scrollback line cap (default: 10000)

Logging is controlled with RUST_LOG (default: info).
"#
    );
}

fn load_config(args: &Args) -> termframe::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(cols) = args.cols {
        config.columns = cols;
    }
    if let Some(rows) = args.rows {
        config.rows = rows;
    }
    if let Some(lines) = args.scrollback {
        config.scrollback_max_lines = lines;
    }
    Ok(config)
}

fn run(args: &Args) -> termframe::Result<()> {
    let config = load_config(args)?;
    let mut emulator = match &args.cookie {
        Some(cookie) => Emulator::with_cookie(config, cookie.as_str())?,
        None => Emulator::new(config)?,
    };
    info!(cookie = emulator.cookie(), "session started");

    let input = match &args.input {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            data
        }
    };

    for chunk in input.chunks(CHUNK_SIZE) {
        emulator.feed(chunk);
    }
    emulator.run_maintenance();

    let snapshot = emulator.snapshot();
    let output = if args.text {
        let mut text = String::new();
        if args.history && emulator.history_len() > 0 {
            text.push_str(&emulator.history_text());
            text.push('\n');
        }
        text.push_str(&snapshot.to_text());
        text
    } else {
        snapshot
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    };

    match &args.output {
        Some(path) => File::create(path)?.write_all(output.as_bytes())?,
        None => io::stdout().write_all(output.as_bytes())?,
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = parse_args();
    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
