//! Command-line surface, grounded on `original_source/server/cmd.go::Cmd`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Signal {
    Stop,
    Reload,
}

/// Configurable HTTP/HTTPS reverse proxy.
#[derive(Parser, Debug)]
#[command(name = "gatewayd", about = "Configurable HTTP/HTTPS reverse proxy", long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration entry file.
    #[arg(short = 'c', long = "config", default_value = "./config.json")]
    pub config: PathBuf,

    /// Send a signal to an already-running instance instead of starting one.
    #[arg(short = 's', long = "signal", value_enum)]
    pub signal: Option<Signal>,

    /// PID of the running instance to signal (overrides `--pid-file`).
    #[arg(long = "pid")]
    pub pid: Option<i32>,

    /// Path to the PID file this instance writes on startup, and reads for
    /// `--signal` dispatch.
    #[arg(long = "pid-file", default_value = "./proxy.pid")]
    pub pid_file: PathBuf,

    /// Enable debug-level diagnostic logging.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Parses `std::env::args_os()`, accepting the single-dash `-pid`/
    /// `-pid-file` spelling documented in spec.md §6 (Go's `flag` package
    /// convention, matching `original_source/server/cmd.go`) in addition to
    /// clap's own double-dash form. `clap`'s derive macro only ever
    /// recognizes long options as `--foo`, so a bare `-pid` would otherwise
    /// be parsed as a cluster of undefined short options and rejected;
    /// rewrite those two tokens to their double-dash spelling before handing
    /// argv to clap.
    pub fn parse_args() -> Self {
        let rewritten: Vec<_> = std::env::args_os().map(rewrite_single_dash_long_flag).collect();
        Self::parse_from(rewritten)
    }
}

fn rewrite_single_dash_long_flag(arg: std::ffi::OsString) -> std::ffi::OsString {
    let Some(s) = arg.to_str() else {
        return arg;
    };
    for long in ["pid-file", "pid"] {
        let bare = format!("-{long}");
        if s == bare {
            return format!("--{long}").into();
        }
        if let Some(value) = s.strip_prefix(&format!("-{long}=")) {
            return format!("--{long}={value}").into();
        }
    }
    arg
}
