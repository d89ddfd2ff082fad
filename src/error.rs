//! Error taxonomy for the gateway, grouped the way spec failures are grouped:
//! configuration/startup errors are fatal before any listener binds; runtime
//! matching/balancing/upstream errors are recovered into an HTTP response;
//! reload errors leave the previous routing table in place.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file must have a .json extension: {0}")]
    InvalidFileType(PathBuf),

    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to expand @include glob {pattern}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config has no apps; nothing to listen on")]
    NoApps,

    #[error("invalid pattern in domain {domain}: {source}")]
    Pattern {
        domain: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("port {0} is already in use")]
    PortInUse(u16),

    #[error("TLS certificate or key unreadable for port {port}: {source}")]
    TlsUnreadable {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("another instance is already running (pid {0})")]
    AlreadyRunning(i32),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Non-fatal: logged to the error sink, the request falls through to 404.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid regex in filter: {0}")]
    BadRegex(#[from] regex::Error),
}

/// Non-fatal: logged to the error sink, the request falls through to 500.
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("no service named {0}")]
    NoSuchService(String),

    #[error("service {0} has no live hosts")]
    NoLiveHosts(String),
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream connect failed: {0}")]
    Connect(String),

    #[error(transparent)]
    Balance(#[from] BalanceError),
}

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("reload has no apps for any previously bound port")]
    NothingToReload,
}
