//! Logging sinks (spec.md §4.13): diagnostic logging is handled separately
//! via `log`/`env_logger` (see `main.rs`); this module covers the
//! structured access/error/syslog sinks that are core routing behavior, not
//! ambient diagnostics.

pub mod access;
pub mod logfmt;
pub mod sink;
pub mod syslog;

pub use access::AccessLog;
pub use logfmt::LogfmtRegistry;
pub use sink::LogSink;
pub use syslog::SysLogSink;
