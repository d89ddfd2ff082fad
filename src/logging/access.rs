//! Access/error log rendering: resolves a named `Logfmt`, expands its lines
//! against the request's variable snapshot, and writes the result through a
//! `LogSink`. Grounded on `original_source/server/handle.go`'s
//! `accessLog.Logfmt(c.variables.All())` / `errorLog.Logfmt(...)` calls.

use std::collections::HashMap;

use crate::logging::logfmt::LogfmtRegistry;
use crate::logging::sink::LogSink;
use crate::variable::expand_with;

pub struct AccessLog {
    sink: LogSink,
    format_name: String,
}

impl AccessLog {
    pub fn new(log: Option<&crate::config::Log>) -> Self {
        let format_name = log
            .and_then(|l| l.fmt.clone())
            .unwrap_or_else(|| "default".to_string());
        AccessLog {
            sink: LogSink::from_config(log),
            format_name,
        }
    }

    pub fn log(&self, logfmts: &LogfmtRegistry, variables: &HashMap<String, String>) {
        for line in logfmts.find(&self.format_name) {
            self.sink.write_line(&expand_with(&line, variables));
        }
    }
}
