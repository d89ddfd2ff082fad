//! Fixed-format syslog-style sink, grounded on `original_source/server/logger.go`'s
//! `Log`/`Error` methods (as distinct from the templated `Logfmt` lines used
//! for access logging).

use chrono::Local;

use crate::logging::sink::LogSink;

pub struct SysLogSink {
    sink: LogSink,
}

impl SysLogSink {
    pub fn from_config(log: Option<&crate::config::Log>) -> Self {
        SysLogSink {
            sink: LogSink::from_config(log),
        }
    }

    pub fn info(&self, message: &str) {
        self.write("INFO", message);
    }

    pub fn error(&self, message: &str) {
        self.write("ERROR", message);
    }

    fn write(&self, level: &str, message: &str) {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.sink.write_line(&format!("{now} [{level}] {message}"));
    }
}
