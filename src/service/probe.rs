//! Active health-check state machine, grounded on
//! `original_source/server/service.go::ProxyCheck`.
//!
//! Each probe owns a fixed-size sliding window of pass/fail booleans. A run
//! of `down` consecutive failures (window-relative) flips the host down; a
//! later run of `up` consecutive successes flips it back. Driven by a
//! `tokio::time::interval` loop instead of the Go original's `time.Timer` +
//! channel pair — the state machine's phases (Idle, Scheduled, Probing,
//! Stopped) collapse naturally onto a single async task's lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;

use crate::config::Check;
use crate::service::pool::ServicePool;

#[derive(Debug, Clone)]
pub struct ResolvedCheck {
    pub schema: String,
    pub path: String,
    pub method: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub expected_status: Option<u16>,
    pub expected_body: Option<String>,
    pub window: usize,
    pub down_threshold: usize,
    pub up_threshold: usize,
}

impl ResolvedCheck {
    pub fn from_config(check: &Check) -> Self {
        let window = check.window.filter(|w| *w > 0).unwrap_or(10);
        ResolvedCheck {
            schema: check.schema.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| "http".to_string()),
            path: check.path.clone(),
            method: check.method.clone().filter(|m| !m.is_empty()).unwrap_or_else(|| "GET".to_string()),
            interval: Duration::from_secs(check.interval.filter(|v| *v > 0).unwrap_or(60)),
            timeout: Duration::from_secs(check.timeout.filter(|v| *v > 0).unwrap_or(5)),
            expected_status: check.status,
            expected_body: check.body.clone(),
            window,
            down_threshold: check.down.filter(|d| *d > 0).unwrap_or(3).min(window),
            up_threshold: check.up.filter(|u| *u > 0).unwrap_or(2).min(window),
        }
    }
}

/// Ring buffer of the last `window` probe outcomes for one host.
struct SlidingWindow {
    points: Vec<bool>,
    cursor: usize,
    filled: usize,
}

impl SlidingWindow {
    fn new(window: usize) -> Self {
        SlidingWindow {
            points: vec![true; window.max(1)],
            cursor: 0,
            filled: 0,
        }
    }

    fn record(&mut self, ok: bool) {
        self.points[self.cursor] = ok;
        self.cursor = (self.cursor + 1) % self.points.len();
        self.filled = (self.filled + 1).min(self.points.len());
    }

    fn failures(&self) -> usize {
        self.points.iter().take(self.filled.max(1)).filter(|p| !**p).count()
    }

    fn successes(&self) -> usize {
        self.filled - self.failures().min(self.filled)
    }
}

/// Drives one (host, check) pair's probe loop until dropped.
pub struct Probe {
    stopped: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Drop for Probe {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        self.handle.abort();
    }
}

impl Probe {
    /// Spawns the probe task. `pool`/`host_index` identify the host this
    /// probe reports liveness for; `down`/`up` flip `pool`'s alive flag once
    /// the sliding window crosses the configured threshold.
    pub fn spawn(pool: Arc<ServicePool>, host_index: usize, check: ResolvedCheck) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let stopped_task = stopped.clone();
        let client = Client::builder()
            .timeout(check.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        let handle = tokio::spawn(async move {
            let mut window = SlidingWindow::new(check.window);
            let mut ticker = tokio::time::interval(check.interval);
            let host = pool.host_address(host_index).to_string();
            let url = format!("{}://{}{}", check.schema, host, check.path);

            loop {
                ticker.tick().await;
                if stopped_task.load(Ordering::Relaxed) {
                    break;
                }

                let ok = run_once(&client, &check, &url).await;
                window.record(ok);

                let failures = window.failures();
                let successes = window.successes();
                let was_alive = pool.is_alive(host_index);

                if was_alive && failures >= check.down_threshold {
                    pool.set_alive(host_index, false);
                } else if !was_alive && successes >= check.up_threshold {
                    pool.set_alive(host_index, true);
                }
            }
        });

        Probe { stopped, handle }
    }
}

async fn run_once(client: &Client, check: &ResolvedCheck, url: &str) -> bool {
    let method = match check.method.to_ascii_uppercase().as_str() {
        "POST" => reqwest::Method::POST,
        "HEAD" => reqwest::Method::HEAD,
        "PUT" => reqwest::Method::PUT,
        _ => reqwest::Method::GET,
    };

    let response = match client.request(method, url).send().await {
        Ok(r) => r,
        Err(_) => return false,
    };

    if let Some(expected) = check.expected_status {
        if response.status().as_u16() != expected {
            return false;
        }
    }

    if let Some(expected_body) = &check.expected_body {
        match response.text().await {
            Ok(body) => body.contains(expected_body.as_str()),
            Err(_) => false,
        }
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_source() {
        let resolved = ResolvedCheck::from_config(&Check::default());
        assert_eq!(resolved.schema, "http");
        assert_eq!(resolved.method, "GET");
        assert_eq!(resolved.window, 10);
        assert_eq!(resolved.interval, Duration::from_secs(60));
        assert_eq!(resolved.timeout, Duration::from_secs(5));
    }

    #[test]
    fn window_goes_down_after_threshold_failures_and_up_after_threshold_successes() {
        let mut window = SlidingWindow::new(10);
        for _ in 0..3 {
            window.record(false);
        }
        assert_eq!(window.failures(), 3);

        for _ in 0..2 {
            window.record(true);
        }
        assert_eq!(window.successes(), 2);
    }
}
