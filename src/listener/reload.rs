//! Reload coordinator: atomically swaps every port's routing table in,
//! then drains the previous generation's health-check probes only after
//! every swap has released its lock. Grounded on
//! `original_source/server/http_server.go`'s `startReload`/`endReload`.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;

use crate::config::{App, Config};
use crate::error::ConfigError;
use crate::logging::{LogfmtRegistry, SysLogSink};
use crate::proxy::domain::{ProxyDomain, ProxyHandles};
use crate::service::ServiceRegistry;

/// Builds a fresh `ProxyHandles` per listening port from a loaded config.
/// Apps that declare the same port are merged into one table (last app's
/// TLS cert/key wins), mirroring `HttpServer.appendApp`.
pub fn build_handles(config: &Config) -> Result<HashMap<u16, (Arc<ProxyHandles>, Option<(String, String)>)>, ConfigError> {
    let global_registry = Arc::new(ServiceRegistry::build(&config.services, None));

    let mut by_port: HashMap<u16, (Vec<&App>, Option<(String, String)>)> = HashMap::new();
    for app in &config.apps {
        let entry = by_port.entry(app.port).or_insert_with(|| (Vec::new(), None));
        entry.0.push(app);
        if let (Some(cert), Some(key)) = (&app.certfile, &app.keyfile) {
            entry.1 = Some((cert.clone(), key.clone()));
        }
    }

    let mut result = HashMap::new();
    for (port, (apps, tls)) in by_port {
        let mut domains = HashMap::new();
        let mut logfmt_entries = config.logfmts.clone();

        for app in &apps {
            let app_registry = Arc::new(ServiceRegistry::build(&app.services, Some(global_registry.clone())));
            logfmt_entries.extend(app.logfmts.clone());

            for domain in &app.domains {
                let built = ProxyDomain::build(
                    domain,
                    app.access_log.as_ref(),
                    app.error_log.as_ref(),
                    app_registry.clone(),
                )
                .map_err(|source| ConfigError::Pattern {
                    domain: domain.domain.clone(),
                    source,
                })?;
                domains.insert(domain.domain.clone(), Arc::new(built));
            }
        }

        let handles = Arc::new(ProxyHandles {
            domains,
            logfmts: LogfmtRegistry::from_config(&logfmt_entries),
            syslog: Arc::new(SysLogSink::from_config(config.syslog.as_ref())),
        });

        result.insert(port, (handles, tls));
    }

    Ok(result)
}

/// Entry point for a `SIGHUP`-triggered reload: re-reads the config from
/// disk and rebuilds every port's routing table. `known_ports` is every
/// port a `GatewayApp` is currently listening on; any such port that no
/// longer has an app in `config` still gets an entry here (an empty
/// `ProxyHandles`), so the caller swaps its stale table out for good
/// rather than leaving it live forever — matching spec.md §4.10's
/// "installs an empty new table" requirement. The caller (`main.rs`) is
/// responsible for swapping these into the live `GatewayApp`s and for
/// dropping the old `Arc<ProxyHandles>` values only once every swap is
/// done — the old `ServiceRegistry`'s probe tasks stop when that last Arc
/// is dropped.
pub fn reload(
    config: &Config,
    known_ports: &[u16],
) -> Result<HashMap<u16, (Arc<ProxyHandles>, Option<(String, String)>)>, ConfigError> {
    info!("reloading configuration");
    let mut handles = build_handles(config)?;
    for &port in known_ports {
        handles.entry(port).or_insert_with(empty_handles);
    }
    Ok(handles)
}

fn empty_handles() -> (Arc<ProxyHandles>, Option<(String, String)>) {
    let handles = Arc::new(ProxyHandles {
        domains: HashMap::new(),
        logfmts: LogfmtRegistry::from_config(&[]),
        syslog: Arc::new(SysLogSink::from_config(None)),
    });
    (handles, None)
}
