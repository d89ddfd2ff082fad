//! Per-app domain table, grounded on
//! `original_source/server/handle.go::ProxyHandles` / `ProxyDomain`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Domain;
use crate::logging::{AccessLog, LogfmtRegistry, SysLogSink};
use crate::matching::CompiledRule;
use crate::service::ServiceRegistry;

/// One configured domain: its rules in declaration order (first match
/// wins), its own access/error logs, and the service registry it resolves
/// targets against (app-level services with a fallback to the global set).
pub struct ProxyDomain {
    pub rules: Vec<CompiledRule>,
    pub access_log: AccessLog,
    pub error_log: AccessLog,
    pub registry: Arc<ServiceRegistry>,
}

impl ProxyDomain {
    pub fn build(
        domain: &Domain,
        access_log_cfg: Option<&crate::config::Log>,
        error_log_cfg: Option<&crate::config::Log>,
        registry: Arc<ServiceRegistry>,
    ) -> Result<Self, regex::Error> {
        let rules = domain
            .rules
            .iter()
            .map(CompiledRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProxyDomain {
            rules,
            access_log: AccessLog::new(access_log_cfg),
            error_log: AccessLog::new(error_log_cfg),
            registry,
        })
    }
}

/// Host-header-keyed dispatch table for one listening app, plus the
/// logfmt registry and syslog sink shared by every domain under it.
pub struct ProxyHandles {
    pub domains: HashMap<String, Arc<ProxyDomain>>,
    pub logfmts: LogfmtRegistry,
    pub syslog: Arc<SysLogSink>,
}

impl ProxyHandles {
    /// `host_header` is the raw `Host` request header; the port suffix (if
    /// any) is stripped before the domain lookup, matching
    /// `ProxyHandles.match`'s `strings.Split(host, ":")[0]`.
    pub fn lookup(&self, host_header: &str) -> Option<Arc<ProxyDomain>> {
        let host = host_header.split(':').next().unwrap_or(host_header);
        self.domains.get(host).cloned()
    }
}
