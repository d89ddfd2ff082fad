//! Named service registry with hierarchical (app -> global) fallback,
//! grounded on `original_source/server/service.go::ProxyServices`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Service;
use crate::error::BalanceError;
use crate::service::pool::ServicePool;
use crate::service::probe::{Probe, ResolvedCheck};

/// One level of the service hierarchy: a name -> pool map, plus an optional
/// parent to fall back to when a name isn't found locally (app-level
/// services shadow global ones; global services are visible to every app).
pub struct ServiceRegistry {
    pools: HashMap<String, Arc<ServicePool>>,
    parent: Option<Arc<ServiceRegistry>>,
    /// Dropped (and thus stopped, via `Probe`'s `Drop`) along with this
    /// registry level — a reload's old registry stops probing as soon as
    /// its last `Arc` is released.
    probes: Vec<Probe>,
}

impl ServiceRegistry {
    pub fn build(services: &[Service], parent: Option<Arc<ServiceRegistry>>) -> Self {
        let mut pools = HashMap::new();
        let mut probes = Vec::new();

        for service in services {
            let pool = Arc::new(ServicePool::new(service.name.clone(), service.hosts.clone()));

            for (host_index, host) in service.hosts.iter().enumerate() {
                let mut checks = service.checks.clone();
                checks.extend(host.checks.clone());
                for check in &checks {
                    let resolved = ResolvedCheck::from_config(check);
                    probes.push(Probe::spawn(pool.clone(), host_index, resolved));
                }
            }

            pools.insert(service.name.clone(), pool);
        }

        ServiceRegistry { pools, parent, probes }
    }

    /// Resolve `name` to a live host address, checking this level first and
    /// recursing into the parent on a miss (not on a live-host failure —
    /// an existing-but-fully-down service does not fall through to the
    /// parent, matching `ProxyServices.balanceHost`'s lookup semantics).
    pub fn balance_host(&self, name: &str) -> Result<String, BalanceError> {
        if let Some(pool) = self.pools.get(name) {
            return pool.balance().map(|s| s.to_string());
        }
        if let Some(parent) = &self.parent {
            return parent.balance_host(name);
        }
        Err(BalanceError::NoSuchService(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Host;

    fn service(name: &str, host: &str) -> Service {
        Service {
            name: name.to_string(),
            hosts: vec![Host {
                host: host.to_string(),
                weight: 1,
                checks: vec![],
            }],
            checks: vec![],
        }
    }

    #[test]
    fn resolves_local_service_before_checking_parent() {
        let parent = Arc::new(ServiceRegistry::build(&[service("shared", "parent-host")], None));
        let child = ServiceRegistry::build(&[service("local", "child-host")], Some(parent));
        assert_eq!(child.balance_host("local").unwrap(), "child-host");
    }

    #[test]
    fn falls_back_to_parent_when_name_not_found_locally() {
        let parent = Arc::new(ServiceRegistry::build(&[service("shared", "parent-host")], None));
        let child = ServiceRegistry::build(&[], Some(parent));
        assert_eq!(child.balance_host("shared").unwrap(), "parent-host");
    }

    #[test]
    fn unknown_name_with_no_parent_is_an_error() {
        let registry = ServiceRegistry::build(&[], None);
        assert!(matches!(
            registry.balance_host("missing"),
            Err(BalanceError::NoSuchService(_))
        ));
    }
}
