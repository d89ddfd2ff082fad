//! Target resolution (spec.md §4.3), grounded on
//! `original_source/server/handle.go::ProxyTarget.load/balance`.

use crate::error::BalanceError;
use crate::service::ServiceRegistry;
use crate::variable::VariableStore;

/// A rule's `to` template resolved against a request's variable store and
/// then balanced to a concrete `host:port` (or left as a literal host).
///
/// Preserves the original's host-literal heuristic: any of `. & :` in the
/// expanded host bypasses service-registry lookup entirely and is used
/// verbatim. This looks like it would misfire on a bare dotted hostname
/// that is *also* a registered service name, but that's carried over
/// unchanged from the source behavior rather than "fixed" here.
pub struct Target {
    pub scheme: String,
    pub host: String,
    pub path: String,
}

impl Target {
    /// `to_template` is the rule's `to` field, e.g. `http://my-service/$1`.
    pub fn resolve(
        to_template: &str,
        store: &VariableStore,
        registry: &ServiceRegistry,
    ) -> Result<Self, BalanceError> {
        let expanded = store.expand(to_template);
        let (scheme, rest) = split_scheme(&expanded);
        let (host_part, path) = split_host_path(rest);

        let host = if is_literal_host(host_part) {
            host_part.to_string()
        } else {
            registry.balance_host(host_part)?
        };

        Ok(Target {
            scheme: scheme.to_string(),
            host,
            path: path.to_string(),
        })
    }
}

/// A host segment containing any of `.`, `&`, or `:` is treated as an
/// already-literal address (dotted IP/hostname, or an explicit port), never
/// as a service name to look up.
fn is_literal_host(host: &str) -> bool {
    host.contains('.') || host.contains('&') || host.contains(':')
}

fn split_scheme(uri: &str) -> (&str, &str) {
    match uri.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", uri),
    }
}

fn split_host_path(rest: &str) -> (&str, &str) {
    match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Host, Service};

    fn registry_with(name: &str, host: &str) -> ServiceRegistry {
        ServiceRegistry::build(
            &[Service {
                name: name.to_string(),
                hosts: vec![Host {
                    host: host.to_string(),
                    weight: 1,
                    checks: vec![],
                }],
                checks: vec![],
            }],
            None,
        )
    }

    #[test]
    fn service_name_host_is_resolved_through_registry() {
        let store = VariableStore::new();
        let registry = registry_with("backend", "10.0.0.1:9000");
        let target = Target::resolve("http://backend/api", &store, &registry).unwrap();
        assert_eq!(target.host, "10.0.0.1:9000");
        assert_eq!(target.path, "/api");
    }

    #[test]
    fn literal_dotted_host_bypasses_registry() {
        let store = VariableStore::new();
        let registry = ServiceRegistry::build(&[], None);
        let target = Target::resolve("http://example.com/x", &store, &registry).unwrap();
        assert_eq!(target.host, "example.com");
    }

    #[test]
    fn captures_are_interpolated_before_split() {
        let store = VariableStore::new();
        store.set("1", "users");
        let registry = registry_with("backend", "10.0.0.1:9000");
        let target = Target::resolve("http://backend/$1", &store, &registry).unwrap();
        assert_eq!(target.path, "/users");
    }

    #[test]
    fn unknown_service_name_errors() {
        let store = VariableStore::new();
        let registry = ServiceRegistry::build(&[], None);
        assert!(Target::resolve("http://ghost/", &store, &registry).is_err());
    }
}
