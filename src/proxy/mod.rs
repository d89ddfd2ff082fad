//! Proxy dispatch: domain table, rule matching, and the `ProxyHttp` impl
//! that ties routing, balancing, and header transforms to pingora.

pub mod domain;
pub mod gateway;

pub use domain::{ProxyDomain, ProxyHandles};
pub use gateway::GatewayApp;
