//! Weighted load balancing and active health checks (spec.md §4.4, §4.5).

pub mod pool;
pub mod probe;
pub mod registry;

pub use pool::ServicePool;
pub use registry::ServiceRegistry;
