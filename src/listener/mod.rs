//! Listener/reload coordination (spec.md §4.9, §4.10).

pub mod reload;

pub use reload::build_handles;
