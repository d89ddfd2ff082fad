//! Request/response matching and header-transform engine (spec.md §4.2, §4.6).

pub mod filter;
pub mod transform;

pub use filter::{CompiledFilter, CompiledHeaderFilter};
pub use transform::CompiledHeaderTransform;

use crate::config::Rule;
use crate::error::MatchError;
use crate::variable::VariableStore;

/// A config `Rule` with its filters and header transforms pre-compiled once
/// at load (and reload) time, matching the teacher's `gateway.rs` pattern of
/// compiling regexes once into a static table rather than per-request.
pub struct CompiledRule {
    pub filters: Vec<CompiledFilter>,
    pub target_template: String,
    pub transforms: Vec<CompiledHeaderTransform>,
}

impl CompiledRule {
    pub fn from_config(rule: &Rule) -> Result<Self, regex::Error> {
        Ok(CompiledRule {
            filters: rule.filters.iter().map(CompiledFilter::from_config).collect(),
            target_template: rule.to.clone(),
            transforms: rule
                .transform
                .iter()
                .flat_map(|t| &t.headers)
                .map(CompiledHeaderTransform::from_config)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    /// A rule matches if it has no filters at all, or if any one of its
    /// filters matches (§4.2: "the rule matches if ANY filter is satisfied").
    pub fn matches(
        &self,
        store: &VariableStore,
        request_uri: &str,
        header_lookup: impl Fn(&str) -> Option<String> + Copy,
    ) -> Result<bool, MatchError> {
        if self.filters.is_empty() {
            return Ok(true);
        }
        for filter in &self.filters {
            if filter.matches(store, request_uri, header_lookup)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    #[test]
    fn rule_with_no_filters_matches_everything() {
        let store = VariableStore::new();
        let rule = CompiledRule::from_config(&config::Rule {
            filters: vec![],
            to: "http://backend/".to_string(),
            transform: None,
        })
        .unwrap();
        assert!(rule.matches(&store, "/whatever", |_| None).unwrap());
    }

    #[test]
    fn rule_matches_if_any_filter_matches() {
        let store = VariableStore::new();
        let rule = CompiledRule::from_config(&config::Rule {
            filters: vec![
                config::Filter {
                    request_uris: vec!["^/nope$".to_string()],
                    headers: vec![],
                },
                config::Filter {
                    request_uris: vec!["^/yes$".to_string()],
                    headers: vec![],
                },
            ],
            to: "http://backend/".to_string(),
            transform: None,
        })
        .unwrap();
        assert!(rule.matches(&store, "/yes", |_| None).unwrap());
    }
}
