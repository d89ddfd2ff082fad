//! Filter matching (spec.md §4.2), grounded on
//! `original_source/server/handle.go::ProxyHandleFilter.match`.

use regex::Regex;

use crate::error::MatchError;
use crate::variable::VariableStore;

/// A single header-equality predicate: `key` compared case-insensitively
/// against `value` (a `$name` template expanded against the current store).
pub struct CompiledHeaderFilter {
    pub key: String,
    pub value_template: String,
}

/// One filter: URI condition (disjunctive across regexes) AND header
/// condition (disjunctive across pairs). Either list may be empty, in which
/// case that condition is vacuously true.
pub struct CompiledFilter {
    pub uri_patterns: Vec<String>,
    pub headers: Vec<CompiledHeaderFilter>,
}

impl CompiledFilter {
    pub fn from_config(filter: &crate::config::Filter) -> Self {
        CompiledFilter {
            uri_patterns: filter.request_uris.clone(),
            headers: filter
                .headers
                .iter()
                .map(|h| CompiledHeaderFilter {
                    key: h.key.clone(),
                    value_template: h.value.clone(),
                })
                .collect(),
        }
    }

    /// `request_uri` is the scheme-less path+query (e.g. `/hello?x=1`).
    /// `header_lookup` resolves a request header by name (case-insensitive).
    ///
    /// On a match, capture groups from the first matching URI regex are
    /// written into `store` as `$0..$n`. A malformed regex is reported via
    /// `Err` and this filter is treated as a non-match by the caller — it
    /// does not abort the whole request (spec.md §4.2 fail-soft clause).
    pub fn matches(
        &self,
        store: &VariableStore,
        request_uri: &str,
        header_lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<bool, MatchError> {
        let uri_ok = if self.uri_patterns.is_empty() {
            true
        } else {
            let mut matched = false;
            for pattern in &self.uri_patterns {
                let re = Regex::new(pattern)?;
                if let Some(caps) = re.captures(request_uri) {
                    store.set_captures(&caps);
                    matched = true;
                }
            }
            matched
        };

        if !uri_ok {
            return Ok(false);
        }

        if self.headers.is_empty() {
            return Ok(true);
        }

        for header in &self.headers {
            let expected = store.expand(&header.value_template);
            if let Some(actual) = header_lookup(&header.key) {
                if expected.eq_ignore_ascii_case(&actual) {
                    return Ok(true);
                }
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
    fn empty_filter_matches_unconditionally() {
        let store = VariableStore::new();
        let filter = CompiledFilter {
            uri_patterns: vec![],
            headers: vec![],
        };
        assert!(filter.matches(&store, "/anything", |_| None).unwrap());
    }

    #[test]
    fn uri_regex_writes_numbered_captures() {
        let store = VariableStore::new();
        let filter = CompiledFilter::from_config(&config::Filter {
            request_uris: vec![r"^/api/(.*)$".to_string()],
            headers: vec![],
        });
        assert!(filter.matches(&store, "/api/users", |_| None).unwrap());
        assert_eq!(store.get("1").as_deref(), Some("users"));
    }

    #[test]
    fn header_condition_is_case_insensitive_after_expansion() {
        let store = VariableStore::new();
        let filter = CompiledFilter::from_config(&config::Filter {
            request_uris: vec![],
            headers: vec![config::HeaderFilter {
                key: "X-Env".to_string(),
                value: "PRODUCTION".to_string(),
            }],
        });
        let matched = filter
            .matches(&store, "/", |k| {
                if k == "X-Env" {
                    Some("production".to_string())
                } else {
                    None
                }
            })
            .unwrap();
        assert!(matched);
    }

    #[test]
    fn bad_regex_is_reported_as_error_not_panic() {
        let store = VariableStore::new();
        let filter = CompiledFilter {
            uri_patterns: vec!["(unclosed".to_string()],
            headers: vec![],
        };
        assert!(filter.matches(&store, "/x", |_| None).is_err());
    }
}
