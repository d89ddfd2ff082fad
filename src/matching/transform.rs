//! Header transform pipeline (spec.md §4.6), grounded on
//! `original_source/server/handle.go::ProxyHeaderTransform.processRequest/processResponse`.

use regex::Regex;

use crate::config::{HeaderMethod, When};
use crate::variable::VariableStore;

pub struct CompiledHeaderTransform {
    pub when: When,
    pub method: HeaderMethod,
    pub key: String,
    pub value_template: Option<String>,
    pub pattern: Option<Regex>,
}

impl CompiledHeaderTransform {
    pub fn from_config(t: &crate::config::HeaderTransform) -> Result<Self, regex::Error> {
        let pattern = match &t.pattern {
            Some(p) => Some(Regex::new(p)?),
            None => None,
        };
        Ok(CompiledHeaderTransform {
            when: t.when,
            method: t.method,
            key: t.key.clone(),
            value_template: t.value.clone(),
            pattern,
        })
    }

    /// Apply this transform to one side of a request/response via the
    /// `get`/`add`/`set`/`del` header callbacks. Returns without effect if
    /// `when` doesn't match the caller's side, or if a gate `pattern` is set
    /// and the current header value is absent or doesn't match it.
    pub fn apply(
        &self,
        side: When,
        store: &VariableStore,
        get: impl Fn(&str) -> Option<String>,
        mut add: impl FnMut(&str, &str),
        mut set: impl FnMut(&str, &str),
        mut del: impl FnMut(&str),
    ) {
        if self.when != side {
            return;
        }

        if let Some(pattern) = &self.pattern {
            match get(&self.key) {
                Some(current) => match pattern.captures(&current) {
                    Some(caps) => store.set_captures(&caps),
                    None => return,
                },
                None => return,
            }
        }

        match self.method {
            HeaderMethod::Add => {
                let value = store.expand(self.value_template.as_deref().unwrap_or(""));
                add(&self.key, &value);
            }
            HeaderMethod::Set => {
                let value = store.expand(self.value_template.as_deref().unwrap_or(""));
                set(&self.key, &value);
            }
            HeaderMethod::Del => {
                del(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn compiled(cfg: config::HeaderTransform) -> CompiledHeaderTransform {
        CompiledHeaderTransform::from_config(&cfg).unwrap()
    }

    #[test]
    fn set_without_pattern_always_applies() {
        let store = VariableStore::new();
        let t = compiled(config::HeaderTransform {
            when: When::Request,
            method: HeaderMethod::Set,
            key: "X-Forwarded-Proto".to_string(),
            value: Some("https".to_string()),
            pattern: None,
        });

        let mut set_calls = Vec::new();
        t.apply(
            When::Request,
            &store,
            |_| None,
            |_, _| {},
            |k, v| set_calls.push((k.to_string(), v.to_string())),
            |_| {},
        );
        assert_eq!(set_calls, vec![("X-Forwarded-Proto".to_string(), "https".to_string())]);
    }

    #[test]
    fn gate_pattern_blocks_on_no_match() {
        let store = VariableStore::new();
        let t = compiled(config::HeaderTransform {
            when: When::Response,
            method: HeaderMethod::Del,
            key: "Set-Cookie".to_string(),
            value: None,
            pattern: Some("^session=".to_string()),
        });

        let mut del_calls = Vec::new();
        t.apply(
            When::Response,
            &store,
            |_| Some("other=1".to_string()),
            |_, _| {},
            |_, _| {},
            |k| del_calls.push(k.to_string()),
        );
        assert!(del_calls.is_empty());
    }

    #[test]
    fn gate_pattern_permits_on_match_and_writes_captures() {
        let store = VariableStore::new();
        let t = compiled(config::HeaderTransform {
            when: When::Response,
            method: HeaderMethod::Set,
            key: "X-Trace".to_string(),
            value: Some("$1".to_string()),
            pattern: Some(r"^trace-(\w+)$".to_string()),
        });

        let mut set_calls = Vec::new();
        t.apply(
            When::Response,
            &store,
            |_| Some("trace-abc123".to_string()),
            |_, _| {},
            |k, v| set_calls.push((k.to_string(), v.to_string())),
            |_| {},
        );
        assert_eq!(set_calls, vec![("X-Trace".to_string(), "abc123".to_string())]);
    }

    #[test]
    fn wrong_side_is_a_no_op() {
        let store = VariableStore::new();
        let t = compiled(config::HeaderTransform {
            when: When::Request,
            method: HeaderMethod::Del,
            key: "X-Debug".to_string(),
            value: None,
            pattern: None,
        });
        let mut del_calls = Vec::new();
        t.apply(
            When::Response,
            &store,
            |_| None,
            |_, _| {},
            |_, _| {},
            |k| del_calls.push(k.to_string()),
        );
        assert!(del_calls.is_empty());
    }
}
