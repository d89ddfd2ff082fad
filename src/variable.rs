//! Per-request variable store and `$name` template expansion.
//!
//! Grounded on `original_source/server/variable.go`: a flat string->string map,
//! read-heavy during templating and access logging, written once per rule
//! match (regex captures) and once per header transform (gate captures).

use std::collections::HashMap;
use std::sync::RwLock;

/// Concurrency-safe string->string map, one per in-flight request.
///
/// Readers (template expansion, logging) vastly outnumber the single writer
/// (the request's own matching/transform code), so a plain reader-preferring
/// `RwLock` is sufficient — see spec.md §9's design note on this exact point.
#[derive(Default)]
pub struct VariableStore {
    data: RwLock<HashMap<String, String>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut data = self.data.write().unwrap();
        data.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().unwrap().get(key).cloned()
    }

    /// Set `$0..$n` from a regex match's capture groups, mirroring
    /// `original_source/server/handle.go`'s `c.variables.Set(fmt.Sprintf("%d", i), ge)`.
    pub fn set_captures(&self, captures: &regex::Captures) {
        let mut data = self.data.write().unwrap();
        for (i, group) in captures.iter().enumerate() {
            if let Some(m) = group {
                data.insert(i.to_string(), m.as_str().to_string());
            }
        }
    }

    /// Expand every `$name` token in `template` against the current snapshot.
    /// Missing keys are left as a literal `$name` (fail-soft, no error).
    /// Expansion is a single pass: a substituted value is never re-expanded.
    pub fn expand(&self, template: &str) -> String {
        let data = self.data.read().unwrap();
        expand_with(template, &data)
    }

    /// Snapshot all entries, used by access-log line rendering.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.data.read().unwrap().clone()
    }
}

/// Standalone expansion helper over an already-collected map, so log sinks
/// can render lines without holding the store's lock for the full request
/// lifetime.
pub fn expand_with(template: &str, data: &HashMap<String, String>) -> String {
    if !template.contains('$') {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && is_ident_byte(bytes[end]) {
                end += 1;
            }
            if end > start {
                let key = &template[start..end];
                match data.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('$');
                        out.push_str(key);
                    }
                }
                i = end;
                continue;
            }
        }
        let ch = template[i..].chars().next().expect("i < bytes.len() implies a char remains");
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_is_identity_without_dollar() {
        let store = VariableStore::new();
        store.set("name", "world");
        assert_eq!(store.expand("hello world"), "hello world");
    }

    #[test]
    fn expand_substitutes_known_keys() {
        let store = VariableStore::new();
        store.set("1", "users");
        assert_eq!(store.expand("http://svc/$1"), "http://svc/users");
    }

    #[test]
    fn expand_leaves_unknown_keys_literal() {
        let store = VariableStore::new();
        assert_eq!(store.expand("$missing"), "$missing");
    }

    #[test]
    fn expand_does_not_recurse_into_substituted_value() {
        let store = VariableStore::new();
        store.set("a", "$b");
        store.set("b", "leaked");
        assert_eq!(store.expand("$a"), "$b");
    }

    #[test]
    fn expand_preserves_multibyte_literal_text() {
        let store = VariableStore::new();
        store.set("name", "café");
        assert_eq!(store.expand("bienvenue à $name"), "bienvenue à café");
    }

    #[test]
    fn set_captures_writes_numbered_variables() {
        let store = VariableStore::new();
        let re = regex::Regex::new(r"^/api/(?P<rest>.*)$").unwrap();
        let caps = re.captures("/api/users").unwrap();
        store.set_captures(&caps);
        assert_eq!(store.get("0").as_deref(), Some("/api/users"));
        assert_eq!(store.get("1").as_deref(), Some("users"));
    }
}
