//! Named log line templates, grounded on
//! `original_source/server/logger.go::ProxyLogfmts`.

use std::collections::HashMap;

use log::warn;

/// Lookup table of named line formats (e.g. `"combined"`, `"json"`), each a
/// list of `$name`-templated lines joined with `\n` when rendered. Looks
/// itself up by name, falling back to `"default"` with a warning if the
/// requested name isn't defined — mirrors `ProxyLogfmts.find`.
#[derive(Debug, Clone, Default)]
pub struct LogfmtRegistry {
    formats: HashMap<String, Vec<String>>,
}

impl LogfmtRegistry {
    pub fn from_config(entries: &[crate::config::Logfmt]) -> Self {
        let formats = entries
            .iter()
            .map(|e| (e.name.clone(), e.lines.clone()))
            .collect();
        LogfmtRegistry { formats }
    }

    pub fn find(&self, name: &str) -> Vec<String> {
        if let Some(lines) = self.formats.get(name) {
            return lines.clone();
        }
        if name != "default" {
            warn!("log format {name:?} not found, falling back to \"default\"");
        }
        self.formats.get("default").cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Logfmt;

    #[test]
    fn known_format_is_returned_verbatim() {
        let registry = LogfmtRegistry::from_config(&[Logfmt {
            name: "combined".to_string(),
            lines: vec!["$remote_ip $method $uri_path".to_string()],
        }]);
        assert_eq!(registry.find("combined"), vec!["$remote_ip $method $uri_path"]);
    }

    #[test]
    fn unknown_format_falls_back_to_default() {
        let registry = LogfmtRegistry::from_config(&[Logfmt {
            name: "default".to_string(),
            lines: vec!["$method $uri_path".to_string()],
        }]);
        assert_eq!(registry.find("nope"), vec!["$method $uri_path"]);
    }

    #[test]
    fn missing_default_yields_empty_lines() {
        let registry = LogfmtRegistry::from_config(&[]);
        assert!(registry.find("anything").is_empty());
    }
}
