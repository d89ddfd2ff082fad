//! `@include "<glob-or-path>.json"` expansion, applied to the raw bytes of a
//! config file before JSON parsing, exactly as
//! `original_source/server/config.go::readIncludeFiles`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""@include ([a-zA-Z0-9_/\.\*\-]+\.json)""#).unwrap());

/// Read `path`, recursively expanding every `@include` token, and return the
/// fully-resolved JSON bytes.
pub fn read_include_files(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let path_str = path.to_string_lossy();
    if path_str.contains('*') {
        return read_fuzzy_files(&path_str, path.parent().unwrap_or(Path::new(".")));
    }

    let ext_ok = path.extension().map(|e| e == "json").unwrap_or(false);
    if !ext_ok {
        return Err(ConfigError::InvalidFileType(path.to_path_buf()));
    }

    let raw = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let current_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    expand_includes(&raw, &current_dir)
}

fn expand_includes(raw: &[u8], current_dir: &Path) -> Result<Vec<u8>, ConfigError> {
    let text = String::from_utf8_lossy(raw);
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;

    for caps in INCLUDE_RE.captures_iter(&text) {
        let whole = caps.get(0).unwrap();
        let include_path_str = caps.get(1).unwrap().as_str();

        out.push_str(&text[last_end..whole.start()]);

        let include_path = resolve_relative(include_path_str, current_dir);
        let included = read_include_files(&include_path)?;
        out.push_str(&String::from_utf8_lossy(&included));

        last_end = whole.end();
    }
    out.push_str(&text[last_end..]);

    Ok(out.into_bytes())
}

fn resolve_relative(include_path_str: &str, current_dir: &Path) -> PathBuf {
    let candidate = Path::new(include_path_str);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        current_dir.join(candidate)
    }
}

fn read_fuzzy_files(pattern: &str, _current_dir: &Path) -> Result<Vec<u8>, ConfigError> {
    let matches = glob::glob(pattern).map_err(|source| ConfigError::Glob {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut parts = Vec::new();
    for entry in matches {
        let matched_path = entry.map_err(|e| ConfigError::Io {
            path: e.path().to_path_buf(),
            source: std::io::Error::new(e.error().kind(), e.to_string()),
        })?;
        parts.push(read_include_files(&matched_path)?);
    }

    if parts.is_empty() {
        return Ok(b"null".to_vec());
    }

    let joined = parts
        .iter()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .collect::<Vec<_>>()
        .join(",");
    Ok(joined.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn plain_file_without_include_passes_through() {
        let dir = tempdir();
        let path = write_tmp(dir.path(), "plain.json", r#"{"apps":[]}"#);
        let out = read_include_files(&path).unwrap();
        assert_eq!(out, br#"{"apps":[]}"#);
    }

    #[test]
    fn include_token_is_replaced_with_file_contents() {
        let dir = tempdir();
        write_tmp(dir.path(), "child.json", r#"{"name":"svc"}"#);
        let parent = write_tmp(
            dir.path(),
            "parent.json",
            r#"{"services": ["@include child.json"]}"#,
        );
        let out = read_include_files(&parent).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, r#"{"services": {"name":"svc"}}"#);
    }

    #[test]
    fn non_json_extension_is_rejected() {
        let dir = tempdir();
        let path = write_tmp(dir.path(), "plain.txt", "{}");
        let err = read_include_files(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFileType(_)));
    }

    #[test]
    fn empty_glob_match_yields_null_literal() {
        let dir = tempdir();
        let out = read_fuzzy_files(
            &format!("{}/nonexistent-*.json", dir.path().display()),
            dir.path(),
        )
        .unwrap();
        assert_eq!(out, b"null");
    }

    // Minimal temp-dir helper so tests don't pull in an extra dev-dependency
    // for a single use.
    struct TempDir(PathBuf);
    impl TempDir {
        fn path(&self) -> &Path {
            &self.0
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
    fn tempdir() -> TempDir {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut p = std::env::temp_dir();
        p.push(format!("gatewayd-test-{}-{}", std::process::id(), n));
        std::fs::create_dir_all(&p).unwrap();
        TempDir(p)
    }
}
