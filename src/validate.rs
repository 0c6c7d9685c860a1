//! Input validation for untrusted path and pattern strings.
//!
//! [`validate`] must run before a path string reaches the filesystem or a
//! process argument vector. It is a blunt deny-list check; retrieval
//! additionally canonicalizes the path with [`resolve_under_roots`] and
//! requires it to land under one of the configured roots.

use std::path::{Path, PathBuf};

use crate::error::{Result, RetrievalError};
use crate::models::ValidationVerdict;

/// Payloads of this length or shorter are rejected.
pub const MIN_LEN: usize = 4;

/// Upper bound on filter pattern length, in bytes.
pub const MAX_PATTERN_LEN: usize = 1024;

/// Fragments whose presence rejects a payload outright.
pub const DENY_LIST: [&str; 7] = ["../", "..", "/./", "/etc/", "/bin/", "/usr/", "/var/"];

/// Check a payload (normally a path) against the length floor, the optional
/// must-contain list, and the deny-list.
///
/// When `must_contain_any_of` is non-empty the payload must contain at least
/// one of its members as a substring.
pub fn validate(payload: &str, must_contain_any_of: Option<&[String]>) -> ValidationVerdict {
    if payload.len() <= MIN_LEN {
        log::debug!("rejecting payload '{}': too short", payload);
        return ValidationVerdict::reject(format!(
            "payload must be longer than {} characters",
            MIN_LEN
        ));
    }

    if let Some(required) = must_contain_any_of.filter(|r| !r.is_empty()) {
        if !required.iter().any(|needle| payload.contains(needle.as_str())) {
            log::warn!(
                "rejecting payload '{}': contains none of {:?}",
                payload,
                required
            );
            return ValidationVerdict::reject(format!(
                "payload must contain one of: {}",
                required.join(", ")
            ));
        }
    }

    if let Some(word) = denied_fragment(payload) {
        log::warn!("rejecting payload '{}': contains '{}'", payload, word);
        return ValidationVerdict::reject(format!("payload contains forbidden fragment '{}'", word));
    }

    ValidationVerdict::accept()
}

fn denied_fragment(s: &str) -> Option<&'static str> {
    DENY_LIST.iter().copied().find(|w| s.contains(w))
}

/// Check a filter pattern. Short patterns are legitimate, so only emptiness,
/// size, and control characters are refused.
pub fn validate_pattern(pattern: &str) -> ValidationVerdict {
    if pattern.is_empty() {
        return ValidationVerdict::reject("pattern must not be empty");
    }
    if pattern.len() > MAX_PATTERN_LEN {
        return ValidationVerdict::reject(format!(
            "pattern exceeds {} bytes",
            MAX_PATTERN_LEN
        ));
    }
    if pattern.contains(['\0', '\n', '\r']) {
        return ValidationVerdict::reject("pattern must not contain NUL or line breaks");
    }
    ValidationVerdict::accept()
}

/// Canonicalize `path` and confirm it resolves under one of `roots`.
///
/// An empty root list rejects every path without touching the filesystem.
/// Roots that do not exist are skipped. Symlinks are resolved before the
/// containment check, so a link pointing outside every root is rejected, and
/// the deny-list is applied again to the resolved path.
pub async fn resolve_under_roots(path: &str, roots: &[PathBuf]) -> Result<PathBuf> {
    if roots.is_empty() {
        log::warn!("rejecting '{}': no allowed log directories configured", path);
        return Err(RetrievalError::rejected(
            path,
            "no allowed log directories are configured",
        ));
    }

    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| RetrievalError::inaccessible(PathBuf::from(path), e))?;

    let mut contained = false;
    for root in roots {
        let Ok(root) = tokio::fs::canonicalize(root).await else {
            log::debug!("allowed root {} does not exist, skipping", root.display());
            continue;
        };
        if is_within(&resolved, &root) {
            contained = true;
            break;
        }
    }

    if !contained {
        log::warn!(
            "rejecting '{}': resolves to {} outside allowed roots",
            path,
            resolved.display()
        );
        return Err(RetrievalError::rejected(
            path,
            "path is outside the allowed log directories",
        ));
    }

    if let Some(word) = denied_fragment(&resolved.to_string_lossy()) {
        log::warn!(
            "rejecting '{}': resolves to {} which contains '{}'",
            path,
            resolved.display(),
            word
        );
        return Err(RetrievalError::rejected(
            path,
            format!("resolved path contains forbidden fragment '{}'", word),
        ));
    }

    Ok(resolved)
}

fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_payloads_rejected() {
        for p in ["", "a", "abc", "abcd"] {
            let verdict = validate(p, None);
            assert!(!verdict.accepted, "'{}' should be rejected", p);
            assert!(verdict.reason.unwrap().contains("longer than"));
        }
        assert!(validate("abcde", None).accepted);
    }

    #[test]
    fn test_plain_log_path_accepted() {
        assert_eq!(validate("/data/app.log", None), ValidationVerdict::accept());
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(!validate("../../etc/passwd", None).accepted);
        assert!(!validate("/data/../secret", None).accepted);
        assert!(!validate("/data/./app.log", None).accepted);
        assert!(!validate("/data/app..log", None).accepted);
    }

    #[test]
    fn test_system_dirs_rejected_even_when_required_prefix_present() {
        let required = vec!["/data/".to_string()];
        for p in ["/data/../etc/x", "/etc/data/x.log", "/bin/data/sh", "/data/usr/bin/x"] {
            let verdict = validate(p, Some(&required));
            assert!(!verdict.accepted, "'{}' should be rejected", p);
        }
        assert!(!validate("/var/log/app.log", None).accepted);
        assert!(!validate("/usr/local/app.log", None).accepted);
    }

    #[test]
    fn test_must_contain() {
        let required = vec!["/data/".to_string(), "/srv/logs/".to_string()];
        assert!(validate("/srv/logs/app.log", Some(&required)).accepted);
        assert!(validate("/data/app.log", Some(&required)).accepted);

        let verdict = validate("/home/user/app.log", Some(&required));
        assert!(!verdict.accepted);
        assert!(verdict.reason.unwrap().contains("must contain"));
    }

    #[test]
    fn test_empty_must_contain_is_ignored() {
        let required: Vec<String> = Vec::new();
        assert!(validate("/data/app.log", Some(&required)).accepted);
    }

    #[test]
    fn test_pattern_rules() {
        assert!(validate_pattern("a").accepted);
        assert!(validate_pattern("say \"hi\"").accepted);
        assert!(!validate_pattern("").accepted);
        assert!(!validate_pattern("x\ny").accepted);
        assert!(!validate_pattern(&"x".repeat(MAX_PATTERN_LEN + 1)).accepted);
    }

    #[tokio::test]
    async fn test_resolve_inside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("app.log");
        std::fs::write(&file, "line\n").unwrap();

        let roots = vec![tmp.path().to_path_buf()];
        let resolved = resolve_under_roots(file.to_str().unwrap(), &roots)
            .await
            .unwrap();
        assert_eq!(resolved, std::fs::canonicalize(&file).unwrap());
    }

    #[tokio::test]
    async fn test_resolve_outside_root_rejected() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let file = other.path().join("app.log");
        std::fs::write(&file, "line\n").unwrap();

        let roots = vec![allowed.path().to_path_buf()];
        let err = resolve_under_roots(file.to_str().unwrap(), &roots)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::ValidationRejected { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escaping_root_rejected() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let target = other.path().join("secret.log");
        std::fs::write(&target, "secret\n").unwrap();
        let link = allowed.path().join("innocent.log");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let roots = vec![allowed.path().to_path_buf()];
        let err = resolve_under_roots(link.to_str().unwrap(), &roots)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::ValidationRejected { .. }));
    }

    #[tokio::test]
    async fn test_resolve_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.log");
        let roots = vec![tmp.path().to_path_buf()];
        let err = resolve_under_roots(missing.to_str().unwrap(), &roots)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_no_roots_rejects_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("app.log");
        std::fs::write(&file, "line\n").unwrap();

        let err = resolve_under_roots(file.to_str().unwrap(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::ValidationRejected { .. }));

        // Rejected before canonicalization, so a missing file is not NotFound.
        let err = resolve_under_roots(tmp.path().join("nope.log").to_str().unwrap(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::ValidationRejected { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolved_path_checked_against_deny_list() {
        let tmp = tempfile::tempdir().unwrap();
        let etc = tmp.path().join("etc");
        std::fs::create_dir(&etc).unwrap();
        let target = etc.join("shadow.log");
        std::fs::write(&target, "secret\n").unwrap();
        let link = tmp.path().join("innocent.log");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(validate(link.to_str().unwrap(), None).accepted);

        let roots = vec![tmp.path().to_path_buf()];
        let err = resolve_under_roots(link.to_str().unwrap(), &roots)
            .await
            .unwrap_err();
        match err {
            RetrievalError::ValidationRejected { reason, .. } => {
                assert!(reason.contains("'/etc/'"), "got: {}", reason)
            }
            other => panic!("expected ValidationRejected, got {:?}", other),
        }
    }
}
