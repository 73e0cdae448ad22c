//! Log directory resolution.
//!
//! Operator-supplied directories are confined to the application root. The
//! check is lexical so it works before the directory exists.

use std::path::{Component, Path, PathBuf};

/// Default log directory, relative to the application root.
pub const DEFAULT_LOG_SUBDIR: &str = "logs";

/// Resolve a log directory override against `root`.
///
/// Relative overrides are joined onto `root`. Anything that escapes `root`
/// after normalization is rejected and `<root>/logs` is returned instead.
pub fn resolve_log_dir(root: &Path, override_dir: Option<&str>) -> PathBuf {
    let root = normalize(root);
    let default_dir = root.join(DEFAULT_LOG_SUBDIR);

    let Some(raw) = override_dir.map(str::trim).filter(|s| !s.is_empty()) else {
        return default_dir;
    };

    let candidate = Path::new(raw);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    match normalize_within(&joined, &root) {
        Some(resolved) => resolved,
        None => {
            tracing::warn!(
                requested = %raw,
                fallback = %default_dir.display(),
                "Log directory escapes application root, using default"
            );
            default_dir
        }
    }
}

fn normalize_within(path: &Path, root: &Path) -> Option<PathBuf> {
    let normalized = normalize_strict(path)?;
    normalized.starts_with(root).then_some(normalized)
}

/// Lexically normalize, failing when `..` climbs above the path's start.
fn normalize_strict(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_strict(&absolute).unwrap_or(absolute)
}
