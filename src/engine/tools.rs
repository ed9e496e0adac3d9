//! Path and filter utilities

use glob::{MatchOptions, Pattern};
use log::warn;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// True for paths anchored at a filesystem root. Archives only carry relative paths.
pub fn is_rooted(path: &Path) -> bool {
    path.is_absolute() || path.has_root()
}

/// Drop `.` components and trailing separators. An empty result becomes `.`.
/// `..` is kept as written; nothing touches the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let cleaned: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

/// Join a listed entry name onto its directory. Entries of `.` come out as bare names.
pub fn join_entry(dir: &Path, name: &OsStr) -> PathBuf {
    let dir = normalize_lexically(dir);
    if dir == Path::new(".") {
        PathBuf::from(name)
    } else {
        dir.join(name)
    }
}

/// Path as written to the stream: raw bytes on Unix, `/`-separated UTF-8 elsewhere.
#[cfg(unix)]
pub fn path_to_wire_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
pub fn path_to_wire_bytes(path: &Path) -> Cow<'_, [u8]> {
    Cow::Owned(path_to_wire_string(path).into_bytes())
}

/// Path as a `/`-separated string, used for pattern matching and logs.
pub fn path_to_wire_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Go `filepath.Match` rules: wildcards never cross `/`, dot files are not special.
const EXCLUDE_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compile exclude patterns once per run. Malformed patterns are logged and dropped.
pub fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| {
            Pattern::new(p)
                .map_err(|e| warn!("ignoring invalid exclude pattern {:?}: {}", p, e))
                .ok()
        })
        .collect()
}

/// True if the whole `/`-joined path matches any pattern. A pattern without `/` therefore only
/// matches single-component paths.
pub fn is_excluded(path: &Path, patterns: &[Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let path_str = path_to_wire_string(path);
    patterns
        .iter()
        .any(|pattern| pattern.matches_with(&path_str, EXCLUDE_MATCH))
}
