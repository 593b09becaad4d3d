use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Directory segment that marks a virtual package path.
pub const VIRTUAL_SEGMENT: &str = "__virtual__";

/// Find the nearest file named `file_name` by walking up from `start`.
#[must_use]
pub fn find_up(start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Lexically normalize a path, folding `.` and `..` without touching the disk.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Render a directory as an importing context (`/dir/`).
#[must_use]
pub fn dir_context(dir: &Path) -> String {
    let mut s = dir.display().to_string();
    if !s.ends_with('/') && !s.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR);
    }
    s
}

/// Whether an importing context names a directory rather than a file.
#[must_use]
pub fn is_dir_context(issuer: &str) -> bool {
    issuer.ends_with('/') || issuer.ends_with(MAIN_SEPARATOR)
}

/// The directory relative specifiers are resolved against for `issuer`.
#[must_use]
pub fn issuer_dir(issuer: &str) -> PathBuf {
    let path = Path::new(issuer);
    if is_dir_context(issuer) {
        return normalize(path);
    }
    path.parent().map_or_else(|| PathBuf::from("."), normalize)
}

/// Map `<base>/__virtual__/<hash>/<depth>/<rest>` to `<base>/("../" * depth)/<rest>`.
///
/// Returns `None` for paths without a well-formed virtual segment.
#[must_use]
pub fn resolve_virtual(path: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    let idx = components
        .iter()
        .position(|c| c.as_os_str() == VIRTUAL_SEGMENT)?;

    // Hash and depth must follow the marker.
    let depth: usize = components
        .get(idx + 2)?
        .as_os_str()
        .to_str()?
        .parse()
        .ok()?;

    let mut target: PathBuf = components[..idx].iter().collect();
    for _ in 0..depth {
        target.pop();
    }
    for component in &components[idx + 3..] {
        target.push(component.as_os_str());
    }

    Some(target)
}
