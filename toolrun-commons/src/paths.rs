use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Returns true when both paths name the same location.
///
/// Lexically equal paths are accepted without touching the filesystem; otherwise
/// both sides are canonicalized so symlinked or relative spellings still match.
pub fn is_same_path(left: &Path, right: &Path) -> bool {
    if normalize_path(left) == normalize_path(right) {
        return true;
    }

    match (std::fs::canonicalize(left), std::fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

/// Translate a drive-letter path (`D:\tmp`, `d:/tmp`) into its Cygwin POSIX
/// spelling (`/d/tmp`). Only active on Cygwin hosts; elsewhere the input is
/// returned unchanged.
pub fn win_path_to_posix(path: &str) -> Cow<'_, str> {
    if cfg!(target_os = "cygwin") {
        drive_path_to_posix(path)
    } else {
        Cow::Borrowed(path)
    }
}

/// Unconditional form of [`win_path_to_posix`].
pub fn drive_path_to_posix(path: &str) -> Cow<'_, str> {
    let mut chars = path.chars();
    let (Some(letter), Some(':'), Some(separator)) = (chars.next(), chars.next(), chars.next())
    else {
        return Cow::Borrowed(path);
    };
    if !letter.is_ascii_alphabetic() || !matches!(separator, '/' | '\\') {
        return Cow::Borrowed(path);
    }

    let mut translated = format!("/{}", letter.to_ascii_lowercase());
    for part in chars.as_str().split(['/', '\\']).filter(|part| !part.is_empty()) {
        translated.push('/');
        translated.push_str(part);
    }
    Cow::Owned(translated)
}
