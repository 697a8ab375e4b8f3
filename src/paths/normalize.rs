use std::path::Path;

/// Render a path with forward slashes only.
///
/// Variable values and catalog prefixes are compared textually, so every path that reaches them
/// goes through this first regardless of the platform separator.
pub fn normalize_separators(path: impl AsRef<Path>) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Strip trailing separators while keeping a bare root (`/`) intact.
pub fn trim_trailing_separators(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() && !path.is_empty() {
        &path[..1]
    } else {
        trimmed
    }
}

/// Convert a filesystem path into its `file://` URL form.
///
/// Unix absolute paths keep their leading slash (`file:///g/x`), drive-letter paths gain one
/// (`file:///C:/x`) and relative paths are appended as-is.
pub fn to_file_url(path: impl AsRef<Path>) -> String {
    let normalized = normalize_separators(path);
    let normalized = trim_trailing_separators(&normalized);
    if normalized.starts_with('/') {
        format!("file://{normalized}")
    } else if has_drive_prefix(normalized) {
        format!("file:///{normalized}")
    } else {
        format!("file://{normalized}")
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_windows_separators() {
        assert_eq!(
            normalize_separators("C:\\Game\\StreamingAssets\\Addr"),
            "C:/Game/StreamingAssets/Addr"
        );
    }

    #[test]
    fn trims_trailing_separators_but_keeps_root() {
        assert_eq!(trim_trailing_separators("/g/out//"), "/g/out");
        assert_eq!(trim_trailing_separators("C:\\out\\"), "C:\\out");
        assert_eq!(trim_trailing_separators("/"), "/");
        assert_eq!(trim_trailing_separators(""), "");
    }

    #[test]
    fn builds_file_urls_for_unix_paths() {
        assert_eq!(
            to_file_url("/g/StreamingAssets/Addr/Vanilla"),
            "file:///g/StreamingAssets/Addr/Vanilla"
        );
    }

    #[test]
    fn builds_file_urls_for_drive_paths() {
        assert_eq!(
            to_file_url("C:\\Game\\Addr\\Vanilla\\"),
            "file:///C:/Game/Addr/Vanilla"
        );
    }
}
