use crate::paths::normalize::{normalize_separators, trim_trailing_separators};

/// Compute the part of `path` that lies below the installed-assets root.
///
/// `marker` is the root's directory name (`StreamingAssets`); surrounding slashes are optional.
/// Returns `None` when no path segment matches the marker, `Some("")` when `path` is the root
/// itself, and the forward-slash remainder otherwise. The last occurrence wins so nested copies
/// of the marker resolve to the innermost root.
pub fn installed_root_remainder(path: &str, marker: &str) -> Option<String> {
    let marker = marker.trim_matches(['/', '\\']);
    if marker.is_empty() {
        return None;
    }

    let normalized = normalize_separators(path);
    let normalized = trim_trailing_separators(&normalized);
    let segments: Vec<&str> = normalized.split('/').collect();
    let position = segments.iter().rposition(|segment| *segment == marker)?;

    let remainder = segments[position + 1..]
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    Some(remainder)
}

/// Build the runtime token base for a root-relative remainder.
///
/// The result always uses single backslashes, which is how the path reads after the catalog's
/// JSON has been parsed at runtime.
pub fn token_base(token: &str, remainder: &str) -> String {
    let remainder = remainder.trim_matches(['/', '\\']);
    if remainder.is_empty() {
        token.to_string()
    } else {
        format!("{token}\\{}", remainder.replace('/', "\\"))
    }
}

/// Double every backslash so the value can be spliced into a JSON string literal.
pub fn json_escape_backslashes(value: &str) -> String {
    value.replace('\\', "\\\\")
}
