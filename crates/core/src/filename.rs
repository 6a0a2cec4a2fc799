//! Filesystem-safe names and vault path normalization.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

/// Upper bound on sanitized filename length, in characters.
pub const MAX_FILENAME_CHARS: usize = 120;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static MALFORMED_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%(?:[0-9A-Fa-f]?$|[0-9A-Fa-f]?[^0-9A-Fa-f])").unwrap());

/// Maps an arbitrary, possibly percent-encoded name to a safe filename.
///
/// Disallowed characters and control characters become `_`, whitespace runs
/// become a single `_`, and the result is cut to [`MAX_FILENAME_CHARS`].
/// The truncated string is then percent-decoded; a malformed escape or a
/// decode that is not UTF-8 keeps the undecoded string.
///
/// ```rust
/// use vaultclip_core::filename::sanitize_filename;
///
/// assert_eq!(sanitize_filename("my <bad> file?.png"), "my__bad__file_.png");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, "_");
    let replaced = WHITESPACE_RUN.replace_all(&replaced, "_");
    let truncated: String = replaced.chars().take(MAX_FILENAME_CHARS).collect();

    match decode_component(&truncated) {
        // Decoding can reintroduce separators; they must not escape the attachment directory.
        Some(decoded) => decoded.replace(['/', '\\', '\0'], "_"),
        None => truncated,
    }
}

fn decode_component(value: &str) -> Option<String> {
    if MALFORMED_ESCAPE.is_match(value) {
        return None;
    }
    percent_decode_str(value).decode_utf8().ok().map(|s| s.into_owned())
}

/// Normalizes a vault-relative path.
///
/// Backslashes become `/`, empty and `.` segments are dropped (so slash runs
/// collapse and leading and trailing slashes go) and non-breaking spaces
/// become plain spaces. An empty result is the vault root, `/`.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/").replace(['\u{00A0}', '\u{202F}'], " ");
    let segments: Vec<&str> = unified.split('/').filter(|segment| !matches!(*segment, "" | ".")).collect();

    if segments.is_empty() { "/".to_string() } else { segments.join("/") }
}
