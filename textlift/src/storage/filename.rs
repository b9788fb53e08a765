use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::ALLOWED_EXTENSIONS;

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex is valid"))
}

/// Lower-cased extension after the last dot, if any.
pub fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

pub fn is_allowed(filename: &str) -> bool {
    extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a flat, ASCII-only name.
///
/// Accented letters are decomposed (NFKD) and lose their marks, other
/// non-ASCII characters are dropped. Path separators become word breaks,
/// whitespace runs collapse into a single `_`, everything outside
/// `[A-Za-z0-9_.-]` is removed and leading/trailing dots and underscores are
/// trimmed. The result may be empty.
pub fn sanitize(filename: &str) -> String {
    let ascii: String = filename.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let stripped = unsafe_chars().replace_all(&joined, "");
    stripped.trim_matches(|c| c == '.' || c == '_').to_string()
}
