//! Topic → file-name conversion.

use std::sync::LazyLock;

use regex::Regex;

/// Longest file stem produced, in characters.
pub const MAX_FILE_STEM_CHARS: usize = 50;

/// Stem used when nothing usable is left of the topic.
pub const FALLBACK_FILE_STEM: &str = "research";

/// Characters that are invalid in file names on at least one major platform.
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"));

/// Turn a topic into a safe file stem.
///
/// Strips `< > : " / \ | ? *`, replaces spaces with underscores and keeps
/// at most [`MAX_FILE_STEM_CHARS`] characters.
pub fn sanitize_filename(topic: &str) -> String {
    let stripped = UNSAFE_CHARS.replace_all(topic, "");
    let stem: String = stripped
        .replace(' ', "_")
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILE_STEM_CHARS)
        .collect();

    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        FALLBACK_FILE_STEM.to_string()
    } else {
        stem
    }
}
