use regex::Regex;
use std::sync::LazyLock;

/// Longest human-readable filename stem, in characters.
pub const MAX_FILENAME_CHARS: usize = 100;

const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

// Private-use-area markers (U+E000..U+F8FF) wrap citation tokens such as
// `\u{e200}cite\u{e202}turn0search2\u{e201}` in browsing-enabled exports.
static CITATION_MARKED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\x{E000}-\x{F8FF}]*(?:cite|navlist)[\x{E000}-\x{F8FF}]*.*?turn\d+(?:search|news)\d+[\x{E000}-\x{F8FF}]*\.?",
    )
    .expect("valid citation pattern")
});
static CITATION_TOKEN_MARKED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"turn\d+(?:search|news)\d+[\x{E000}-\x{F8FF}]*\.?")
        .expect("valid citation pattern")
});
static CITATION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"turn\d+(?:search|news)\d+\.?").expect("valid citation pattern")
});
static PRIVATE_USE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{E000}-\x{F8FF}]+").expect("valid citation pattern"));

static SLUG_DROPPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s-]").expect("valid slug pattern"));
static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid slug pattern"));

/// Lowercase, hyphen-delimited rendering of `text`.
///
/// Punctuation is dropped rather than turned into a separator, so
/// `"Special@#$%Characters"` becomes `"specialcharacters"`. Letters outside
/// ASCII are kept as they are; the result is not necessarily ASCII.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept = SLUG_DROPPED.replace_all(&lowered, "");
    let joined = SLUG_SEPARATORS.replace_all(&kept, "-");
    joined.trim_matches('-').to_string()
}

/// Make a title safe to use as a filename while keeping it readable.
pub fn clean_filename_text(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '.' | '-'))
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_FILENAME_CHARS).collect();
    truncated.trim_end().to_string()
}

/// Remove citation residue left behind by web-browsing answers.
///
/// The passes run from the widest pattern to the narrowest; each later pass
/// cleans up what an earlier one could only partially match.
pub fn strip_citation_artifacts(text: &str) -> String {
    let cleaned = CITATION_MARKED.replace_all(text, "");
    let cleaned = CITATION_TOKEN_MARKED.replace_all(&cleaned, "");
    let cleaned = CITATION_TOKEN.replace_all(&cleaned, "");
    PRIVATE_USE_RUN.replace_all(&cleaned, "").into_owned()
}

/// Backslash-escape characters that would otherwise start Markdown markup.
pub fn escape_markdown(text: &str) -> String {
    // Backslash first, so the escapes added below are not doubled.
    text.replace('\\', "\\\\")
        .replace('*', "\\*")
        .replace('_', "\\_")
        .replace('`', "\\`")
        .replace('[', "\\[")
        .replace(']', "\\]")
}
