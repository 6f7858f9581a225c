use serde::Deserialize;
use std::collections::HashSet;

use crate::error::ConvertError;
use crate::importer::Conversation;
use crate::sanitize::{clean_filename_text, slugify};
use crate::utils::Clock;

/// Fallback stem when a title has nothing filename-safe left in it.
pub const FALLBACK_STEM: &str = "Conversation";

const POSITIONAL_SLUG_MAX: usize = 50;

/// Characters a conversation id may not contain in positional mode: path
/// separators, and the `_` that delimits the filename segments.
const POSITIONAL_ID_FORBIDDEN: &[char] = &['/', '\\', '_'];

/// How output files are named.
///
/// Pick one per output directory: duplicate detection in positional mode
/// reads ids back out of the filenames, while title mode depends on the id
/// ledger written next to the files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// `Python Tips.md`, `Python Tips (2).md`, ...
    #[default]
    Title,
    /// `2023-12-25_python-tips_<conversation-id>.md`
    Positional,
}

/// Registry of filenames handed out so far in a run.
#[derive(Debug, Clone, Default)]
pub struct FilenameRegistry {
    used: HashSet<String>,
}

impl FilenameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark names as taken without allocating them, e.g. files already on disk.
    pub fn reserve<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.used.extend(names.into_iter().map(Into::into));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    fn claim(&mut self, name: String) -> String {
        self.used.insert(name.clone());
        name
    }
}

/// Human-readable filename for a conversation, unique within `registry`.
///
/// The chosen name is recorded in the registry, so later calls see it.
pub fn allocate_filename(
    conversation: &Conversation,
    registry: &mut FilenameRegistry,
) -> String {
    let mut base = clean_filename_text(&conversation.title);
    if base.is_empty() {
        base = FALLBACK_STEM.to_string();
    }

    let mut candidate = format!("{}.md", base);
    let mut counter = 2;
    while registry.contains(&candidate) {
        candidate = format!("{} ({}).md", base, counter);
        counter += 1;
    }
    registry.claim(candidate)
}

/// `{date}_{slug}_{id}.md`, with the slug capped at 50 characters.
///
/// Fails when the creation time cannot be represented as a date, or when the
/// id could not be read back out of the name (see [`id_from_positional_filename`]).
pub fn positional_filename(
    conversation: &Conversation,
    clock: Clock,
) -> Result<String, ConvertError> {
    if conversation.id.contains(POSITIONAL_ID_FORBIDDEN) {
        return Err(ConvertError::render(
            &conversation.id,
            "id contains '/', '\\' or '_' and cannot be used in a positional filename",
        ));
    }

    let date = clock
        .format(conversation.create_time, "%Y-%m-%d")
        .ok_or_else(|| {
            ConvertError::render(
                &conversation.id,
                format!("create_time {} is out of range", conversation.create_time),
            )
        })?;

    let slug: String = slugify(&conversation.title)
        .chars()
        .take(POSITIONAL_SLUG_MAX)
        .collect();
    let slug = slug.trim_end_matches('-');

    Ok(format!("{}_{}_{}.md", date, slug, conversation.id))
}

/// Allocate a name in the given mode and record it in `registry`.
pub fn filename_for(
    conversation: &Conversation,
    mode: NamingMode,
    clock: Clock,
    registry: &mut FilenameRegistry,
) -> Result<String, ConvertError> {
    match mode {
        NamingMode::Title => Ok(allocate_filename(conversation, registry)),
        NamingMode::Positional => {
            let name = positional_filename(conversation, clock)?;
            Ok(registry.claim(name))
        }
    }
}

/// The conversation id embedded in a positional filename, if it has one.
///
/// The id is the last `_`-separated segment of the stem; stems with fewer
/// than three segments are not positional names.
pub fn id_from_positional_filename(filename: &str) -> Option<&str> {
    let stem = filename.strip_suffix(".md")?;
    let segments: Vec<&str> = stem.split('_').collect();
    if segments.len() < 3 {
        return None;
    }
    segments.last().copied().filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conv(title: Option<&str>) -> Conversation {
        let mut entry = json!({"id": "abc123", "create_time": 1703522622});
        if let Some(title) = title {
            entry["title"] = json!(title);
        }
        Conversation::from_entry(&entry).unwrap()
    }

    #[test]
    fn title_filename() {
        let mut registry = FilenameRegistry::new();
        assert_eq!(
            allocate_filename(&conv(Some("Python Best Practices")), &mut registry),
            "Python Best Practices.md"
        );
    }

    #[test]
    fn duplicate_titles_get_counters() {
        let mut registry = FilenameRegistry::new();
        let tips = conv(Some("Python Tips"));
        assert_eq!(allocate_filename(&tips, &mut registry), "Python Tips.md");
        assert_eq!(allocate_filename(&tips, &mut registry), "Python Tips (2).md");
        assert_eq!(allocate_filename(&tips, &mut registry), "Python Tips (3).md");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn reserved_names_are_skipped() {
        let mut registry = FilenameRegistry::new();
        registry.reserve(["Tips.md", "Tips (2).md"]);
        assert_eq!(allocate_filename(&conv(Some("Tips")), &mut registry), "Tips (3).md");
    }

    #[test]
    fn missing_and_unusable_titles() {
        let mut registry = FilenameRegistry::new();
        assert_eq!(
            allocate_filename(&conv(None), &mut registry),
            "Untitled Conversation.md"
        );
        assert_eq!(allocate_filename(&conv(Some("")), &mut registry), "Conversation.md");
        assert_eq!(
            allocate_filename(&conv(Some("@#$%")), &mut registry),
            "Conversation (2).md"
        );
    }

    #[test]
    fn long_titles_are_truncated() {
        let mut registry = FilenameRegistry::new();
        let title = "This is an extremely long title that should be truncated \
                     because it exceeds reasonable limits for a file";
        let name = allocate_filename(&conv(Some(title)), &mut registry);
        assert!(name.ends_with(".md"));
        assert!(name.chars().count() <= 103);
    }

    #[test]
    fn positional_name_embeds_date_slug_and_id() {
        let conversation = conv(Some("Redis & Caching: Advanced!"));
        let name = positional_filename(&conversation, Clock::Utc).unwrap();
        assert_eq!(name, "2023-12-25_redis-caching-advanced_abc123.md");
        assert_eq!(id_from_positional_filename(&name), Some("abc123"));
    }

    #[test]
    fn positional_slug_is_capped() {
        let title = "word ".repeat(30);
        let name = positional_filename(&conv(Some(&title)), Clock::Utc).unwrap();
        let slug = name.split('_').nth(1).unwrap();
        assert!(slug.len() <= 50);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn positional_slug_is_capped_by_characters() {
        let title = "日本語".repeat(30);
        let name = positional_filename(&conv(Some(&title)), Clock::Utc).unwrap();
        let slug = name.split('_').nth(1).unwrap();
        assert_eq!(slug.chars().count(), 50);
        assert!(title.starts_with(slug));
        assert_eq!(id_from_positional_filename(&name), Some("abc123"));
    }

    #[test]
    fn positional_name_rejects_unsafe_ids() {
        for id in ["a/b", "a\\b", "a_b"] {
            let c = Conversation::from_entry(&json!({"id": id, "title": "T"})).unwrap();
            let err = positional_filename(&c, Clock::Utc).unwrap_err();
            assert!(matches!(err, ConvertError::Render { .. }), "{id}: {err}");
        }

        // Title mode does not embed the id, so any id is fine there.
        let c = Conversation::from_entry(&json!({"id": "a_b", "title": "T"})).unwrap();
        let mut registry = FilenameRegistry::new();
        assert_eq!(
            filename_for(&c, NamingMode::Title, Clock::Utc, &mut registry).unwrap(),
            "T.md"
        );
    }

    #[test]
    fn positional_name_with_empty_slug_still_parses() {
        let name = positional_filename(&conv(Some("!!!")), Clock::Utc).unwrap();
        assert_eq!(name, "2023-12-25__abc123.md");
        assert_eq!(id_from_positional_filename(&name), Some("abc123"));
    }

    #[test]
    fn non_positional_names_yield_no_id() {
        assert_eq!(id_from_positional_filename("Python Tips.md"), None);
        assert_eq!(id_from_positional_filename("a_b.md"), None);
        assert_eq!(id_from_positional_filename("a_b_c.txt"), None);
        assert_eq!(id_from_positional_filename("a_b_.md"), None);
    }

    #[test]
    fn filename_for_records_both_modes() {
        let mut registry = FilenameRegistry::new();
        let c = conv(Some("Tips"));
        let a = filename_for(&c, NamingMode::Positional, Clock::Utc, &mut registry).unwrap();
        let b = filename_for(&c, NamingMode::Title, Clock::Utc, &mut registry).unwrap();
        assert!(registry.contains(&a));
        assert!(registry.contains(&b));
    }
}
