use chrono::{DateTime, Local, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::naming::{self, NamingMode};
use crate::renderer::RenderStyle;

/// Name of the file that records converted conversation ids in the output directory.
pub const SEEN_IDS_FILE: &str = ".converted-ids.json";

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub input: PathBuf,
    pub target_dir: PathBuf,
    pub naming: NamingMode,
    pub style: RenderStyle,
    pub escape: bool,
    pub clock: Clock,
    pub write_delay: Duration,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("conversations.json"),
            target_dir: PathBuf::from("ChatGPT"),
            naming: NamingMode::default(),
            style: RenderStyle::default(),
            escape: false,
            clock: Clock::default(),
            write_delay: Duration::from_millis(10),
            verbose: false,
            quiet: false,
        }
    }
}

// ── Timestamps ────────────────────────────────────────────────────────────────

/// Which wall clock timestamps are shown in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    Local,
    Utc,
}

impl Clock {
    /// Format epoch seconds with a strftime pattern.
    /// Returns `None` when the value is outside the representable range.
    pub fn format(self, epoch_secs: f64, pattern: &str) -> Option<String> {
        let dt = epoch_to_datetime(epoch_secs)?;
        Some(match self {
            Clock::Local => dt.with_timezone(&Local).format(pattern).to_string(),
            Clock::Utc => dt.format(pattern).to_string(),
        })
    }
}

fn epoch_to_datetime(epoch_secs: f64) -> Option<DateTime<Utc>> {
    if !epoch_secs.is_finite() {
        return None;
    }
    let whole = epoch_secs.floor();
    let nanos = ((epoch_secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

// ── Seen-id seeding ───────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Default)]
struct SeenIdLedger {
    ids: BTreeSet<String>,
}

/// Names of the `.md` files already present in the output directory.
pub fn existing_markdown_files(target_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(target_dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".md"))
        .collect()
}

/// Recover conversation ids from positional filenames (`date_slug_id.md`).
pub fn scan_positional_ids(target_dir: &Path) -> HashSet<String> {
    existing_markdown_files(target_dir)
        .iter()
        .filter_map(|name| naming::id_from_positional_filename(name))
        .map(str::to_string)
        .collect()
}

/// Read the id ledger. A missing ledger is an empty set; an unreadable one is an error,
/// since silently ignoring it would re-export everything.
pub fn load_seen_ids(target_dir: &Path) -> Result<HashSet<String>> {
    let path = target_dir.join(SEEN_IDS_FILE);
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let raw = fs::read_to_string(&path)
        .wrap_err_with(|| format!("Failed to read id ledger: {}", path.display()))?;
    let ledger: SeenIdLedger = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Failed to parse id ledger: {}", path.display()))?;
    Ok(ledger.ids.into_iter().collect())
}

pub fn save_seen_ids<'a>(
    target_dir: &Path,
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let ledger = SeenIdLedger {
        ids: ids.into_iter().map(str::to_string).collect(),
    };
    let path = target_dir.join(SEEN_IDS_FILE);
    let json = serde_json::to_string_pretty(&ledger).wrap_err("Failed to serialize id ledger")?;
    fs::write(&path, json)
        .wrap_err_with(|| format!("Failed to write id ledger: {}", path.display()))
}

/// Ids that earlier runs already converted into `target_dir`.
///
/// Title-mode filenames carry no id, so that mode relies on the ledger alone.
/// Positional mode also reads ids back out of the filenames.
pub fn seed_seen_ids(target_dir: &Path, mode: NamingMode) -> Result<HashSet<String>> {
    let mut ids = load_seen_ids(target_dir)?;
    if mode == NamingMode::Positional {
        ids.extend(scan_positional_ids(target_dir));
    }
    Ok(ids)
}
