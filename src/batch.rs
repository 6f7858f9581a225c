use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::ConvertError;
use crate::importer::{Conversation, json_kind};
use crate::naming::{FilenameRegistry, NamingMode, filename_for};
use crate::renderer::{RenderOptions, render};

/// Settings shared by every conversation in a batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConvertOptions {
    pub naming: NamingMode,
    pub render: RenderOptions,
}

/// State carried across batches: which conversations were already converted
/// and which filenames are taken.
///
/// The caller owns it; pass the same value to successive batches to keep
/// suppressing duplicates.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    seen_ids: HashSet<String>,
    filenames: FilenameRegistry,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seen_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seen_ids: ids.into_iter().map(Into::into).collect(),
            filenames: FilenameRegistry::new(),
        }
    }

    pub fn reserve_filenames<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filenames.reserve(names);
    }

    pub fn is_seen(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    pub fn seen_ids(&self) -> &HashSet<String> {
        &self.seen_ids
    }

    pub fn filenames(&self) -> &FilenameRegistry {
        &self.filenames
    }
}

/// A rendered document and where it should be written.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub filename: String,
    pub content: String,
    pub title: String,
    pub conversation_id: String,
    pub create_time: f64,
}

/// What happened to one entry.
#[derive(Debug)]
pub enum EntryOutcome {
    Recorded { id: String, filename: String },
    Skipped { id: String },
    Errored(ConvertError),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Records in ascending `create_time` order.
    pub files: Vec<FileRecord>,
    /// Structural errors first (input order), then the sorted entries.
    pub outcomes: Vec<EntryOutcome>,
}

impl BatchReport {
    fn record_error(&mut self, error: ConvertError) {
        self.errors += 1;
        self.outcomes.push(EntryOutcome::Errored(error));
    }

    /// Move a recorded file into the error column after its write failed.
    pub fn record_write_failure(&mut self, error: ConvertError) {
        self.processed = self.processed.saturating_sub(1);
        self.record_error(error);
    }
}

/// An entry that passed the structural check, waiting for its turn.
struct Candidate<'a> {
    id: &'a str,
    create_time: f64,
    entry: &'a Value,
}

impl<'a> Candidate<'a> {
    fn from_entry(index: usize, entry: &'a Value) -> Result<Self, ConvertError> {
        let Some(fields) = entry.as_object() else {
            return Err(ConvertError::structural(
                index,
                format!("expected an object, found {}", json_kind(entry)),
            ));
        };
        let id = match fields.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.as_str(),
            Some(Value::String(_)) | Some(Value::Null) | None => {
                return Err(ConvertError::structural(index, "conversation has no id"));
            }
            Some(other) => {
                return Err(ConvertError::structural(
                    index,
                    format!("id must be a string, found {}", json_kind(other)),
                ));
            }
        };
        // Sort key only; a non-numeric value is rejected later, when decoding.
        let create_time = fields
            .get("create_time")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        Ok(Self {
            id,
            create_time,
            entry,
        })
    }
}

/// Convert a batch of raw export entries.
///
/// Entries are handled oldest first. An id already in `state` is skipped; a
/// successful conversion adds its id and filename to `state`. Failures are
/// counted and never stop the batch.
pub fn process_all(
    entries: &[Value],
    state: &mut RunState,
    options: &ConvertOptions,
) -> BatchReport {
    let mut report = BatchReport::default();

    let mut candidates = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match Candidate::from_entry(index, entry) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                warn!("Skipping invalid entry: {}", e);
                report.record_error(e);
            }
        }
    }

    // Stable: entries with equal timestamps keep their input order.
    candidates.sort_by(|a, b| a.create_time.total_cmp(&b.create_time));
    debug!("Processing {} conversations oldest first", candidates.len());

    for candidate in candidates {
        if state.is_seen(candidate.id) {
            debug!("Skipping {}: already converted", candidate.id);
            report.skipped += 1;
            report.outcomes.push(EntryOutcome::Skipped {
                id: candidate.id.to_string(),
            });
            continue;
        }

        match convert_entry(&candidate, state, options) {
            Ok(record) => {
                state.seen_ids.insert(record.conversation_id.clone());
                report.processed += 1;
                report.outcomes.push(EntryOutcome::Recorded {
                    id: record.conversation_id.clone(),
                    filename: record.filename.clone(),
                });
                report.files.push(record);
            }
            Err(e) => {
                warn!("Failed to convert: {}", e);
                report.record_error(e);
            }
        }
    }

    info!(
        "Batch done: {} processed, {} skipped, {} errors",
        report.processed, report.skipped, report.errors
    );
    report
}

fn convert_entry(
    candidate: &Candidate<'_>,
    state: &mut RunState,
    options: &ConvertOptions,
) -> Result<FileRecord, ConvertError> {
    let conversation = Conversation::from_entry(candidate.entry)
        .map_err(|e| ConvertError::render(candidate.id, e))?;
    let content = render(&conversation, &options.render)?;
    // Named only after rendering succeeded, so failures do not consume a name.
    let filename = filename_for(
        &conversation,
        options.naming,
        options.render.clock,
        &mut state.filenames,
    )?;

    Ok(FileRecord {
        filename,
        content,
        title: conversation.title,
        conversation_id: conversation.id,
        create_time: conversation.create_time,
    })
}
