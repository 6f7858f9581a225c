use eyre::{Context, Result};
use log::{debug, error, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::batch::{
    BatchReport, ConvertOptions, EntryOutcome, FileRecord, RunState, process_all,
};
use crate::error::ConvertError;
use crate::importer::load_export;
use crate::naming::NamingMode;
use crate::renderer::RenderOptions;
use crate::utils::{ExportConfig, existing_markdown_files, save_seen_ids, seed_seen_ids};

/// Final tallies of a run, after writing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl From<&BatchReport> for ExportSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            processed: report.processed,
            skipped: report.skipped,
            errors: report.errors,
        }
    }
}

/// Load the export, convert everything not seen before, and write the results.
pub fn execute(config: &ExportConfig) -> Result<ExportSummary> {
    fs::create_dir_all(&config.target_dir).wrap_err("Failed to create target dir")?;

    let entries = load_export(&config.input)?;

    let seeded = seed_seen_ids(&config.target_dir, config.naming)?;
    debug!("{} conversation ids already converted", seeded.len());
    let mut state = RunState::with_seen_ids(seeded.iter().cloned());
    if config.naming == NamingMode::Title {
        // Never overwrite a document from an earlier run.
        state.reserve_filenames(existing_markdown_files(&config.target_dir));
    }

    let options = ConvertOptions {
        naming: config.naming,
        render: RenderOptions {
            style: config.style,
            escape: config.escape,
            clock: config.clock,
        },
    };

    if !config.quiet {
        eprintln!(
            "Processing {} conversations in chronological order (oldest first)",
            entries.len()
        );
    }
    let mut report = process_all(&entries, &mut state, &options);
    for outcome in &report.outcomes {
        if let EntryOutcome::Skipped { id } = outcome
            && config.verbose
        {
            eprintln!("Skipped: {} (already converted)", id);
        }
    }

    let written = write_files(&mut report, config);

    let mut ledger: BTreeSet<&str> = seeded.iter().map(String::as_str).collect();
    ledger.extend(written.iter().map(String::as_str));
    if let Err(e) = save_seen_ids(&config.target_dir, ledger) {
        error!("{:#}", e);
        if !config.quiet {
            eprintln!("Warning: {:#}", e);
        }
    }

    let summary = ExportSummary::from(&report);
    if !config.quiet {
        print_summary(&summary, &config.target_dir);
    }
    Ok(summary)
}

/// Write every record; returns the ids that made it to disk.
fn write_files(report: &mut BatchReport, config: &ExportConfig) -> Vec<String> {
    let files = std::mem::take(&mut report.files);

    #[cfg(feature = "progress")]
    let pb = if config.quiet {
        indicatif::ProgressBar::hidden()
    } else {
        indicatif::ProgressBar::new(files.len() as u64)
    };

    let mut written = Vec::with_capacity(files.len());
    for (i, record) in files.iter().enumerate() {
        match write_record(record, &config.target_dir) {
            Ok(()) => {
                written.push(record.conversation_id.clone());
                if !config.quiet {
                    let line = format!("Converted: {} -> {}", record.title, record.filename);
                    #[cfg(feature = "progress")]
                    pb.println(line);
                    #[cfg(not(feature = "progress"))]
                    eprintln!("{}", line);
                }
            }
            Err(e) => {
                warn!("{}", e);
                if !config.quiet {
                    eprintln!("Error: {}", e);
                }
                report.record_write_failure(e);
            }
        }

        #[cfg(feature = "progress")]
        pb.inc(1);

        // Keeps modification times in creation order.
        if i + 1 < files.len() && !config.write_delay.is_zero() {
            std::thread::sleep(config.write_delay);
        }
    }

    #[cfg(feature = "progress")]
    pb.finish_and_clear();

    report.files = files;
    written
}

fn write_record(record: &FileRecord, target_dir: &Path) -> Result<(), ConvertError> {
    let path = target_dir.join(&record.filename);
    fs::write(&path, record.content.as_bytes())
        .map_err(|source| ConvertError::Write { path, source })
}

fn print_summary(summary: &ExportSummary, target_dir: &Path) {
    let shown = fs::canonicalize(target_dir).unwrap_or_else(|_| target_dir.to_path_buf());
    eprintln!();
    eprintln!("{}", "=".repeat(50));
    eprintln!("Summary:");
    eprintln!("   Processed: {} conversations", summary.processed);
    eprintln!("   Skipped:   {} conversations (already converted)", summary.skipped);
    if summary.errors > 0 {
        eprintln!("   Errors:    {} conversations", summary.errors);
    }
    eprintln!("   Output directory: {}", shown.display());
}
