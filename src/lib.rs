//! # chatgpt-md-export
//!
//! Converts a ChatGPT data export (`conversations.json`) into one Markdown
//! file per conversation.
//!
//! ## What it does
//!
//! Each exported conversation stores its messages as a tree of nodes keyed by
//! id. This crate finds the root, follows the first-child path to recover the
//! conversation in order, and renders it as a standalone Markdown document
//! with a title, a creation timestamp, and one labelled section per message.
//! Citation markers left behind by web-browsing answers are stripped.
//!
//! ## Incremental export
//!
//! Conversations already converted in an earlier run are skipped. The ids are
//! tracked in a small ledger (`.converted-ids.json`) in the output directory;
//! with positional filenames (`2023-12-25_python-tips_<id>.md`) they are also
//! read back out of the filenames. Existing files are never overwritten.
//!
//! ## Usage
//!
//! ```sh
//! # Convert ./conversations.json into ./ChatGPT
//! chatgpt-md-export
//!
//! # Explicit paths, date/id filenames, plain layout
//! chatgpt-md-export ~/notes/chatgpt --input ~/Downloads/conversations.json \
//!     --naming positional --style plain
//! ```
//!
//! Preferences can be persisted in `~/.config/chatgpt-md-export/config.toml`.
//!
//! ## Library use
//!
//! ```no_run
//! use chatgpt_md_export::batch::{ConvertOptions, RunState, process_all};
//! use chatgpt_md_export::importer::load_export;
//!
//! let entries = load_export("conversations.json".as_ref())?;
//! let mut state = RunState::new();
//! let report = process_all(&entries, &mut state, &ConvertOptions::default());
//! for file in &report.files {
//!     println!("{} ({} bytes)", file.filename, file.content.len());
//! }
//! # Ok::<(), eyre::Report>(())
//! ```
pub mod batch;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod naming;
pub mod renderer;
pub mod sanitize;
pub mod utils;
pub mod walker;

pub use batch::{BatchReport, ConvertOptions, EntryOutcome, FileRecord, RunState, process_all};
pub use error::ConvertError;
pub use importer::Conversation;
