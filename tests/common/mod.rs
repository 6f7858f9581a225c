//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chatgpt_md_export::naming::NamingMode;
use chatgpt_md_export::renderer::RenderStyle;
use chatgpt_md_export::utils::{Clock, ExportConfig};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Builder for a workspace holding a conversations.json and an output directory
pub struct ExportDirBuilder {
    temp_dir: TempDir,
    conversations: Vec<Value>,
}

impl ExportDirBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            conversations: Vec::new(),
        }
    }

    pub fn with_conversation(mut self, conversation: Value) -> Self {
        self.conversations.push(conversation);
        self
    }

    /// Add a pre-existing file to the output directory
    pub fn with_output_file(self, name: &str, content: &str) -> Self {
        let out = self.temp_dir.path().join("out");
        fs::create_dir_all(&out).expect("Failed to create output dir");
        fs::write(out.join(name), content).expect("Failed to write output file");
        self
    }

    pub fn build(self) -> ExportDir {
        let input = self.temp_dir.path().join("conversations.json");
        let raw = serde_json::to_string_pretty(&self.conversations).expect("serialize");
        fs::write(&input, raw).expect("Failed to write conversations.json");
        ExportDir {
            temp_dir: self.temp_dir,
        }
    }
}

pub struct ExportDir {
    temp_dir: TempDir,
}

impl ExportDir {
    pub fn input(&self) -> PathBuf {
        self.temp_dir.path().join("conversations.json")
    }

    pub fn output(&self) -> PathBuf {
        self.temp_dir.path().join("out")
    }

    pub fn config(&self, naming: NamingMode) -> ExportConfig {
        ExportConfig {
            input: self.input(),
            target_dir: self.output(),
            naming,
            style: RenderStyle::Plain,
            escape: false,
            clock: Clock::Utc,
            write_delay: Duration::ZERO,
            verbose: false,
            quiet: true,
        }
    }

    /// Replace conversations.json with new content
    pub fn rewrite_input(&self, conversations: &[Value]) {
        let raw = serde_json::to_string_pretty(conversations).expect("serialize");
        fs::write(self.input(), raw).expect("Failed to rewrite conversations.json");
    }

    /// Sorted names of the markdown files in the output directory
    pub fn markdown_files(&self) -> Vec<String> {
        list_markdown(&self.output())
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.output().join(name)).expect("Failed to read output file")
    }
}

pub fn list_markdown(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".md"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// A two-message conversation: the user says `question`, the assistant says `answer`
pub fn chat(id: &str, title: &str, create_time: i64, question: &str, answer: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "create_time": create_time,
        "mapping": {
            (format!("{id}-q")): {
                "message": {"author": {"role": "user"}, "content": {"parts": [question]}},
                "parent": null,
                "children": [format!("{id}-a")]
            },
            (format!("{id}-a")): {
                "message": {"author": {"role": "assistant"}, "content": {"parts": [answer]}},
                "parent": format!("{id}-q"),
                "children": []
            }
        }
    })
}
