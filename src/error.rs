use std::path::PathBuf;

/// Why a single export entry did not produce a written file.
///
/// None of these abort a batch; they are tallied in the report and the run
/// moves on to the next entry.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The entry is null, not a JSON object, or has no usable `id`.
    #[error("entry #{index}: {reason}")]
    Structural { index: usize, reason: String },

    /// The entry carries an id but could not be decoded or formatted.
    #[error("conversation {id}: {reason}")]
    Render { id: String, reason: String },

    /// The rendered document could not be persisted.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub(crate) fn structural(index: usize, reason: impl Into<String>) -> Self {
        Self::Structural {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn render(id: &str, reason: impl std::fmt::Display) -> Self {
        Self::Render {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}
