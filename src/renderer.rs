use serde::Deserialize;
use std::fmt::{self, Write};

use crate::error::ConvertError;
use crate::importer::Conversation;
use crate::sanitize::{escape_markdown, strip_citation_artifacts};
use crate::utils::Clock;
use crate::walker::{ExtractedMessage, extract_messages};

/// Layout of the generated document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderStyle {
    /// `# Title` heading, `**User:**` labels, message text verbatim.
    Plain,
    /// Bold title label, emoji labels, every message as a `>` blockquote.
    #[default]
    Blockquote,
}

impl RenderStyle {
    fn created_pattern(self) -> &'static str {
        match self {
            RenderStyle::Plain => "%Y-%m-%d %H:%M:%S",
            RenderStyle::Blockquote => "%Y-%m-%d, %H:%M:%S",
        }
    }

    fn author_label(self, message: &ExtractedMessage) -> &'static str {
        match (self, message.is_user()) {
            (RenderStyle::Plain, true) => "**User:**",
            (RenderStyle::Plain, false) => "**Assistant:**",
            (RenderStyle::Blockquote, true) => "**🧑‍💬 User**",
            (RenderStyle::Blockquote, false) => "**🤖 Assistant**",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub style: RenderStyle,
    /// Backslash-escape Markdown markup inside message bodies.
    pub escape: bool,
    pub clock: Clock,
}

/// Render a conversation to a complete Markdown document.
pub fn render(
    conversation: &Conversation,
    options: &RenderOptions,
) -> Result<String, ConvertError> {
    let messages = extract_messages(&conversation.mapping);
    render_messages(conversation, &messages, options)
}

/// Render already-extracted messages under the conversation's header.
///
/// Citation residue is stripped from the assembled document rather than per
/// message, so markers split across message boundaries are caught too.
pub fn render_messages(
    conversation: &Conversation,
    messages: &[ExtractedMessage],
    options: &RenderOptions,
) -> Result<String, ConvertError> {
    let created = options
        .clock
        .format(conversation.create_time, options.style.created_pattern())
        .ok_or_else(|| {
            ConvertError::render(
                &conversation.id,
                format!("create_time {} is out of range", conversation.create_time),
            )
        })?;

    let mut doc = String::new();
    write_markdown(&mut doc, &conversation.title, &created, messages, options)
        .map_err(|e| ConvertError::render(&conversation.id, e))?;
    Ok(strip_citation_artifacts(&doc))
}

fn write_markdown<W: Write>(
    writer: &mut W,
    title: &str,
    created: &str,
    messages: &[ExtractedMessage],
    options: &RenderOptions,
) -> fmt::Result {
    let style = options.style;

    // 1. Header
    match style {
        RenderStyle::Plain => writeln!(writer, "# {}", title)?,
        RenderStyle::Blockquote => writeln!(writer, "**{}**", title)?,
    }
    writeln!(writer)?;
    writeln!(writer, "**Created:** {}", created)?;
    writeln!(writer)?;
    writeln!(writer, "---")?;
    writeln!(writer)?;

    // 2. Messages
    for message in messages {
        writeln!(writer, "{}", style.author_label(message))?;
        writeln!(writer)?;

        let body = if options.escape {
            escape_markdown(&message.content)
        } else {
            message.content.clone()
        };
        match style {
            RenderStyle::Plain => writeln!(writer, "{}", body)?,
            RenderStyle::Blockquote => writeln!(writer, "{}", blockquote(&body))?,
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Prefix every line with `> `; blank lines become a bare `>` so the quote stays unbroken.
pub fn blockquote(content: &str) -> String {
    content
        .split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
