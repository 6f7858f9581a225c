use std::collections::HashSet;

use crate::importer::{MessageMap, MessageNode};

/// A single turn pulled out of the message tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMessage {
    pub author: String,
    pub content: String,
}

impl ExtractedMessage {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.author == "user"
    }
}

/// Linearize the conversation tree into display order.
///
/// Only the first-child path is followed, so regenerated answers on sibling
/// branches are not included. Nodes without text are passed through but
/// produce no output. Revisiting a node ends the walk, which keeps cyclic
/// mappings from looping.
pub fn extract_messages(mapping: &MessageMap) -> Vec<ExtractedMessage> {
    let mut messages = Vec::new();
    let Some(root_id) = find_root(mapping) else {
        return messages;
    };

    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = Some(root_id);

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let Some(node) = mapping.get(id) else {
            break;
        };

        if let Some(message) = &node.message
            && message.has_content()
        {
            let text = message.text();
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                messages.push(ExtractedMessage::new(message.role(), trimmed));
            }
        }

        current = node.children.first().map(String::as_str);
    }

    messages
}

/// The node to start walking from.
///
/// Prefers the first parentless node that holds a message. Exports whose
/// root is missing or detached fall back to the first node with content.
pub fn find_root(mapping: &MessageMap) -> Option<&str> {
    let is_root = |node: &MessageNode| node.parent.is_none() && node.message.is_some();
    let has_content = |node: &MessageNode| node.message.as_ref().is_some_and(|m| m.has_content());

    mapping
        .iter()
        .find(|(_, node)| is_root(*node))
        .or_else(|| mapping.iter().find(|(_, node)| has_content(*node)))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{Author, Content, Message};

    fn node(role: &str, text: &str, parent: Option<&str>, children: &[&str]) -> MessageNode {
        MessageNode {
            message: Some(Message {
                author: Author {
                    role: Some(role.to_string()),
                },
                content: Some(Content::parts([text])),
            }),
            parent: parent.map(str::to_string),
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn empty_node(parent: Option<&str>, children: &[&str]) -> MessageNode {
        MessageNode {
            message: None,
            parent: parent.map(str::to_string),
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn two_message_chain() {
        let mapping: MessageMap = [
            ("m1", node("user", "Hi", None, &["m2"])),
            ("m2", node("assistant", "Hello", Some("m1"), &[])),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            extract_messages(&mapping),
            vec![
                ExtractedMessage::new("user", "Hi"),
                ExtractedMessage::new("assistant", "Hello"),
            ]
        );
    }

    #[test]
    fn linear_chain_keeps_order_regardless_of_key_order() {
        let n = 10;
        let mut nodes = Vec::new();
        for i in (0..n).rev() {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            let parent = (i > 0).then(|| format!("n{}", i - 1));
            let children: Vec<String> = if i + 1 < n {
                vec![format!("n{}", i + 1)]
            } else {
                vec![]
            };
            let children: Vec<&str> = children.iter().map(String::as_str).collect();
            nodes.push((
                format!("n{i}"),
                node(role, &format!("turn {i}"), parent.as_deref(), &children),
            ));
        }
        let mapping: MessageMap = nodes.into_iter().collect();

        let messages = extract_messages(&mapping);
        assert_eq!(messages.len(), n);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.content, format!("turn {i}"));
            assert_eq!(msg.is_user(), i % 2 == 0);
        }
    }

    #[test]
    fn cycle_terminates() {
        let mapping: MessageMap = [
            ("a", node("user", "A", None, &["b"])),
            ("b", node("assistant", "B", Some("a"), &["a"])),
        ]
        .into_iter()
        .collect();
        assert_eq!(extract_messages(&mapping).len(), 2);
    }

    #[test]
    fn self_reference_terminates() {
        let mapping: MessageMap = [("a", node("user", "A", None, &["a"]))]
            .into_iter()
            .collect();
        assert_eq!(extract_messages(&mapping).len(), 1);
    }

    #[test]
    fn rootless_cycle_uses_content_fallback() {
        let mapping: MessageMap = [
            ("a", node("user", "A", Some("b"), &["b"])),
            ("b", node("assistant", "B", Some("a"), &["a"])),
        ]
        .into_iter()
        .collect();
        let messages = extract_messages(&mapping);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "A");
    }

    #[test]
    fn empty_and_messageless_mappings_yield_nothing() {
        assert!(extract_messages(&MessageMap::new()).is_empty());

        let mapping: MessageMap = [("m1", empty_node(None, &[]))].into_iter().collect();
        assert!(extract_messages(&mapping).is_empty());
    }

    #[test]
    fn skips_blank_and_messageless_nodes_but_keeps_walking() {
        let mapping: MessageMap = [
            ("root", empty_node(None, &["sys"])),
            ("sys", node("system", "   \n ", Some("root"), &["q"])),
            ("q", node("user", "  Question  ", Some("sys"), &["gap"])),
            ("gap", empty_node(Some("q"), &["a"])),
            ("a", node("assistant", "Answer", Some("gap"), &[])),
        ]
        .into_iter()
        .collect();

        // "root" has no message, so the first node with content starts the walk.
        assert_eq!(find_root(&mapping), Some("sys"));
        assert_eq!(
            extract_messages(&mapping),
            vec![
                ExtractedMessage::new("user", "Question"),
                ExtractedMessage::new("assistant", "Answer"),
            ]
        );
    }

    #[test]
    fn follows_first_branch_only() {
        let mapping: MessageMap = [
            ("q", node("user", "Q", None, &["a1", "a2"])),
            ("a1", node("assistant", "first", Some("q"), &[])),
            ("a2", node("assistant", "regenerated", Some("q"), &[])),
        ]
        .into_iter()
        .collect();
        let contents: Vec<String> = extract_messages(&mapping)
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["Q", "first"]);
    }

    #[test]
    fn dangling_child_ends_walk() {
        let mapping: MessageMap = [("q", node("user", "Q", None, &["missing"]))]
            .into_iter()
            .collect();
        assert_eq!(extract_messages(&mapping).len(), 1);
    }

    #[test]
    fn non_string_parts_are_dropped() {
        let mut n = node("assistant", "", None, &[]);
        n.message.as_mut().unwrap().content = Some(Content::parts([
            serde_json::json!("Answer "),
            serde_json::json!({"citation": 1}),
            serde_json::json!("here"),
        ]));
        let mapping: MessageMap = [("m", n)].into_iter().collect();
        assert_eq!(extract_messages(&mapping)[0].content, "Answer here");
    }

    #[test]
    fn missing_role_is_unknown() {
        let mut n = node("user", "hi", None, &[]);
        n.message.as_mut().unwrap().author = Author::default();
        let mapping: MessageMap = [("m", n)].into_iter().collect();
        assert_eq!(extract_messages(&mapping)[0].author, "unknown");
    }
}
