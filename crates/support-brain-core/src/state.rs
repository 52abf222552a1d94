//! UI-agnostic conversation data model
//!
//! These types are shared by every front end (the terminal UI, the one-shot
//! `ask` command) and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// A citation backing an assistant answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Origin document, usually the manual's file name
    pub source: String,
    pub page: u32,
    /// Excerpt used as supporting evidence
    pub content: String,
}

impl Source {
    pub fn new(source: impl Into<String>, page: u32, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page,
            content: content.into(),
        }
    }

    /// Chip label shown next to an answer, e.g. `manual.pdf (Page 12)`
    pub fn label(&self) -> String {
        format!("{} (Page {})", self.source, self.page)
    }
}

/// A message in the conversation
///
/// Only assistant messages can carry sources. `sources: Some(vec![])` is an
/// answer that cited nothing; `None` is a message that never had a sources
/// field (the greeting, the connection-error fallback).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sources: Option<Vec<Source>>,
    },
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Option<Vec<Source>>) -> Self {
        ChatMessage::Assistant {
            content: content.into(),
            sources,
        }
    }

    pub fn role(&self) -> ChatRole {
        match self {
            ChatMessage::User { .. } => ChatRole::User,
            ChatMessage::Assistant { .. } => ChatRole::Assistant,
        }
    }

    /// Message body. Assistant content is markdown and is never altered here.
    pub fn content(&self) -> &str {
        match self {
            ChatMessage::User { content } | ChatMessage::Assistant { content, .. } => content,
        }
    }

    /// The sources field as received, distinguishing "absent" from "empty"
    pub fn sources_field(&self) -> Option<&[Source]> {
        match self {
            ChatMessage::Assistant {
                sources: Some(sources),
                ..
            } => Some(sources),
            _ => None,
        }
    }

    /// Citations to display; absent and empty both read as "no citations"
    pub fn sources(&self) -> &[Source] {
        self.sources_field().unwrap_or(&[])
    }

    pub fn has_sources(&self) -> bool {
        !self.sources().is_empty()
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChatRole::User => "You",
            ChatRole::Assistant => "AI",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_label() {
        let source = Source::new("manual.pdf", 12, "Hold the power button.");
        assert_eq!(source.label(), "manual.pdf (Page 12)");
    }

    #[test]
    fn test_user_message_has_no_sources() {
        let msg = ChatMessage::user("How to reset the device?");
        assert_eq!(msg.role(), ChatRole::User);
        assert_eq!(msg.sources_field(), None);
        assert!(msg.sources().is_empty());
    }

    #[test]
    fn test_empty_and_absent_sources_both_read_as_no_citations() {
        let answered = ChatMessage::assistant("Reboot it.", Some(Vec::new()));
        let fallback = ChatMessage::assistant("Error", None);

        assert_eq!(answered.sources_field(), Some(&[][..]));
        assert_eq!(fallback.sources_field(), None);
        assert!(!answered.has_sources());
        assert!(!fallback.has_sources());
    }

    #[test]
    fn test_markdown_content_is_kept_verbatim() {
        let body = "## Steps\n\n```sh\nreset --hard\n```\n* **Hold** <power>";
        let msg = ChatMessage::assistant(body, None);
        assert_eq!(msg.content(), body);
    }

    #[test]
    fn test_message_serializes_with_role_tag() {
        let msg = ChatMessage::assistant(
            "Check page 12.",
            Some(vec![Source::new("manual.pdf", 12, "...")]),
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["sources"][0]["page"], 12);

        let user = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(user["role"], "user");
        assert!(user.get("sources").is_none());
    }
}
