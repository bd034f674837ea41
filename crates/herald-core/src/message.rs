//! Outbound reply payloads.
//!
//! A [`ReplyPayload`] is a platform-neutral rich message: an optional title,
//! a body, and a list of named fields. Platforms render it however they
//! like; the [`Display`](std::fmt::Display) impl gives a plain-text form.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tone of a reply, used by platforms to pick a colour or icon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    #[default]
    Info,
    Warning,
    Error,
}

/// A named field inside a [`ReplyPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadField {
    pub name: String,
    pub value: String,
}

/// A rich reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    #[serde(default)]
    pub kind: ReplyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<PayloadField>,
}

impl ReplyPayload {
    /// A plain informational reply.
    pub fn text(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Warning,
            title: Some(title.into()),
            description: description.into(),
            fields: Vec::new(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Error,
            title: Some(title.into()),
            description: description.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(PayloadField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Looks up a field value by name.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

impl From<String> for ReplyPayload {
    fn from(description: String) -> Self {
        Self::text(description)
    }
}

impl From<&str> for ReplyPayload {
    fn from(description: &str) -> Self {
        Self::text(description)
    }
}

impl fmt::Display for ReplyPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "**{title}**")?;
        }
        f.write_str(&self.description)?;
        for field in &self.fields {
            write!(f, "\n{}: {}", field.name, field.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_renders_title_and_fields() {
        let payload = ReplyPayload::error("Syntax Error", "bad input")
            .field("Usage", "!ban <user>")
            .field("Actual", "x");

        assert_eq!(
            payload.to_string(),
            "**Syntax Error**\nbad input\nUsage: !ban <user>\nActual: x"
        );
        assert_eq!(payload.field_value("Usage"), Some("!ban <user>"));
        assert_eq!(payload.kind, ReplyKind::Error);
    }

    #[test]
    fn test_text_from_string() {
        let payload: ReplyPayload = "pong".into();
        assert_eq!(payload.to_string(), "pong");
        assert!(payload.title.is_none());
    }
}
