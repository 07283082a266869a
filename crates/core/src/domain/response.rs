use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Visibility of a response posted back to the originating channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Visible to everyone in the channel.
    InChannel,
    /// Visible only to the user who issued the command.
    Ephemeral,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InChannel => "in_channel",
            Self::Ephemeral => "ephemeral",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message attachment. Only `text` is interpreted; any other presentation
/// fields are carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attachment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), extra: Map::new() }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Body posted to a command's `response_url`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub response_type: ResponseType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl ResponseMessage {
    pub fn new(
        response_type: ResponseType,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self { response_type, text: text.into(), attachments }
    }

    pub fn in_channel(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::new(ResponseType::InChannel, text, attachments)
    }

    pub fn ephemeral(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::new(ResponseType::Ephemeral, text, attachments)
    }
}

impl fmt::Display for ResponseMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.text)?;
        for attachment in &self.attachments {
            writeln!(f, "{}", attachment.text)?;
        }
        Ok(())
    }
}
