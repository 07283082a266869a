use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder written in place of the verification token whenever a request
/// is logged or displayed.
pub const REDACTED_TOKEN: &str = "###";

/// A single slash-command invocation as posted by the chat platform.
///
/// Decoded once per invocation (form-encoded on the wire) and never mutated
/// afterwards. Every field is optional on the wire; plain string fields fall
/// back to empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub team_domain: String,
    #[serde(default)]
    pub enterprise_id: Option<String>,
    #[serde(default)]
    pub enterprise_name: Option<String>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub response_url: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CallbackUrlError {
    #[error("request has no response_url")]
    Missing,
    #[error("response_url `{url}` is not an absolute URL: {reason}")]
    Invalid { url: String, reason: String },
}

impl CommandRequest {
    /// Parses `response_url` into an absolute URL.
    pub fn callback_url(&self) -> Result<Url, CallbackUrlError> {
        let raw = self
            .response_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(CallbackUrlError::Missing)?;

        let url = Url::parse(raw).map_err(|error| CallbackUrlError::Invalid {
            url: raw.to_owned(),
            reason: error.to_string(),
        })?;

        if url.cannot_be_a_base() {
            return Err(CallbackUrlError::Invalid {
                url: raw.to_owned(),
                reason: "URL has no authority".to_owned(),
            });
        }

        Ok(url)
    }

    /// Copy of the request that is safe to log: the token is replaced with
    /// [`REDACTED_TOKEN`].
    pub fn redacted(&self) -> Self {
        Self { token: Some(REDACTED_TOKEN.to_owned()), ..self.clone() }
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Token: {REDACTED_TOKEN}")?;
        writeln!(f, "TeamId: {}", self.team_id)?;
        writeln!(f, "TeamDomain: {}", self.team_domain)?;
        if let Some(enterprise_id) = &self.enterprise_id {
            writeln!(f, "EnterpriseId: {enterprise_id}")?;
        }
        if let Some(enterprise_name) = &self.enterprise_name {
            writeln!(f, "EnterpriseName: {enterprise_name}")?;
        }
        writeln!(f, "ChannelId: {}", self.channel_id)?;
        writeln!(f, "ChannelName: {}", self.channel_name)?;
        writeln!(f, "UserId: {}", self.user_id)?;
        writeln!(f, "UserName: {}", self.user_name)?;
        writeln!(f, "Command: {}", self.command)?;
        writeln!(f, "Text: {}", self.text)?;
        writeln!(f, "ResponseUrl: {}", self.response_url.as_deref().unwrap_or_default())
    }
}
