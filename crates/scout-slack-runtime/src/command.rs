//! Slash command form parsing.

use reqwest::Url;
use scout_report::Locale;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_SLASH_COMMAND: &str = "/scout";

#[derive(Debug, Clone, Default, Deserialize)]
/// Form-encoded body Slack posts for a slash command.
pub struct SlashCommandForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

impl SlashCommandForm {
    pub fn command_name(&self) -> &str {
        self.command
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_SLASH_COMMAND)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A validated research command.
pub struct Command {
    /// What to research, with the language token already stripped.
    pub subject: String,
    pub callback_url: String,
    pub locale: Locale,
    pub user_id: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("command text is empty")]
    EmptySubject { locale: Locale },
    #[error("response_url is required")]
    MissingResponseUrl,
    #[error("response_url '{0}' is not an http(s) url")]
    InvalidResponseUrl(String),
}

/// Validates `form` and splits the language token off its text.
///
/// An empty subject is reported before the callback is checked since a usage
/// reply needs no callback.
pub fn parse_slash_command(
    form: &SlashCommandForm,
    alternate_language_token: &str,
) -> Result<Command, CommandParseError> {
    let (subject, locale) = split_language_token(&form.text, alternate_language_token);
    if subject.is_empty() {
        return Err(CommandParseError::EmptySubject { locale });
    }

    let callback_url = form.response_url.trim();
    if callback_url.is_empty() {
        return Err(CommandParseError::MissingResponseUrl);
    }
    let parsed = Url::parse(callback_url)
        .map_err(|_| CommandParseError::InvalidResponseUrl(callback_url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(CommandParseError::InvalidResponseUrl(callback_url.to_string()));
    }

    Ok(Command {
        subject,
        callback_url: callback_url.to_string(),
        locale,
        user_id: form
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string),
    })
}

/// Strips a trailing `alternate_language_token` (case-insensitive) and returns
/// the remaining subject with the locale it selects.
pub fn split_language_token(text: &str, alternate_language_token: &str) -> (String, Locale) {
    let trimmed = text.trim();
    let token = alternate_language_token.trim();
    if token.is_empty() {
        return (trimmed.to_string(), Locale::default());
    }

    let (head, last) = match trimmed.rsplit_once(char::is_whitespace) {
        Some((head, last)) => (head.trim_end(), last),
        None => ("", trimmed),
    };
    if last.eq_ignore_ascii_case(token) {
        (head.to_string(), Locale::English)
    } else {
        (trimmed.to_string(), Locale::default())
    }
}
