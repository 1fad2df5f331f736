//! Locale identifiers.
//!
//! A [`LocaleId`] is a language subtag plus an optional region subtag, e.g.
//! `de` or `de-AT`.  Both the override registry and the input set catalog
//! key their tables by `LocaleId`, and both perform the same two-step lookup:
//! the exact identifier first, then [`LocaleId::language_only`].
//!
//! Parsing accepts `-` or `_` as the separator and normalises case, so
//! `en_us`, `EN-us` and `en-US` all produce the same identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a locale identifier.
#[derive(Debug, Error, PartialEq)]
pub enum LocaleError {
    /// The identifier was empty or whitespace.
    #[error("locale identifier is empty")]
    Empty,

    /// The language or region subtag contained unexpected characters.
    #[error("invalid locale identifier: {0:?}")]
    Invalid(String),
}

/// A normalised locale identifier (language + optional region).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleId {
    language: String,
    region: Option<String>,
}

impl LocaleId {
    /// Parses an identifier such as `"en-US"`, `"en_US"` or `"de"`.
    ///
    /// # Errors
    ///
    /// Returns [`LocaleError::Empty`] for an empty string and
    /// [`LocaleError::Invalid`] when a subtag is not purely alphanumeric or
    /// there are more than two subtags.
    pub fn parse(raw: &str) -> Result<Self, LocaleError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LocaleError::Empty);
        }

        let mut parts = trimmed.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        let region = parts.next();
        if parts.next().is_some() || !is_subtag(language) || region.is_some_and(|r| !is_subtag(r)) {
            return Err(LocaleError::Invalid(raw.to_string()));
        }

        Ok(Self {
            language: language.to_ascii_lowercase(),
            region: region.map(str::to_ascii_uppercase),
        })
    }

    /// Creates a language-level identifier (no region).
    ///
    /// # Errors
    ///
    /// Same as [`LocaleId::parse`].
    pub fn language(language: &str) -> Result<Self, LocaleError> {
        let id = Self::parse(language)?;
        Ok(id.language_only())
    }

    /// The language subtag, lower-case.
    pub fn language_code(&self) -> &str {
        &self.language
    }

    /// The region subtag, upper-case, if any.
    pub fn region_code(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Returns `true` if this identifier carries a region subtag.
    pub fn has_region(&self) -> bool {
        self.region.is_some()
    }

    /// Drops the region subtag.
    pub fn language_only(&self) -> Self {
        Self {
            language: self.language.clone(),
            region: None,
        }
    }
}

fn is_subtag(s: &str) -> bool {
    !s.is_empty() && s.len() <= 8 && s.chars().all(|c| c.is_ascii_alphanumeric())
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => f.write_str(&self.language),
        }
    }
}

impl FromStr for LocaleId {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LocaleId {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LocaleId> for String {
    fn from(value: LocaleId) -> Self {
        value.to_string()
    }
}
