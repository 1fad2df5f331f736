//! Input sets: the device-independent description of a locale's character keys.
//!
//! An [`InputSet`] holds three key groups, one per [`KeyboardMode`].  Each
//! group is an ordered list of rows and each row an ordered list of
//! [`InputItem`]s.  Nothing in an input set knows about key widths, shift
//! keys or the space bar; those are inserted later by the device
//! specialization during resolution.
//!
//! Input sets are immutable after construction and are shared between
//! contexts through `Arc<InputSet>` (see `catalog::InputSetCatalog`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::locale::LocaleId;

/// Errors raised while constructing an [`InputSet`].
#[derive(Debug, Error, PartialEq)]
pub enum InputSetError {
    /// A key group has no rows at all.
    #[error("{0:?} key group has no rows")]
    EmptyGroup(KeyboardMode),

    /// A row inside a key group has no keys.
    #[error("{mode:?} row {row} has no keys")]
    EmptyRow { mode: KeyboardMode, row: usize },
}

/// The three keyboard pages a user can switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardMode {
    Alphabetic,
    Numeric,
    Symbolic,
}

impl KeyboardMode {
    /// All modes in page order.
    pub const ALL: [KeyboardMode; 3] = [
        KeyboardMode::Alphabetic,
        KeyboardMode::Numeric,
        KeyboardMode::Symbolic,
    ];
}

/// One character key: the string it types plus long-press alternates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputItem {
    /// Text inserted when the key is tapped.
    pub output: String,
    /// Candidates offered on long press, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<String>,
}

impl InputItem {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            alternates: Vec::new(),
        }
    }

    /// Creates an item with long-press alternates.
    pub fn with_alternates<I, S>(output: impl Into<String>, alternates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: output.into(),
            alternates: alternates.into_iter().map(Into::into).collect(),
        }
    }
}

/// Splits space-separated row strings into rows of [`InputItem`]s.
///
/// `rows(&["q w e", "a s d"])` yields two rows of three keys each.
pub fn rows(lines: &[&str]) -> Vec<Vec<InputItem>> {
    lines
        .iter()
        .map(|row| row.split_whitespace().map(InputItem::new).collect())
        .collect()
}

/// Punctuation placed at the end of the last alphabetic row on pad layouts.
fn default_pad_punctuation() -> Vec<InputItem> {
    vec![
        InputItem::with_alternates(",", ["!"]),
        InputItem::with_alternates(".", ["?"]),
    ]
}

/// Immutable, locale-scoped description of the character keys a keyboard needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSet {
    locale: LocaleId,
    alphabetic: Vec<Vec<InputItem>>,
    numeric: Vec<Vec<InputItem>>,
    symbolic: Vec<Vec<InputItem>>,
    pad_punctuation: Vec<InputItem>,
}

impl InputSet {
    /// Builds an input set, rejecting empty groups or rows.
    ///
    /// # Errors
    ///
    /// Returns [`InputSetError::EmptyGroup`] if any group has no rows and
    /// [`InputSetError::EmptyRow`] if any row has no keys.
    pub fn new(
        locale: LocaleId,
        alphabetic: Vec<Vec<InputItem>>,
        numeric: Vec<Vec<InputItem>>,
        symbolic: Vec<Vec<InputItem>>,
    ) -> Result<Self, InputSetError> {
        validate_group(KeyboardMode::Alphabetic, &alphabetic)?;
        validate_group(KeyboardMode::Numeric, &numeric)?;
        validate_group(KeyboardMode::Symbolic, &symbolic)?;
        Ok(Self {
            locale,
            alphabetic,
            numeric,
            symbolic,
            pad_punctuation: default_pad_punctuation(),
        })
    }

    /// Replaces the punctuation appended to the last alphabetic row on pads.
    pub fn with_pad_punctuation(mut self, punctuation: Vec<InputItem>) -> Self {
        self.pad_punctuation = punctuation;
        self
    }

    /// The locale family this set was authored for.
    pub fn locale(&self) -> &LocaleId {
        &self.locale
    }

    /// Rows for the given page.
    pub fn group(&self, mode: KeyboardMode) -> &[Vec<InputItem>] {
        match mode {
            KeyboardMode::Alphabetic => &self.alphabetic,
            KeyboardMode::Numeric => &self.numeric,
            KeyboardMode::Symbolic => &self.symbolic,
        }
    }

    pub fn pad_punctuation(&self) -> &[InputItem] {
        &self.pad_punctuation
    }
}

pub(crate) fn validate_group(
    mode: KeyboardMode,
    group: &[Vec<InputItem>],
) -> Result<(), InputSetError> {
    if group.is_empty() {
        return Err(InputSetError::EmptyGroup(mode));
    }
    if let Some(row) = group.iter().position(Vec::is_empty) {
        return Err(InputSetError::EmptyRow { mode, row });
    }
    Ok(())
}
