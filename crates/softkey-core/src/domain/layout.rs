//! Resolved keyboard layouts.
//!
//! A [`Layout`] is the concrete output of resolution: for every
//! [`KeyboardMode`] a [`LayoutPage`] of rows, each row an ordered list of
//! sized [`LayoutItem`]s.  Layouts are value snapshots; re-resolution always
//! builds a new one, and consumers receive them behind an `Arc`.
//!
//! # Width conservation
//!
//! For every row the following must hold exactly:
//!
//! ```text
//! row.insets.leading + Σ(item.insets.leading + item.width + item.insets.trailing)
//!     + row.insets.trailing == layout.total_width
//! ```
//!
//! [`Layout::new`] checks this and refuses to build a layout that breaks it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::configuration::{DeviceFamily, LayoutConfiguration, Orientation};
use super::input_set::{InputItem, KeyboardMode};
use super::locale::LocaleId;

/// Errors raised while assembling or encoding a [`Layout`].
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    /// Fixed-width keys and insets alone are wider than the row.
    #[error("{mode:?} row {row} needs {required}pt but only {available}pt are available")]
    RowOverflow {
        mode: KeyboardMode,
        row: usize,
        required: u32,
        available: u32,
    },

    /// A normalised row does not add up to the target width.
    #[error("{mode:?} row {row} sums to {actual}pt, expected {expected}pt")]
    WidthMismatch {
        mode: KeyboardMode,
        row: usize,
        actual: u32,
        expected: u32,
    },

    /// A page has no rows, or a row has no keys.
    #[error("{0:?} page is degenerate (empty page or empty row)")]
    Degenerate(KeyboardMode),

    /// The binary snapshot could not be produced.
    #[error("failed to encode layout snapshot: {0}")]
    Snapshot(String),
}

/// What a key does when tapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Character(InputItem),
    Shift,
    CapsLock,
    Tab,
    Backspace,
    Return,
    Space,
    /// The globe key that cycles to the next system keyboard.
    NextKeyboard,
    Emoji,
    Dictation,
    /// Switches to another page of this keyboard.
    ModeSwitch { target: KeyboardMode },
    /// Hides the keyboard (pad only).
    Dismiss,
}

impl KeyAction {
    pub fn character(output: &str) -> Self {
        KeyAction::Character(InputItem::new(output))
    }

    pub fn is_character(&self) -> bool {
        matches!(self, KeyAction::Character(_))
    }
}

/// How a key's width is decided during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthPolicy {
    /// Exactly this many points.
    Fixed(u32),
    /// A weighted share of whatever the fixed keys leave, never below `min`.
    Flexible { weight: u32, min: u32 },
}

/// Horizontal insets on either side of a key or a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Insets {
    pub leading: u32,
    pub trailing: u32,
}

impl Insets {
    pub const fn symmetric(value: u32) -> Self {
        Self {
            leading: value,
            trailing: value,
        }
    }

    pub fn horizontal(&self) -> u32 {
        self.leading + self.trailing
    }
}

/// One physical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutItem {
    pub action: KeyAction,
    pub policy: WidthPolicy,
    pub insets: Insets,
    /// Resolved width in points; zero until normalization has run.
    pub width: u32,
}

impl LayoutItem {
    pub fn new(action: KeyAction, policy: WidthPolicy, insets: Insets) -> Self {
        let width = match policy {
            WidthPolicy::Fixed(w) => w,
            WidthPolicy::Flexible { .. } => 0,
        };
        Self {
            action,
            policy,
            insets,
            width,
        }
    }

    /// Width including both insets.
    pub fn footprint(&self) -> u32 {
        self.width + self.insets.horizontal()
    }
}

/// An ordered row of keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutRow {
    pub items: Vec<LayoutItem>,
    pub insets: Insets,
    pub height: u32,
}

impl LayoutRow {
    /// Sum of all item footprints plus the row's own insets.
    pub fn total_width(&self) -> u32 {
        self.insets.horizontal() + self.items.iter().map(LayoutItem::footprint).sum::<u32>()
    }

    /// Returns the first item whose action matches `action`.
    pub fn find(&self, action: &KeyAction) -> Option<&LayoutItem> {
        self.items.iter().find(|item| &item.action == action)
    }
}

/// All rows for one keyboard mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutPage {
    pub mode: KeyboardMode,
    pub rows: Vec<LayoutRow>,
}

impl LayoutPage {
    /// The bottom (space bar) row.
    pub fn bottom_row(&self) -> Option<&LayoutRow> {
        self.rows.last()
    }

    fn validate(&self, total_width: u32) -> Result<(), LayoutError> {
        if self.rows.is_empty() || self.rows.iter().any(|r| r.items.is_empty()) {
            return Err(LayoutError::Degenerate(self.mode));
        }
        for (index, row) in self.rows.iter().enumerate() {
            let actual = row.total_width();
            if actual != total_width {
                return Err(LayoutError::WidthMismatch {
                    mode: self.mode,
                    row: index,
                    actual,
                    expected: total_width,
                });
            }
        }
        Ok(())
    }
}

/// Which tier of the locale fallback produced a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTier {
    /// An override registered for the exact language + region.
    ExactLocale,
    /// An override registered for the language only.
    Language,
    /// No override; the device family's own composition.
    Base,
}

/// The strategy that shaped a layout, kept for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppliedStrategy {
    pub tier: StrategyTier,
    /// Name of the override, `None` for [`StrategyTier::Base`].
    pub name: Option<String>,
}

impl AppliedStrategy {
    pub fn base() -> Self {
        Self {
            tier: StrategyTier::Base,
            name: None,
        }
    }
}

/// A fully resolved, width-validated keyboard layout.
///
/// Only [`Layout::new`] builds one, so there is exactly one page per mode.
/// It serializes for reports and snapshots but is never deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Layout {
    pub locale: LocaleId,
    pub family: DeviceFamily,
    pub orientation: Orientation,
    /// `true` when the pad-pro extended key set was chosen.
    pub extended: bool,
    pub total_width: u32,
    pub configuration: LayoutConfiguration,
    pub strategy: AppliedStrategy,
    pages: Vec<LayoutPage>,
}

/// Everything a [`Layout`] records besides its pages.
#[derive(Debug, Clone)]
pub struct LayoutHeader {
    pub locale: LocaleId,
    pub family: DeviceFamily,
    pub orientation: Orientation,
    pub extended: bool,
    pub total_width: u32,
    pub configuration: LayoutConfiguration,
    pub strategy: AppliedStrategy,
}

impl Layout {
    /// Assembles a layout from normalised pages.
    ///
    /// Pages are stored in [`KeyboardMode::ALL`] order regardless of the
    /// order they are passed in.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Degenerate`] if a mode is missing or empty and
    /// [`LayoutError::WidthMismatch`] if any row breaks width conservation.
    pub fn new(header: LayoutHeader, mut pages: Vec<LayoutPage>) -> Result<Self, LayoutError> {
        for mode in KeyboardMode::ALL {
            let page = pages
                .iter()
                .find(|p| p.mode == mode)
                .ok_or(LayoutError::Degenerate(mode))?;
            page.validate(header.total_width)?;
        }
        pages.sort_by_key(|p| KeyboardMode::ALL.iter().position(|m| *m == p.mode));
        pages.dedup_by_key(|p| p.mode);

        Ok(Self {
            locale: header.locale,
            family: header.family,
            orientation: header.orientation,
            extended: header.extended,
            total_width: header.total_width,
            configuration: header.configuration,
            strategy: header.strategy,
            pages,
        })
    }

    /// The page for `mode`.
    pub fn page(&self, mode: KeyboardMode) -> &LayoutPage {
        // `new` guarantees one page per mode in `KeyboardMode::ALL` order.
        let index = KeyboardMode::ALL
            .iter()
            .position(|m| *m == mode)
            .unwrap_or_default();
        &self.pages[index]
    }

    pub fn pages(&self) -> &[LayoutPage] {
        &self.pages
    }

    /// Encodes the layout into a compact binary snapshot.
    ///
    /// Two layouts are byte-identical exactly when their snapshots are equal.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Snapshot`] if serialization fails.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>, LayoutError> {
        bincode::serialize(self).map_err(|e| LayoutError::Snapshot(e.to_string()))
    }
}
