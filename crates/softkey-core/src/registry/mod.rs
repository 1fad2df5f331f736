//! Locale override registry.
//!
//! Maps a [`LocaleId`] to a [`LocaleOverride`]: a locale-specific strategy
//! that replaces some of the input set's key groups before device
//! composition runs.
//!
//! # Registration
//!
//! [`LocaleOverrideRegistry::try_register`] never replaces an existing entry.
//! Registering twice for the same exact identifier fails with
//! [`RegistryError::Conflict`] and leaves the first entry in place.
//! Registering for `de` says nothing about `de-AT`; the relation between
//! them only exists at lookup time.
//!
//! # Lookup
//!
//! [`LocaleOverrideRegistry::lookup`] tries, in order:
//!
//! | Key tried              | Result tier                  |
//! |------------------------|------------------------------|
//! | exact `language-REGION`| [`StrategyTier::ExactLocale`] |
//! | `language`             | [`StrategyTier::Language`]    |
//! | (none)                 | [`StrategyTier::Base`]        |
//!
//! # Concurrency
//!
//! The table sits behind a `std::sync::RwLock`: lookups share the read lock,
//! registration takes the write lock.  A registry can therefore be shared
//! across sessions through an `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::input_set::{validate_group, InputItem, InputSetError, KeyboardMode};
use crate::domain::layout::{AppliedStrategy, StrategyTier};
use crate::domain::locale::LocaleId;

/// Errors returned by [`LocaleOverrideRegistry::try_register`].
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// An override is already registered for this exact identifier.
    #[error("an override is already registered for {0}")]
    Conflict(LocaleId),

    /// A writer panicked while holding the lock.
    #[error("override registry lock poisoned")]
    Poisoned,
}

/// A locale-specific resolution strategy.
///
/// Each `Some` group replaces the corresponding group of the input set.
/// `space_row_characters` are placed immediately before the space bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocaleOverride {
    pub name: String,
    #[serde(default)]
    pub alphabetic: Option<Vec<Vec<InputItem>>>,
    #[serde(default)]
    pub numeric: Option<Vec<Vec<InputItem>>>,
    #[serde(default)]
    pub symbolic: Option<Vec<Vec<InputItem>>>,
    #[serde(default)]
    pub space_row_characters: Vec<InputItem>,
}

impl LocaleOverride {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Replaces the key group for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`InputSetError`] if `rows` is empty or contains an empty row.
    pub fn with_group(
        mut self,
        mode: KeyboardMode,
        rows: Vec<Vec<InputItem>>,
    ) -> Result<Self, InputSetError> {
        validate_group(mode, &rows)?;
        match mode {
            KeyboardMode::Alphabetic => self.alphabetic = Some(rows),
            KeyboardMode::Numeric => self.numeric = Some(rows),
            KeyboardMode::Symbolic => self.symbolic = Some(rows),
        }
        Ok(self)
    }

    pub fn with_space_row_characters(mut self, items: Vec<InputItem>) -> Self {
        self.space_row_characters = items;
        self
    }

    /// The replacement rows for `mode`, if this override provides them.
    pub fn group(&self, mode: KeyboardMode) -> Option<&[Vec<InputItem>]> {
        match mode {
            KeyboardMode::Alphabetic => self.alphabetic.as_deref(),
            KeyboardMode::Numeric => self.numeric.as_deref(),
            KeyboardMode::Symbolic => self.symbolic.as_deref(),
        }
    }
}

/// Result of a registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyMatch {
    pub tier: StrategyTier,
    /// The override to apply; `None` for [`StrategyTier::Base`].
    pub strategy: Option<Arc<LocaleOverride>>,
}

impl StrategyMatch {
    pub fn base() -> Self {
        Self {
            tier: StrategyTier::Base,
            strategy: None,
        }
    }

    /// The description recorded in the resolved layout.
    pub fn applied(&self) -> AppliedStrategy {
        AppliedStrategy {
            tier: self.tier,
            name: self.strategy.as_ref().map(|s| s.name.clone()),
        }
    }
}

/// Thread-safe table of locale overrides.
#[derive(Debug, Default)]
pub struct LocaleOverrideRegistry {
    entries: RwLock<HashMap<LocaleId, Arc<LocaleOverride>>>,
}

impl LocaleOverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `strategy` for exactly `locale`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] if `locale` already has an entry
    /// (the existing entry is kept) and [`RegistryError::Poisoned`] if the
    /// lock is poisoned.
    pub fn try_register(
        &self,
        locale: LocaleId,
        strategy: LocaleOverride,
    ) -> Result<(), RegistryError> {
        let mut guard = self.entries.write().map_err(|_| RegistryError::Poisoned)?;
        if guard.contains_key(&locale) {
            warn!(
                %locale,
                name = %strategy.name,
                "override registration rejected: already registered"
            );
            return Err(RegistryError::Conflict(locale));
        }
        debug!(%locale, name = %strategy.name, "override registered");
        guard.insert(locale, Arc::new(strategy));
        Ok(())
    }

    /// Finds the strategy for `locale` using the exact → language → base order.
    pub fn lookup(&self, locale: &LocaleId) -> StrategyMatch {
        // Lookups never mutate, so a poisoned table is still safe to read.
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(strategy) = guard.get(locale) {
            return StrategyMatch {
                tier: StrategyTier::ExactLocale,
                strategy: Some(Arc::clone(strategy)),
            };
        }
        if locale.has_region() {
            if let Some(strategy) = guard.get(&locale.language_only()) {
                return StrategyMatch {
                    tier: StrategyTier::Language,
                    strategy: Some(Arc::clone(strategy)),
                };
            }
        }
        StrategyMatch::base()
    }

    /// Returns `true` if an entry exists for exactly `locale`.
    pub fn contains(&self, locale: &LocaleId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(locale)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
