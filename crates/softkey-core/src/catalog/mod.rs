//! Input set catalog.
//!
//! [`InputSetCatalog`] owns one `Arc<InputSet>` per locale key and hands out
//! shared references.  Lookup uses the same exact → language order as the
//! override registry; a miss is reported by the caller as
//! `ResolveError::MissingInputSet`.

pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::input_set::{InputSet, InputSetError};
use crate::domain::locale::{LocaleError, LocaleId};

/// Errors raised while building a catalog.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error(transparent)]
    Locale(#[from] LocaleError),

    #[error(transparent)]
    InputSet(#[from] InputSetError),
}

/// Locale-keyed table of shared input sets.
#[derive(Debug, Clone, Default)]
pub struct InputSetCatalog {
    sets: HashMap<LocaleId, Arc<InputSet>>,
}

impl InputSetCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-populated with [`builtin::all`].
    ///
    /// # Errors
    ///
    /// Propagates [`CatalogError`] from the built-in tables.
    pub fn with_builtin() -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for set in builtin::all()? {
            catalog.insert(set);
        }
        Ok(catalog)
    }

    /// Adds or replaces the set keyed by its own locale.
    pub fn insert(&mut self, set: InputSet) {
        self.sets.insert(set.locale().clone(), Arc::new(set));
    }

    /// Finds the set for `locale`: exact identifier first, then language only.
    pub fn get(&self, locale: &LocaleId) -> Option<Arc<InputSet>> {
        self.sets
            .get(locale)
            .or_else(|| self.sets.get(&locale.language_only()))
            .cloned()
    }

    pub fn contains(&self, locale: &LocaleId) -> bool {
        self.get(locale).is_some()
    }

    /// All locale keys, sorted for stable output.
    pub fn locales(&self) -> Vec<&LocaleId> {
        let mut keys: Vec<_> = self.sets.keys().collect();
        keys.sort();
        keys
    }
}
