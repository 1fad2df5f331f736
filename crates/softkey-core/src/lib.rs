//! # softkey-core
//!
//! Layout resolution engine for a software keyboard.
//!
//! Given a locale's [`InputSet`], a [`RuntimeContext`] describing the device
//! and host, and a [`LayoutConfiguration`] of metrics, the
//! [`LayoutResolutionService`] produces a [`Layout`]: three pages of rows
//! whose key widths add up exactly to the screen width.
//!
//! # Architecture overview (for beginners)
//!
//! - **`domain`** – Plain data: locale identifiers, input sets, device
//!   metrics, the resolved layout and the observable runtime context.  No
//!   I/O and no locking.
//!
//! - **`registry`** – Locale-specific overrides shared between sessions.
//!   Lookups fall back from `language-REGION` to `language` to the base
//!   input set, and the layout records which tier matched.
//!
//! - **`catalog`** – The built-in input sets, keyed by locale.
//!
//! - **`resolve`** – The pipeline itself: pick a device specialization,
//!   compose rows, normalize widths.
//!
//! The host-facing side (context reconciliation, deferred passes, config
//! files) lives in the `softkey-host` crate.

pub mod catalog;
pub mod domain;
pub mod registry;
pub mod resolve;

// Re-export the most-used types at the crate root so callers can write
// `softkey_core::Layout` instead of `softkey_core::domain::layout::Layout`.
pub use catalog::{CatalogError, InputSetCatalog};
pub use domain::configuration::{DeviceFamily, LayoutConfiguration, Orientation, ScreenSize};
pub use domain::context::{
    AutocapitalizationType, ContextField, ContextObserver, ContextSnapshot, InterfaceStyle,
    RuntimeContext, TraitCollection,
};
pub use domain::input_set::{InputItem, InputSet, InputSetError, KeyboardMode};
pub use domain::layout::{
    AppliedStrategy, KeyAction, Layout, LayoutError, LayoutItem, LayoutPage, LayoutRow,
    StrategyTier, WidthPolicy,
};
pub use domain::locale::{LocaleError, LocaleId};
pub use registry::{LocaleOverride, LocaleOverrideRegistry, RegistryError, StrategyMatch};
pub use resolve::{DeviceSpecialization, LayoutResolutionService, ResolveError};
