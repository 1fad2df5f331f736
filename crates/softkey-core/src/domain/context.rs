//! The runtime context of one keyboard session.
//!
//! [`RuntimeContext`] is the single mutable aggregate the hosting controller
//! owns for the lifetime of a keyboard activation.  Every field is written
//! through a setter that:
//!
//! 1. compares the new value with the current one and returns `false`
//!    without touching anything when they are equal;
//! 2. otherwise stores the value, bumps [`RuntimeContext::mutation_count`]
//!    and notifies every subscribed [`ContextObserver`] with the
//!    [`ContextField`] that changed.
//!
//! Observers treat each notification as a meaningful change, so the
//! equality check in step 1 is required for correctness.
//!
//! # Derived fields
//!
//! - `device_type_for_keyboard` follows `device_type` except while the
//!   keyboard is floating, when it is forced to [`DeviceFamily::Phone`].
//! - `autocapitalization_type_override` is `Some(None)` when the user
//!   preference disables autocapitalization and `None` otherwise.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::configuration::{DeviceFamily, Orientation, ScreenSize};
use super::locale::LocaleId;

/// Autocapitalization behaviour requested by a text field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutocapitalizationType {
    None,
    Words,
    #[default]
    Sentences,
    AllCharacters,
}

/// Light / dark appearance reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceStyle {
    #[default]
    Unspecified,
    Light,
    Dark,
}

/// Appearance and accessibility traits reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitCollection {
    pub interface_style: InterfaceStyle,
    pub bold_text: bool,
}

/// Identifies one field of the [`RuntimeContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextField {
    Locale,
    DeviceType,
    DeviceTypeForKeyboard,
    Orientation,
    ScreenSize,
    KeyboardFloating,
    FullAccess,
    DictationKey,
    InputModeSwitchKey,
    ExternalKeyboard,
    HostApplication,
    TextInputMode,
    PrimaryLanguage,
    TraitCollection,
    AutocapitalizationType,
    AutocapitalizationEnabled,
    AutocapitalizationOverride,
}

impl ContextField {
    /// Returns `true` if a change to this field requires re-resolving the layout.
    pub fn affects_layout(self) -> bool {
        matches!(
            self,
            ContextField::Locale
                | ContextField::DeviceTypeForKeyboard
                | ContextField::Orientation
                | ContextField::ScreenSize
                | ContextField::DictationKey
                | ContextField::InputModeSwitchKey
        )
    }
}

/// Receives a callback for every effective context mutation.
#[cfg_attr(test, mockall::automock)]
pub trait ContextObserver: Send + Sync {
    fn context_changed(&self, field: ContextField);
}

/// A read-only copy of the context handed to rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub locale: LocaleId,
    pub device_type: DeviceFamily,
    pub device_type_for_keyboard: DeviceFamily,
    pub orientation: Orientation,
    pub screen_size: ScreenSize,
    pub is_keyboard_floating: bool,
    pub has_full_access: bool,
    pub has_dictation_key: bool,
    pub needs_input_mode_switch_key: bool,
    pub has_external_keyboard: bool,
    pub host_application_bundle_id: Option<String>,
    pub text_input_mode: Option<String>,
    pub primary_language: Option<String>,
    pub trait_collection: TraitCollection,
    pub autocapitalization_type: AutocapitalizationType,
}

/// Mutable, observable state for one keyboard session.
pub struct RuntimeContext {
    locale: LocaleId,
    device_type: DeviceFamily,
    device_type_for_keyboard: DeviceFamily,
    orientation: Orientation,
    screen_size: ScreenSize,
    is_keyboard_floating: bool,
    has_full_access: bool,
    has_dictation_key: bool,
    needs_input_mode_switch_key: bool,
    has_external_keyboard: bool,
    host_application_bundle_id: Option<String>,
    text_input_mode: Option<String>,
    primary_language: Option<String>,
    trait_collection: TraitCollection,
    autocapitalization_type: AutocapitalizationType,
    autocapitalization_enabled: bool,
    autocapitalization_type_override: Option<AutocapitalizationType>,
    mutation_count: u64,
    observers: Vec<Arc<dyn ContextObserver>>,
}

/// Stores `value` in `slot` if it differs; returns whether it did.
fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

impl RuntimeContext {
    /// Creates a context for a freshly activated keyboard.
    ///
    /// Orientation is inferred from `screen_size`; all host flags start
    /// `false` and autocapitalization is enabled.
    pub fn new(locale: LocaleId, device_type: DeviceFamily, screen_size: ScreenSize) -> Self {
        Self {
            locale,
            device_type,
            device_type_for_keyboard: device_type,
            orientation: screen_size.orientation(),
            screen_size,
            is_keyboard_floating: false,
            has_full_access: false,
            has_dictation_key: false,
            needs_input_mode_switch_key: false,
            has_external_keyboard: false,
            host_application_bundle_id: None,
            text_input_mode: None,
            primary_language: None,
            trait_collection: TraitCollection::default(),
            autocapitalization_type: AutocapitalizationType::default(),
            autocapitalization_enabled: true,
            autocapitalization_type_override: None,
            mutation_count: 0,
            observers: Vec::new(),
        }
    }

    /// Registers an observer for future mutations.
    pub fn subscribe(&mut self, observer: Arc<dyn ContextObserver>) {
        self.observers.push(observer);
    }

    /// Number of effective (non-idempotent) writes since creation.
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    fn commit(&mut self, field: ContextField, changed: bool) -> bool {
        if changed {
            self.mutation_count += 1;
            for observer in &self.observers {
                observer.context_changed(field);
            }
        }
        changed
    }

    // ── Getters ───────────────────────────────────────────────────────────────

    pub fn locale(&self) -> &LocaleId {
        &self.locale
    }

    pub fn device_type(&self) -> DeviceFamily {
        self.device_type
    }

    pub fn device_type_for_keyboard(&self) -> DeviceFamily {
        self.device_type_for_keyboard
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn screen_size(&self) -> ScreenSize {
        self.screen_size
    }

    pub fn is_keyboard_floating(&self) -> bool {
        self.is_keyboard_floating
    }

    pub fn has_full_access(&self) -> bool {
        self.has_full_access
    }

    pub fn has_dictation_key(&self) -> bool {
        self.has_dictation_key
    }

    pub fn needs_input_mode_switch_key(&self) -> bool {
        self.needs_input_mode_switch_key
    }

    pub fn has_external_keyboard(&self) -> bool {
        self.has_external_keyboard
    }

    pub fn host_application_bundle_id(&self) -> Option<&str> {
        self.host_application_bundle_id.as_deref()
    }

    pub fn text_input_mode(&self) -> Option<&str> {
        self.text_input_mode.as_deref()
    }

    pub fn primary_language(&self) -> Option<&str> {
        self.primary_language.as_deref()
    }

    pub fn trait_collection(&self) -> TraitCollection {
        self.trait_collection
    }

    /// The text field's native type, before the preference override.
    pub fn autocapitalization_type(&self) -> AutocapitalizationType {
        self.autocapitalization_type
    }

    pub fn autocapitalization_enabled(&self) -> bool {
        self.autocapitalization_enabled
    }

    pub fn autocapitalization_type_override(&self) -> Option<AutocapitalizationType> {
        self.autocapitalization_type_override
    }

    /// The autocapitalization type the keyboard should actually apply.
    pub fn effective_autocapitalization_type(&self) -> AutocapitalizationType {
        self.autocapitalization_type_override
            .unwrap_or(self.autocapitalization_type)
    }

    /// Copies the current state for read-only consumers.
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            locale: self.locale.clone(),
            device_type: self.device_type,
            device_type_for_keyboard: self.device_type_for_keyboard,
            orientation: self.orientation,
            screen_size: self.screen_size,
            is_keyboard_floating: self.is_keyboard_floating,
            has_full_access: self.has_full_access,
            has_dictation_key: self.has_dictation_key,
            needs_input_mode_switch_key: self.needs_input_mode_switch_key,
            has_external_keyboard: self.has_external_keyboard,
            host_application_bundle_id: self.host_application_bundle_id.clone(),
            text_input_mode: self.text_input_mode.clone(),
            primary_language: self.primary_language.clone(),
            trait_collection: self.trait_collection,
            autocapitalization_type: self.effective_autocapitalization_type(),
        }
    }

    // ── Setters ───────────────────────────────────────────────────────────────

    pub fn set_locale(&mut self, locale: LocaleId) -> bool {
        let changed = replace_if_changed(&mut self.locale, locale);
        self.commit(ContextField::Locale, changed)
    }

    /// Sets the real device family.  The keyboard family follows unless floating.
    pub fn set_device_type(&mut self, device_type: DeviceFamily) -> bool {
        let changed = replace_if_changed(&mut self.device_type, device_type);
        self.commit(ContextField::DeviceType, changed);
        self.sync_device_type_for_keyboard();
        changed
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> bool {
        let changed = replace_if_changed(&mut self.orientation, orientation);
        self.commit(ContextField::Orientation, changed)
    }

    pub fn set_screen_size(&mut self, screen_size: ScreenSize) -> bool {
        let changed = replace_if_changed(&mut self.screen_size, screen_size);
        self.commit(ContextField::ScreenSize, changed)
    }

    /// Records whether the keyboard is floating and applies the phone override.
    pub fn set_keyboard_floating(&mut self, floating: bool) -> bool {
        let changed = replace_if_changed(&mut self.is_keyboard_floating, floating);
        self.commit(ContextField::KeyboardFloating, changed);
        self.sync_device_type_for_keyboard();
        changed
    }

    fn sync_device_type_for_keyboard(&mut self) -> bool {
        let target = if self.is_keyboard_floating {
            DeviceFamily::Phone
        } else {
            self.device_type
        };
        let changed = replace_if_changed(&mut self.device_type_for_keyboard, target);
        self.commit(ContextField::DeviceTypeForKeyboard, changed)
    }

    pub fn set_full_access(&mut self, value: bool) -> bool {
        let changed = replace_if_changed(&mut self.has_full_access, value);
        self.commit(ContextField::FullAccess, changed)
    }

    pub fn set_dictation_key(&mut self, value: bool) -> bool {
        let changed = replace_if_changed(&mut self.has_dictation_key, value);
        self.commit(ContextField::DictationKey, changed)
    }

    pub fn set_needs_input_mode_switch_key(&mut self, value: bool) -> bool {
        let changed = replace_if_changed(&mut self.needs_input_mode_switch_key, value);
        self.commit(ContextField::InputModeSwitchKey, changed)
    }

    pub fn set_external_keyboard(&mut self, value: bool) -> bool {
        let changed = replace_if_changed(&mut self.has_external_keyboard, value);
        self.commit(ContextField::ExternalKeyboard, changed)
    }

    pub fn set_host_application_bundle_id(&mut self, value: Option<String>) -> bool {
        let changed = replace_if_changed(&mut self.host_application_bundle_id, value);
        self.commit(ContextField::HostApplication, changed)
    }

    pub fn set_text_input_mode(&mut self, value: Option<String>) -> bool {
        let changed = replace_if_changed(&mut self.text_input_mode, value);
        self.commit(ContextField::TextInputMode, changed)
    }

    pub fn set_primary_language(&mut self, value: Option<String>) -> bool {
        let changed = replace_if_changed(&mut self.primary_language, value);
        self.commit(ContextField::PrimaryLanguage, changed)
    }

    pub fn set_trait_collection(&mut self, value: TraitCollection) -> bool {
        let changed = replace_if_changed(&mut self.trait_collection, value);
        self.commit(ContextField::TraitCollection, changed)
    }

    /// Sets the text field's native autocapitalization type.
    pub fn set_autocapitalization_type(&mut self, value: AutocapitalizationType) -> bool {
        let changed = replace_if_changed(&mut self.autocapitalization_type, value);
        self.commit(ContextField::AutocapitalizationType, changed);
        self.recompute_autocapitalization_override();
        changed
    }

    /// Sets the user preference that enables or disables autocapitalization.
    pub fn set_autocapitalization_enabled(&mut self, enabled: bool) -> bool {
        let changed = replace_if_changed(&mut self.autocapitalization_enabled, enabled);
        self.commit(ContextField::AutocapitalizationEnabled, changed);
        self.recompute_autocapitalization_override();
        changed
    }

    fn recompute_autocapitalization_override(&mut self) -> bool {
        let target = if self.autocapitalization_enabled {
            None
        } else {
            Some(AutocapitalizationType::None)
        };
        let changed = replace_if_changed(&mut self.autocapitalization_type_override, target);
        self.commit(ContextField::AutocapitalizationOverride, changed)
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("snapshot", &self.snapshot())
            .field("mutation_count", &self.mutation_count)
            .field("observers", &self.observers.len())
            .finish()
    }
}
