//! Context reconciliation passes.
//!
//! Host-reported values reach the [`RuntimeContext`] through exactly two
//! passes:
//!
//! - **Pass A** ([`Reconciler::apply_host_snapshot`]) runs for a host
//!   callback (focus change, rotation, host app switch).  It writes every
//!   reported field through the context's idempotent setters, so a field is
//!   only touched when its value actually differs.
//! - **Pass B** ([`Reconciler::apply_frame_report`]) runs once the host's
//!   layout pass has settled.  It derives `is_keyboard_floating` from the
//!   final view width and, only when the settled orientation differs from the
//!   one Pass A last wrote, asks the caller to run Pass A again with the
//!   settled geometry.  Pass A never schedules Pass B, so the chain always
//!   ends after at most one extra Pass A.
//!
//! Neither pass resolves layouts; the session decides that from the change
//! notifications the context emits.

use serde::{Deserialize, Serialize};
use tracing::debug;

use softkey_core::{
    AutocapitalizationType, ContextField, DeviceFamily, LocaleId, Orientation, RuntimeContext,
    ScreenSize, TraitCollection,
};

/// Default floating threshold: a keyboard narrower than half the screen floats.
pub const DEFAULT_FLOATING_THRESHOLD_PERCENT: u32 = 50;

/// Point-in-time values reported by the host for Pass A.
///
/// `None` for `locale`, `orientation` or `screen_size` means "not reported";
/// the context keeps its current value.  When a newer snapshot supersedes a
/// queued one, [`HostSnapshot::inherit_unreported`] carries those three
/// fields over so a burst never loses a reported value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSnapshot {
    pub locale: Option<LocaleId>,
    pub orientation: Option<Orientation>,
    pub screen_size: Option<ScreenSize>,
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

impl HostSnapshot {
    /// Captures the host-reported fields currently held by `context`.
    pub fn from_context(context: &RuntimeContext) -> Self {
        Self {
            locale: Some(context.locale().clone()),
            orientation: Some(context.orientation()),
            screen_size: Some(context.screen_size()),
            has_full_access: context.has_full_access(),
            has_dictation_key: context.has_dictation_key(),
            needs_input_mode_switch_key: context.needs_input_mode_switch_key(),
            has_external_keyboard: context.has_external_keyboard(),
            host_application_bundle_id: context.host_application_bundle_id().map(str::to_owned),
            text_input_mode: context.text_input_mode().map(str::to_owned),
            primary_language: context.primary_language().map(str::to_owned),
            trait_collection: context.trait_collection(),
            autocapitalization_type: context.autocapitalization_type(),
        }
    }

    /// Takes `locale`, `orientation` and `screen_size` from `older` where this
    /// snapshot did not report them.
    pub fn inherit_unreported(&mut self, older: &HostSnapshot) {
        if self.locale.is_none() {
            self.locale = older.locale.clone();
        }
        self.orientation = self.orientation.or(older.orientation);
        self.screen_size = self.screen_size.or(older.screen_size);
    }

    /// Replaces the geometry with settled values from a frame report.
    pub fn with_geometry(mut self, frame: &FrameReport) -> Self {
        self.orientation = Some(frame.orientation());
        self.screen_size = Some(frame.screen_size);
        self
    }
}

/// Settled geometry reported after the host's layout pass, for Pass B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Width of the keyboard's own view.
    pub view_width: u32,
    pub screen_size: ScreenSize,
}

impl FrameReport {
    pub fn orientation(&self) -> Orientation {
        self.screen_size.orientation()
    }
}

/// Result of one deferred pass as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// At least one field changed; lists every field notified, derived ones included.
    Applied { changed: Vec<ContextField> },
    /// Every reported value matched the context.
    Unchanged,
    /// A newer signal of the same kind superseded this pass; nothing was written.
    Stale,
}

/// What Pass B did and whether Pass A must run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePass {
    pub wrote: bool,
    pub orientation_changed: bool,
}

/// Applies host values to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciler {
    floating_threshold_percent: u32,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_FLOATING_THRESHOLD_PERCENT)
    }
}

impl Reconciler {
    pub fn new(floating_threshold_percent: u32) -> Self {
        Self {
            floating_threshold_percent,
        }
    }

    pub fn floating_threshold_percent(&self) -> u32 {
        self.floating_threshold_percent
    }

    /// Pass A. Returns `true` if any field was written.
    pub fn apply_host_snapshot(
        &self,
        context: &mut RuntimeContext,
        snapshot: &HostSnapshot,
    ) -> bool {
        let before = context.mutation_count();

        if let Some(locale) = &snapshot.locale {
            context.set_locale(locale.clone());
        }
        if let Some(orientation) = snapshot.orientation {
            context.set_orientation(orientation);
        }
        if let Some(screen_size) = snapshot.screen_size {
            context.set_screen_size(screen_size);
        }
        context.set_full_access(snapshot.has_full_access);
        context.set_dictation_key(snapshot.has_dictation_key);
        context.set_needs_input_mode_switch_key(snapshot.needs_input_mode_switch_key);
        context.set_external_keyboard(snapshot.has_external_keyboard);
        context.set_host_application_bundle_id(snapshot.host_application_bundle_id.clone());
        context.set_text_input_mode(snapshot.text_input_mode.clone());
        context.set_primary_language(snapshot.primary_language.clone());
        context.set_trait_collection(snapshot.trait_collection);
        context.set_autocapitalization_type(snapshot.autocapitalization_type);

        let writes = context.mutation_count() - before;
        debug!(writes, "host snapshot reconciled");
        writes > 0
    }

    /// Pass B.
    ///
    /// Floating is only detected on devices that are not phones; a phone
    /// keyboard always spans the screen.
    pub fn apply_frame_report(
        &self,
        context: &mut RuntimeContext,
        frame: &FrameReport,
    ) -> FramePass {
        let before = context.mutation_count();
        let floating = self.is_floating(context.device_type(), frame);
        context.set_keyboard_floating(floating);

        let orientation_changed = frame.orientation() != context.orientation();
        let wrote = context.mutation_count() != before;
        debug!(
            view_width = frame.view_width,
            screen_width = frame.screen_size.width,
            floating,
            orientation_changed,
            "frame report reconciled"
        );
        FramePass {
            wrote,
            orientation_changed,
        }
    }

    /// `view_width < threshold% of screen width`, never on phones.
    pub fn is_floating(&self, device_type: DeviceFamily, frame: &FrameReport) -> bool {
        if device_type == DeviceFamily::Phone {
            return false;
        }
        u64::from(frame.view_width) * 100
            < u64::from(frame.screen_size.width) * u64::from(self.floating_threshold_percent)
    }
}
