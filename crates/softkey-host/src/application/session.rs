//! KeyboardSession: one keyboard activation, from first host signal to the
//! last published layout.
//!
//! The session is the single owner of its [`RuntimeContext`].  Host signals
//! are not applied when they arrive; [`KeyboardSession::receive`] only queues
//! them, and [`KeyboardSession::run_pending`] applies them later on the
//! owner task, after the host's own UI pass has settled.
//!
//! # When is the layout recomputed?
//!
//! After each pass the session collects the [`ContextField`]s the context
//! reported as changed.  The layout is re-resolved only if one of them
//! [affects layout](ContextField::affects_layout), and the new layout is
//! published only if its snapshot bytes differ from the current one.  A
//! locale change also drops the cached input set.
//!
//! # Missing locales
//!
//! If the catalog has no input set for the context locale, the session logs
//! a warning and resolves with the configured default locale's input set
//! instead.  Only when that is missing too does resolution fail.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use softkey_core::{
    ContextField, ContextObserver, ContextSnapshot, InputSet, InputSetCatalog, Layout,
    LayoutConfiguration, LayoutResolutionService, LocaleId, ResolveError, RuntimeContext,
};

use super::deferred::DeferredQueue;
use super::reconcile::{FrameReport, HostSnapshot, PassOutcome, Reconciler};

/// Error type for session operations.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    /// Neither the requested locale nor the default locale has an input set.
    #[error("no input set for {requested} or default locale {default}")]
    NoUsableLocale { requested: LocaleId, default: LocaleId },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// A point-in-time signal from the host or the user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostSignal {
    /// Host callback values; reconciled by Pass A.
    HostChanged(HostSnapshot),
    /// Settled view frame; reconciled by Pass B.
    FrameSettled(FrameReport),
    /// The "autocapitalization enabled" user preference.
    PreferencesChanged { autocapitalization_enabled: bool },
}

impl HostSignal {
    fn kind(&self) -> PassKind {
        match self {
            HostSignal::HostChanged(_) => PassKind::Host,
            HostSignal::FrameSettled(_) => PassKind::Frame,
            HostSignal::PreferencesChanged { .. } => PassKind::Preferences,
        }
    }
}

/// Deferred-queue slot: a newer signal supersedes older ones of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PassKind {
    Host,
    Frame,
    Preferences,
}

/// Session-wide settings taken from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub default_locale: LocaleId,
    pub floating_threshold_percent: u32,
}

/// Records every field the context reports as changed.
#[derive(Debug, Default)]
struct ChangeLog {
    fields: Mutex<Vec<ContextField>>,
}

impl ChangeLog {
    fn take(&self) -> Vec<ContextField> {
        std::mem::take(&mut *self.fields.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ContextObserver for ChangeLog {
    fn context_changed(&self, field: ContextField) {
        self.fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(field);
    }
}

/// One keyboard activation.
pub struct KeyboardSession {
    id: Uuid,
    context: RuntimeContext,
    changes: Arc<ChangeLog>,
    queue: DeferredQueue<PassKind, HostSignal>,
    reconciler: Reconciler,
    service: LayoutResolutionService,
    catalog: Arc<InputSetCatalog>,
    default_locale: LocaleId,
    input_set: Option<Arc<InputSet>>,
    layout: Option<Arc<Layout>>,
    layout_snapshot: Vec<u8>,
    /// Set when a layout-relevant field changed; cleared by a successful resolution.
    needs_resolve: bool,
    resolutions: u64,
    publications: u64,
}

impl KeyboardSession {
    pub fn new(
        mut context: RuntimeContext,
        service: LayoutResolutionService,
        catalog: Arc<InputSetCatalog>,
        settings: SessionSettings,
    ) -> Self {
        let changes = Arc::new(ChangeLog::default());
        context.subscribe(Arc::clone(&changes) as Arc<dyn ContextObserver>);
        let id = Uuid::new_v4();
        info!(session = %id, locale = %context.locale(), "keyboard session created");

        Self {
            id,
            context,
            changes,
            queue: DeferredQueue::new(),
            reconciler: Reconciler::new(settings.floating_threshold_percent),
            service,
            catalog,
            default_locale: settings.default_locale,
            input_set: None,
            layout: None,
            layout_snapshot: Vec::new(),
            needs_resolve: true,
            resolutions: 0,
            publications: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    /// Read-only copy of the context for rendering.
    pub fn context_snapshot(&self) -> ContextSnapshot {
        self.context.snapshot()
    }

    /// The most recently published layout.
    pub fn layout(&self) -> Option<Arc<Layout>> {
        self.layout.clone()
    }

    /// Number of times the resolution service ran.
    pub fn resolution_count(&self) -> u64 {
        self.resolutions
    }

    /// Number of distinct layouts published.
    pub fn publication_count(&self) -> u64 {
        self.publications
    }

    /// `false` while the published layout lags behind the context because
    /// the last resolution failed.
    pub fn is_layout_current(&self) -> bool {
        !self.needs_resolve
    }

    /// Number of queued passes not yet run.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Registers an additional observer of context changes.
    pub fn subscribe(&mut self, observer: Arc<dyn ContextObserver>) {
        self.context.subscribe(observer);
    }

    /// Resolves and publishes the first layout.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if no layout can be resolved.
    pub fn activate(&mut self) -> Result<Arc<Layout>, SessionError> {
        self.changes.take();
        self.needs_resolve = true;
        self.refresh_layout()?;
        self.layout
            .clone()
            .ok_or_else(|| SessionError::NoUsableLocale {
                requested: self.context.locale().clone(),
                default: self.default_locale.clone(),
            })
    }

    /// Queues `signal` for the next [`run_pending`](Self::run_pending) and
    /// returns the generation it was stamped with.
    ///
    /// A host snapshot that supersedes a queued one inherits the locale and
    /// geometry the queued one reported and this one did not.
    pub fn receive(&mut self, mut signal: HostSignal) -> u64 {
        if let HostSignal::HostChanged(snapshot) = &mut signal {
            let queued = self.queue.latest_pending(&PassKind::Host);
            if let Some(HostSignal::HostChanged(queued)) = queued {
                snapshot.inherit_unreported(queued);
            }
        }
        let generation = self.queue.schedule(signal.kind(), signal);
        debug!(session = %self.id, generation, "host signal queued");
        generation
    }

    /// Runs every queued pass in order and returns one outcome per pass.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if a re-resolution fails.  Passes after the
    /// failing one stay queued, and every later pass retries the resolution
    /// until one succeeds.
    pub fn run_pending(&mut self) -> Result<Vec<PassOutcome>, SessionError> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(deferred) = self.queue.pop() {
            if self.queue.is_stale(&deferred) {
                debug!(
                    session = %self.id,
                    generation = deferred.generation,
                    "stale pass dropped"
                );
                outcomes.push(PassOutcome::Stale);
                continue;
            }

            self.apply(&deferred.task);
            let changed = self.changes.take();
            if changed.contains(&ContextField::Locale) {
                self.input_set = None;
            }
            if changed.iter().any(|field| field.affects_layout()) {
                self.needs_resolve = true;
            }
            if self.needs_resolve {
                self.refresh_layout()?;
            }

            if changed.is_empty() {
                outcomes.push(PassOutcome::Unchanged);
            } else {
                outcomes.push(PassOutcome::Applied { changed });
            }
        }
        Ok(outcomes)
    }

    fn apply(&mut self, signal: &HostSignal) {
        match signal {
            HostSignal::HostChanged(snapshot) => {
                self.reconciler.apply_host_snapshot(&mut self.context, snapshot);
            }
            HostSignal::FrameSettled(frame) => {
                let pass = self.reconciler.apply_frame_report(&mut self.context, frame);
                if pass.orientation_changed {
                    let settled = HostSnapshot::from_context(&self.context).with_geometry(frame);
                    self.reconciler.apply_host_snapshot(&mut self.context, &settled);
                }
            }
            HostSignal::PreferencesChanged {
                autocapitalization_enabled,
            } => {
                self.context
                    .set_autocapitalization_enabled(*autocapitalization_enabled);
            }
        }
    }

    fn current_input_set(&mut self) -> Result<Arc<InputSet>, SessionError> {
        if let Some(set) = &self.input_set {
            return Ok(Arc::clone(set));
        }
        let requested = self.context.locale();
        let set = match self.catalog.get(requested) {
            Some(set) => set,
            None => {
                warn!(
                    session = %self.id,
                    requested = %requested,
                    default = %self.default_locale,
                    "no input set for locale; using default locale"
                );
                self.catalog
                    .get(&self.default_locale)
                    .ok_or_else(|| SessionError::NoUsableLocale {
                        requested: requested.clone(),
                        default: self.default_locale.clone(),
                    })?
            }
        };
        self.input_set = Some(Arc::clone(&set));
        Ok(set)
    }

    /// Resolves a layout and publishes it if it differs from the current one.
    fn refresh_layout(&mut self) -> Result<(), SessionError> {
        let input_set = self.current_input_set()?;
        let configuration = LayoutConfiguration::lookup(
            self.context.device_type_for_keyboard(),
            self.context.orientation(),
        );
        let layout = self
            .service
            .resolve(&input_set, &self.context, &configuration)?;
        self.resolutions += 1;

        let snapshot = layout.snapshot_bytes().map_err(ResolveError::from)?;
        self.needs_resolve = false;
        if snapshot == self.layout_snapshot {
            debug!(session = %self.id, "resolved layout unchanged; not republished");
            return Ok(());
        }
        self.layout_snapshot = snapshot;
        self.layout = Some(Arc::new(layout));
        self.publications += 1;
        info!(
            session = %self.id,
            locale = %self.context.locale(),
            family = ?self.context.device_type_for_keyboard(),
            orientation = ?self.context.orientation(),
            publications = self.publications,
            "layout published"
        );
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use softkey_core::{DeviceFamily, KeyAction, KeyboardMode, Orientation, ScreenSize};

    mock! {
        Observer {}
        impl ContextObserver for Observer {
            fn context_changed(&self, field: ContextField);
        }
    }

    fn locale(s: &str) -> LocaleId {
        LocaleId::parse(s).unwrap()
    }

    fn session(loc: &str, family: DeviceFamily, width: u32, height: u32) -> KeyboardSession {
        let context = RuntimeContext::new(locale(loc), family, ScreenSize::new(width, height));
        KeyboardSession::new(
            context,
            LayoutResolutionService::default(),
            Arc::new(InputSetCatalog::with_builtin().unwrap()),
            SessionSettings {
                default_locale: locale("en-US"),
                floating_threshold_percent: 50,
            },
        )
    }

    fn frame(view_width: u32, width: u32, height: u32) -> HostSignal {
        HostSignal::FrameSettled(FrameReport {
            view_width,
            screen_size: ScreenSize::new(width, height),
        })
    }

    #[test]
    fn test_activate_publishes_first_layout() {
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);

        let layout = s.activate().unwrap();

        assert_eq!(layout.total_width, 375);
        assert_eq!(s.resolution_count(), 1);
        assert_eq!(s.publication_count(), 1);
    }

    #[test]
    fn test_receive_defers_until_run_pending() {
        // Arrange
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        s.activate().unwrap();

        // Act
        s.receive(HostSignal::HostChanged(HostSnapshot {
            has_dictation_key: true,
            ..HostSnapshot::default()
        }));

        // Assert
        assert_eq!(s.pending(), 1);
        assert!(!s.context().has_dictation_key());
        s.run_pending().unwrap();
        assert!(s.context().has_dictation_key());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn test_non_layout_change_does_not_resolve() {
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        s.activate().unwrap();

        s.receive(HostSignal::HostChanged(HostSnapshot {
            has_full_access: true,
            host_application_bundle_id: Some("com.example.mail".into()),
            ..HostSnapshot::default()
        }));
        let outcomes = s.run_pending().unwrap();

        assert!(matches!(outcomes[0], PassOutcome::Applied { .. }));
        assert_eq!(s.resolution_count(), 1);
    }

    #[test]
    fn test_identical_signal_twice_is_unchanged_second_time() {
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        s.activate().unwrap();
        let signal = HostSignal::HostChanged(HostSnapshot {
            has_dictation_key: true,
            ..HostSnapshot::default()
        });

        s.receive(signal.clone());
        s.run_pending().unwrap();
        s.receive(signal);
        let outcomes = s.run_pending().unwrap();

        assert_eq!(outcomes, vec![PassOutcome::Unchanged]);
        assert_eq!(s.resolution_count(), 2);
    }

    #[test]
    fn test_superseded_pass_is_stale_and_not_applied() {
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        s.activate().unwrap();

        s.receive(HostSignal::HostChanged(HostSnapshot {
            has_dictation_key: true,
            ..HostSnapshot::default()
        }));
        s.receive(HostSignal::HostChanged(HostSnapshot::default()));
        let outcomes = s.run_pending().unwrap();

        assert_eq!(outcomes, vec![PassOutcome::Stale, PassOutcome::Unchanged]);
        assert!(!s.context().has_dictation_key());
        assert_eq!(s.resolution_count(), 1);
    }

    #[test]
    fn test_superseding_partial_snapshot_keeps_queued_locale() {
        // Arrange
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        s.activate().unwrap();

        // Act
        s.receive(HostSignal::HostChanged(HostSnapshot {
            locale: Some(locale("de-DE")),
            ..HostSnapshot::default()
        }));
        s.receive(HostSignal::HostChanged(HostSnapshot {
            has_full_access: true,
            ..HostSnapshot::default()
        }));
        let outcomes = s.run_pending().unwrap();

        // Assert
        assert_eq!(outcomes[0], PassOutcome::Stale);
        assert!(matches!(
            &outcomes[1],
            PassOutcome::Applied { changed }
                if changed.contains(&ContextField::Locale)
                    && changed.contains(&ContextField::FullAccess)
        ));
        assert_eq!(s.context().locale(), &locale("de-DE"));
        assert!(s.context().has_full_access());
        assert_eq!(s.layout().unwrap().locale, locale("de-DE"));
    }

    #[test]
    fn test_failed_resolution_is_retried_until_context_fits() {
        // Arrange
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        s.activate().unwrap();
        let screen = |width| {
            HostSignal::HostChanged(HostSnapshot {
                screen_size: Some(ScreenSize::new(width, 812)),
                ..HostSnapshot::default()
            })
        };

        // Act: no row fits 40 points
        s.receive(screen(40));
        let too_narrow = s.run_pending();

        // Assert
        assert!(too_narrow.is_err());
        assert!(!s.is_layout_current());
        assert_eq!(s.layout().unwrap().total_width, 375, "last good layout kept");

        // Act: an unrelated pass retries and fails again
        s.receive(HostSignal::PreferencesChanged {
            autocapitalization_enabled: false,
        });
        let retried = s.run_pending();

        // Assert
        assert!(retried.is_err());
        assert!(!s.is_layout_current());

        // Act: a usable width arrives
        s.receive(screen(375));
        let outcomes = s.run_pending().unwrap();

        // Assert
        assert_eq!(outcomes.len(), 1);
        assert!(s.is_layout_current());
        let layout = s.layout().unwrap();
        assert_eq!(layout.total_width, s.context().screen_size().width);
        assert_eq!(s.context().screen_size().width, 375);
    }

    #[test]
    fn test_dictation_change_republishes_layout() {
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        let first = s.activate().unwrap();

        s.receive(HostSignal::HostChanged(HostSnapshot {
            has_dictation_key: true,
            ..HostSnapshot::default()
        }));
        s.run_pending().unwrap();
        let second = s.layout().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second
            .page(KeyboardMode::Alphabetic)
            .bottom_row()
            .and_then(|row| row.find(&KeyAction::Dictation))
            .is_some());
        assert_eq!(s.publication_count(), 2);
    }

    #[test]
    fn test_floating_frame_switches_to_phone_layout() {
        let mut s = session("en-US", DeviceFamily::Pad, 768, 1024);
        s.activate().unwrap();

        s.receive(frame(320, 768, 1024));
        s.run_pending().unwrap();

        assert_eq!(s.layout().unwrap().family, DeviceFamily::Phone);
        assert!(s.context().is_keyboard_floating());
    }

    #[test]
    fn test_rotation_in_frame_report_reruns_host_pass() {
        let mut s = session("en-US", DeviceFamily::Pad, 768, 1024);
        s.activate().unwrap();

        s.receive(frame(1024, 1024, 768));
        let outcomes = s.run_pending().unwrap();

        assert_eq!(s.context().orientation(), Orientation::Landscape);
        assert_eq!(s.context().screen_size(), ScreenSize::new(1024, 768));
        assert_eq!(s.layout().unwrap().total_width, 1024);
        match &outcomes[0] {
            PassOutcome::Applied { changed } => {
                assert!(changed.contains(&ContextField::Orientation));
                assert!(changed.contains(&ContextField::ScreenSize));
            }
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_locale_falls_back_to_default_input_set() {
        let mut s = session("xx-YY", DeviceFamily::Phone, 375, 812);

        let layout = s.activate().unwrap();

        assert_eq!(layout.locale, locale("xx-YY"));
        assert_eq!(layout.page(KeyboardMode::Alphabetic).rows.len(), 4);
    }

    #[test]
    fn test_locale_change_reloads_input_set() {
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        s.activate().unwrap();

        s.receive(HostSignal::HostChanged(HostSnapshot {
            locale: Some(locale("de-DE")),
            ..HostSnapshot::default()
        }));
        s.run_pending().unwrap();

        let layout = s.layout().unwrap();
        let top = &layout.page(KeyboardMode::Alphabetic).rows[0];
        assert_eq!(top.items.len(), 11, "german top row carries ü");
    }

    #[test]
    fn test_preference_change_notifies_observer_without_resolving() {
        // Arrange
        let mut s = session("en-US", DeviceFamily::Phone, 375, 812);
        s.activate().unwrap();
        let mut observer = MockObserver::new();
        observer
            .expect_context_changed()
            .withf(|field| {
                matches!(
                    field,
                    ContextField::AutocapitalizationEnabled
                        | ContextField::AutocapitalizationOverride
                )
            })
            .times(2)
            .return_const(());
        s.subscribe(Arc::new(observer));

        // Act
        s.receive(HostSignal::PreferencesChanged {
            autocapitalization_enabled: false,
        });
        s.run_pending().unwrap();

        // Assert
        assert_eq!(s.resolution_count(), 1);
        assert_eq!(
            s.context_snapshot().autocapitalization_type,
            softkey_core::AutocapitalizationType::None
        );
    }

    #[test]
    fn test_no_usable_locale_is_reported() {
        let context =
            RuntimeContext::new(locale("xx"), DeviceFamily::Phone, ScreenSize::new(375, 812));
        let mut s = KeyboardSession::new(
            context,
            LayoutResolutionService::default(),
            Arc::new(InputSetCatalog::new()),
            SessionSettings {
                default_locale: locale("en-US"),
                floating_threshold_percent: 50,
            },
        );

        assert_eq!(
            s.activate(),
            Err(SessionError::NoUsableLocale {
                requested: locale("xx"),
                default: locale("en-US"),
            })
        );
    }
}
