//! End-to-end tests for the keyboard session.
//!
//! Host signals travel through a real `mpsc` channel into [`drive`], so these
//! tests cover burst coalescing, the two reconciliation passes, publication
//! rules and configuration-fed overrides together.

use std::sync::Arc;

use tokio::sync::mpsc;

use softkey_core::{
    ContextField, DeviceFamily, InputSetCatalog, KeyAction, KeyboardMode, LayoutResolutionService,
    LocaleId, LocaleOverrideRegistry, Orientation, RuntimeContext, ScreenSize, StrategyTier,
};
use softkey_host::application::reconcile::{FrameReport, HostSnapshot, PassOutcome};
use softkey_host::application::session::{
    HostSignal, KeyboardSession, SessionError, SessionSettings,
};
use softkey_host::infrastructure::host::{drive, parse_script, ScriptedHost};
use softkey_host::infrastructure::storage::config::AppConfig;

fn locale(s: &str) -> LocaleId {
    LocaleId::parse(s).expect("valid locale")
}

fn session_with(
    loc: &str,
    family: DeviceFamily,
    width: u32,
    height: u32,
    service: LayoutResolutionService,
    default_locale: &str,
) -> KeyboardSession {
    KeyboardSession::new(
        RuntimeContext::new(locale(loc), family, ScreenSize::new(width, height)),
        service,
        Arc::new(InputSetCatalog::with_builtin().expect("builtin catalog")),
        SessionSettings {
            default_locale: locale(default_locale),
            floating_threshold_percent: 50,
        },
    )
}

fn session(loc: &str, family: DeviceFamily, width: u32, height: u32) -> KeyboardSession {
    session_with(loc, family, width, height, LayoutResolutionService::default(), "en-US")
}

/// Sends `signals` as one burst and drives the session until the channel closes.
fn replay_burst(session: &mut KeyboardSession, signals: Vec<HostSignal>) -> Vec<PassOutcome> {
    let (tx, rx) = mpsc::channel(signals.len().max(1));
    for signal in signals {
        tx.try_send(signal).expect("channel has room for the burst");
    }
    drop(tx);
    tokio_test::block_on(drive(session, rx))
}

fn host_locale(loc: &str) -> HostSignal {
    HostSignal::HostChanged(HostSnapshot {
        locale: Some(locale(loc)),
        ..HostSnapshot::default()
    })
}

fn first_row_outputs(session: &KeyboardSession) -> Vec<String> {
    let layout = session.layout().expect("published layout");
    layout.page(KeyboardMode::Alphabetic).rows[0]
        .items
        .iter()
        .filter_map(|item| match &item.action {
            KeyAction::Character(c) => Some(c.output.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_burst_of_host_changes_applies_only_the_latest() {
    // Arrange
    let mut session = session("en-US", DeviceFamily::Phone, 375, 812);
    session.activate().unwrap();

    // Act
    let outcomes = replay_burst(&mut session, vec![host_locale("de-DE"), host_locale("fr-FR")]);

    // Assert
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0], PassOutcome::Stale);
    assert!(matches!(
        &outcomes[1],
        PassOutcome::Applied { changed } if changed.contains(&ContextField::Locale)
    ));
    assert_eq!(session.context().locale(), &locale("fr-FR"));
    assert_eq!(session.layout().unwrap().locale, locale("fr-FR"));
    assert_eq!(first_row_outputs(&session)[0], "a", "AZERTY first row");
    assert_eq!(session.resolution_count(), 2, "the stale pass never resolved");
}

#[test]
fn test_burst_of_partial_host_snapshots_keeps_every_reported_value() {
    // Arrange
    let mut session = session("en-US", DeviceFamily::Phone, 375, 812);
    session.activate().unwrap();

    // Act
    let outcomes = replay_burst(
        &mut session,
        vec![
            host_locale("de-DE"),
            HostSignal::HostChanged(HostSnapshot {
                has_full_access: true,
                ..HostSnapshot::default()
            }),
        ],
    );

    // Assert
    assert_eq!(outcomes[0], PassOutcome::Stale);
    assert!(matches!(
        &outcomes[1],
        PassOutcome::Applied { changed }
            if changed.contains(&ContextField::Locale)
                && changed.contains(&ContextField::FullAccess)
    ));
    assert_eq!(session.context().locale(), &locale("de-DE"));
    assert!(session.context().has_full_access());
    assert_eq!(session.layout().unwrap().locale, locale("de-DE"));
}

#[test]
fn test_signals_of_different_kinds_do_not_supersede_each_other() {
    let mut session = session("en-US", DeviceFamily::Pad, 768, 1024);
    session.activate().unwrap();

    let outcomes = replay_burst(
        &mut session,
        vec![
            host_locale("de-DE"),
            HostSignal::FrameSettled(FrameReport {
                view_width: 768,
                screen_size: ScreenSize::new(768, 1024),
            }),
            HostSignal::PreferencesChanged {
                autocapitalization_enabled: false,
            },
        ],
    );

    assert!(!outcomes.contains(&PassOutcome::Stale));
    assert_eq!(session.context().locale(), &locale("de-DE"));
    assert!(!session.context().autocapitalization_enabled());
}

#[test]
fn test_reapplying_current_host_values_is_unchanged_and_not_republished() {
    // Arrange
    let mut session = session("en-US", DeviceFamily::Phone, 375, 812);
    session.activate().unwrap();
    let same = HostSnapshot::from_context(session.context());

    // Act
    let outcomes = replay_burst(&mut session, vec![HostSignal::HostChanged(same)]);

    // Assert
    assert_eq!(outcomes, vec![PassOutcome::Unchanged]);
    assert_eq!(session.resolution_count(), 1);
    assert_eq!(session.publication_count(), 1);
}

#[test]
fn test_host_application_change_does_not_resolve_layout() {
    let mut session = session("en-US", DeviceFamily::Phone, 375, 812);
    session.activate().unwrap();
    let mut snapshot = HostSnapshot::from_context(session.context());
    snapshot.host_application_bundle_id = Some("com.example.mail".to_string());

    let outcomes = replay_burst(&mut session, vec![HostSignal::HostChanged(snapshot)]);

    assert_eq!(
        outcomes,
        vec![PassOutcome::Applied {
            changed: vec![ContextField::HostApplication]
        }]
    );
    assert_eq!(session.resolution_count(), 1);
    assert_eq!(
        session.context().host_application_bundle_id(),
        Some("com.example.mail")
    );
}

#[test]
fn test_floating_pad_publishes_phone_layout_and_docking_restores_pad() {
    // Arrange
    let mut session = session("en-US", DeviceFamily::Pad, 768, 1024);
    let docked = session.activate().unwrap();
    assert_eq!(docked.family, DeviceFamily::Pad);

    // Act: float
    replay_burst(
        &mut session,
        vec![HostSignal::FrameSettled(FrameReport {
            view_width: 320,
            screen_size: ScreenSize::new(768, 1024),
        })],
    );

    // Assert
    assert!(session.context().is_keyboard_floating());
    assert_eq!(session.layout().unwrap().family, DeviceFamily::Phone);
    assert_eq!(session.publication_count(), 2);

    // Act: dock again
    replay_burst(
        &mut session,
        vec![HostSignal::FrameSettled(FrameReport {
            view_width: 768,
            screen_size: ScreenSize::new(768, 1024),
        })],
    );

    // Assert
    assert!(!session.context().is_keyboard_floating());
    let restored = session.layout().unwrap();
    assert_eq!(restored.family, DeviceFamily::Pad);
    assert_eq!(*restored, *docked, "docking reproduces the original layout");
    assert_eq!(session.publication_count(), 3);
}

#[test]
fn test_rotation_in_frame_report_updates_geometry_and_layout() {
    let mut session = session("en-US", DeviceFamily::Pad, 768, 1024);
    session.activate().unwrap();

    let outcomes = replay_burst(
        &mut session,
        vec![HostSignal::FrameSettled(FrameReport {
            view_width: 1024,
            screen_size: ScreenSize::new(1024, 768),
        })],
    );

    match &outcomes[..] {
        [PassOutcome::Applied { changed }] => {
            assert!(changed.contains(&ContextField::Orientation));
            assert!(changed.contains(&ContextField::ScreenSize));
        }
        other => panic!("expected one applied pass, got {other:?}"),
    }
    assert_eq!(session.context().orientation(), Orientation::Landscape);
    let layout = session.layout().unwrap();
    assert_eq!(layout.orientation, Orientation::Landscape);
    assert_eq!(layout.total_width, 1024);
}

#[test]
fn test_unfittable_frame_does_not_end_the_session() {
    // Arrange
    let mut session = session("en-US", DeviceFamily::Phone, 375, 812);
    session.activate().unwrap();

    // Act
    let outcomes = replay_burst(
        &mut session,
        vec![
            HostSignal::FrameSettled(FrameReport {
                view_width: 40,
                screen_size: ScreenSize::new(40, 812),
            }),
            HostSignal::PreferencesChanged {
                autocapitalization_enabled: false,
            },
            HostSignal::HostChanged(HostSnapshot {
                screen_size: Some(ScreenSize::new(375, 812)),
                ..HostSnapshot::default()
            }),
        ],
    );

    // Assert
    assert_eq!(outcomes.len(), 1, "both failed passes are logged, not reported");
    assert!(session.is_layout_current());
    assert!(!session.context().autocapitalization_enabled());
    let layout = session.layout().unwrap();
    assert_eq!(layout.total_width, session.context().screen_size().width);
}

#[test]
fn test_config_override_reaches_resolution_through_language_tier() {
    // Arrange
    let cfg: AppConfig = toml::from_str(
        r#"
[[overrides]]
locale = "de"
name = "german-compact"
alphabetic = ["q w e r t z u i o p", "a s d f g h j k l", "y x c v b n m"]
"#,
    )
    .expect("config parses");
    let registry = Arc::new(LocaleOverrideRegistry::new());
    for entry in &cfg.overrides {
        let (loc, strategy) = entry.to_override().expect("valid override");
        registry.try_register(loc, strategy).expect("first registration");
    }
    let mut session = session_with(
        "de-AT",
        DeviceFamily::Phone,
        375,
        812,
        LayoutResolutionService::new(registry),
        "en-US",
    );

    // Act
    let layout = session.activate().unwrap();

    // Assert
    assert_eq!(layout.strategy.tier, StrategyTier::Language);
    assert_eq!(layout.strategy.name.as_deref(), Some("german-compact"));
    let first_row = first_row_outputs(&session);
    assert_eq!(first_row.len(), 10);
    assert!(!first_row.iter().any(|key| key == "ü"));
}

#[test]
fn test_unknown_locale_falls_back_to_default_input_set() {
    let mut session = session("xx-YY", DeviceFamily::Phone, 375, 812);

    let layout = session.activate().expect("default locale covers the gap");

    assert_eq!(layout.locale, locale("xx-YY"));
    assert_eq!(first_row_outputs(&session)[0], "q", "QWERTY from en-US");
}

#[test]
fn test_unknown_locale_without_usable_default_fails() {
    let mut session = session_with(
        "xx-YY",
        DeviceFamily::Phone,
        375,
        812,
        LayoutResolutionService::default(),
        "zz",
    );

    let result = session.activate();

    assert_eq!(
        result,
        Err(SessionError::NoUsableLocale {
            requested: locale("xx-YY"),
            default: locale("zz"),
        })
    );
    assert!(session.layout().is_none());
}

#[test]
fn test_scripted_scenario_end_to_end() {
    // Arrange
    let script = parse_script(
        r#"
[device]
family = "phone"
width = 375
height = 812
locale = "en-US"

[[steps]]
kind = "host_changed"
locale = "es-ES"
has_dictation_key = true
needs_input_mode_switch_key = true

[[steps]]
kind = "preferences_changed"
autocapitalization_enabled = false
"#,
    )
    .expect("scenario parses");
    let device = &script.device;
    let mut session = session("en-US", device.family, device.width, device.height);
    session.activate().unwrap();

    // Act
    let outcomes = tokio_test::block_on(async {
        let (rx, host) = ScriptedHost::new(script.steps.clone()).spawn();
        let outcomes = drive(&mut session, rx).await;
        assert_eq!(host.await.expect("host task"), 2);
        outcomes
    });

    // Assert
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| matches!(o, PassOutcome::Applied { .. })));
    assert_eq!(session.context().locale(), &locale("es-ES"));
    let layout = session.layout().unwrap();
    let bottom = layout
        .page(KeyboardMode::Alphabetic)
        .bottom_row()
        .expect("bottom row");
    assert!(bottom.find(&KeyAction::Dictation).is_some());
    assert!(bottom.find(&KeyAction::NextKeyboard).is_some());
}
