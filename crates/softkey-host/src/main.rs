//! Softkey host entry point.
//!
//! Replays a recorded host scenario through a keyboard session and prints
//! the final layout and context as JSON.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML config (defaults when absent)
//!  └─ register overrides       -- [[overrides]] -> LocaleOverrideRegistry
//!  └─ KeyboardSession::new()   -- context from the scenario's [device]
//!  └─ session.activate()       -- first layout
//!  └─ ScriptedHost::spawn()    -- host task sending signals over mpsc
//!  └─ drive()                  -- owner task: queue bursts, run passes
//!  └─ print JSON report
//! ```
//!
//! Usage: `softkey-host [--config PATH] SCENARIO.toml`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use softkey_core::{
    ContextSnapshot, InputSetCatalog, Layout, LayoutResolutionService, LocaleOverrideRegistry,
};
use softkey_host::application::reconcile::PassOutcome;
use softkey_host::application::session::{KeyboardSession, SessionSettings};
use softkey_host::infrastructure::host::{drive, load_script, ScriptedHost};
use softkey_host::infrastructure::storage::config::{load_config, load_config_from, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Replays a recorded host scenario and prints the resolved layout.
#[derive(Debug, Parser)]
#[command(
    name = "softkey-host",
    about = "Replay host signals through a Softkey keyboard session",
    version
)]
struct Cli {
    /// Configuration file; the platform config file is used when omitted.
    #[arg(long, env = "SOFTKEY_CONFIG")]
    config: Option<PathBuf>,

    /// Scenario TOML file to replay.
    scenario: PathBuf,
}

/// JSON document printed on completion.
#[derive(Debug, Serialize)]
struct SessionReport<'a> {
    session_id: Uuid,
    passes_applied: usize,
    passes_unchanged: usize,
    passes_stale: usize,
    resolutions: u64,
    publications: u64,
    context: ContextSnapshot,
    layout: Option<&'a Layout>,
}

fn load(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => load_config().context("loading platform config")?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    // `RUST_LOG` wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level)),
        )
        .init();

    info!("Softkey host starting");

    // ── Override registry ─────────────────────────────────────────────────────
    let registry = Arc::new(LocaleOverrideRegistry::new());
    for entry in &config.overrides {
        let (locale, strategy) = entry
            .to_override()
            .with_context(|| format!("override '{}' for {}", entry.name, entry.locale))?;
        if let Err(e) = registry.try_register(locale, strategy) {
            warn!("override '{}' skipped: {e}", entry.name);
        }
    }
    info!(overrides = registry.len(), "locale overrides registered");

    // ── Session ───────────────────────────────────────────────────────────────
    let script = load_script(&cli.scenario)
        .with_context(|| format!("loading scenario {}", cli.scenario.display()))?;
    let default_locale = config.keyboard.default_locale()?;
    let mut context = script.device.context(&default_locale);
    context.set_autocapitalization_enabled(config.keyboard.autocapitalization_enabled);

    let catalog = Arc::new(InputSetCatalog::with_builtin()?);
    let mut session = KeyboardSession::new(
        context,
        LayoutResolutionService::new(registry),
        catalog,
        SessionSettings {
            default_locale,
            floating_threshold_percent: config.keyboard.floating_threshold()?,
        },
    );
    session.activate()?;

    // ── Replay ────────────────────────────────────────────────────────────────
    let (rx, host) = ScriptedHost::new(script.steps).spawn();
    let outcomes = drive(&mut session, rx).await;
    let delivered = host.await?;
    info!(delivered, "scenario replayed");

    let count = |f: fn(&PassOutcome) -> bool| outcomes.iter().filter(|o| f(o)).count();
    let layout = session.layout();
    let report = SessionReport {
        session_id: session.id(),
        passes_applied: count(|o| matches!(o, PassOutcome::Applied { .. })),
        passes_unchanged: count(|o| matches!(o, PassOutcome::Unchanged)),
        passes_stale: count(|o| matches!(o, PassOutcome::Stale)),
        resolutions: session.resolution_count(),
        publications: session.publication_count(),
        context: session.context_snapshot(),
        layout: layout.as_deref(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("Softkey host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
