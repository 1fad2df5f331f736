//! softkey-host library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does softkey-host do? (for beginners)
//!
//! `softkey-core` knows how to turn a locale and a device description into a
//! keyboard layout.  This crate keeps that description up to date while a
//! keyboard is on screen:
//!
//! 1. The host (the app showing the keyboard) reports point-in-time values:
//!    focus changes, rotations, the settled width of the keyboard view.
//! 2. Each report is queued rather than applied inline, so the keyboard
//!    never sees a half-finished host layout pass.
//! 3. Queued reports are reconciled into the runtime context.  Writes are
//!    idempotent, and superseded reports are dropped.
//! 4. When a layout-relevant field changed, the layout is resolved again and
//!    published if it actually differs.
//!
//! The binary replays a recorded scenario through this pipeline and prints
//! the final layout as JSON.

/// Application layer: session, deferred queue and reconciliation passes.
pub mod application;

/// Infrastructure layer: configuration files and the scripted host.
pub mod infrastructure;
