//! Infrastructure layer for the host application.
//!
//! Contains the file-facing adapters: TOML configuration and the scripted
//! host that replays recorded signals into a session.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `softkey_core`, but MUST NOT be imported by the `application` layer.

pub mod host;
pub mod storage;
