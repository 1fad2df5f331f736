//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration from the platform
//! config directory (or an explicit path), supplies defaults for anything
//! missing, and converts `[[overrides]]` entries into registry strategies.

pub mod config;
