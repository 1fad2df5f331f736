//! Domain entities for the Softkey keyboard.
//!
//! Pure data types with no I/O: locales, input sets, device geometry,
//! resolved layouts, and the runtime context.  Everything else in the
//! workspace depends on these types; they depend on nothing but `serde`,
//! `bincode` and `thiserror`.

pub mod configuration;
pub mod context;
pub mod input_set;
pub mod layout;
pub mod locale;
