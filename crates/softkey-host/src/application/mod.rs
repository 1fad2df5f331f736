//! Application layer: the keyboard session and its reconciliation protocol.
//!
//! # What lives here?
//!
//! - **`deferred`** – A FIFO of host callbacks stamped with a generation
//!   counter, so superseded callbacks are detected and dropped.
//!
//! - **`reconcile`** – The two reconciliation passes that write host values
//!   into the runtime context: Pass A for host callbacks, Pass B for settled
//!   frames (floating detection).
//!
//! - **`session`** – `KeyboardSession`, which owns one context, drains the
//!   deferred queue and re-resolves the layout only when a layout-relevant
//!   field changed.

pub mod deferred;
pub mod reconcile;
pub mod session;
