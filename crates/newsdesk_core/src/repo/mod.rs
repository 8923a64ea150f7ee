//! Document collection contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the remote document collection boundary used by the client.
//! - Isolate SQLite details from the client's cache orchestration.
//!
//! # Invariants
//! - `add` returns a server-generated id that is unique in the collection.
//! - `update`/`delete` on unknown ids return `NotFound`, never succeed silently.

pub mod collection;
