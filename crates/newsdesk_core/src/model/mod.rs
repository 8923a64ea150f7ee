//! Domain model for news/event records.
//!
//! # Responsibility
//! - Define the record shape shared by the collection, the client cache and
//!   rendering.
//! - Keep form/draft state types next to the record they produce.

pub mod record;
