//! Client-side use-case services.
//!
//! # Responsibility
//! - Keep the local record cache in sync with the remote stores.
//! - Keep UI/CLI layers decoupled from collection and storage details.

pub mod record_service;
