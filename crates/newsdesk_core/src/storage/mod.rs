//! Object storage contracts for record images.
//!
//! # Responsibility
//! - Define the upload/public-url/delete-by-url boundary used by the client.
//! - Derive object paths from user file names.

pub mod object_store;
