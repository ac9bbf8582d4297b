//! Foundation types for Strata.
//!
//! Every object in a Strata repository (commit, directory tree, directory
//! metadata, file content) is named by its checksum. This crate defines that
//! checksum type and the errors produced when parsing it. Every other Strata
//! crate depends on `strata-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- 32-byte content checksum, displayed as 64 hex characters

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
