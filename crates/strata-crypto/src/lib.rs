//! Checksumming primitives for Strata.
//!
//! Provides domain-separated BLAKE3 hashing. Each object kind hashes under its
//! own domain tag so that identical bytes stored as different kinds never share
//! a checksum.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
