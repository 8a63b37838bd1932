//! POI Sync Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared checksums and logging setup for the POI sync workspace members.
//!
//! # Example
//!
//! ```no_run
//! use poi_common::checksum::sha256_hex;
//!
//! let digest = sha256_hex(b"555-0100");
//! assert_eq!(digest.len(), 64);
//! ```

pub mod checksum;
pub mod logging;
