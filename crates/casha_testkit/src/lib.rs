//! # Casha Testkit
//!
//! Test utilities for Casha sync.
//!
//! This crate provides:
//! - Payload and record fixtures with fixed timestamps
//! - A fault-injecting record store wrapper
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use casha_testkit::prelude::*;
//!
//! let store = seeded_store([synced_record("bg_7", budget("Food", dec!(500), dec!(0)), at_minute(0))]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
