//! Signal estimation and room fingerprint matching for Roomprint
//!
//! Turns noisy, irregularly timed RSSI samples from fixed scanners into
//! stable estimates with calibrated uncertainty, and scores which room a
//! device is in, including rooms without a scanner of their own.
//!
//! Key constraints:
//! - Synchronous, no I/O, no internal locking
//! - `no_std` + `alloc` capable
//! - Numerically stable over unbounded sessions
//!
//! ## Data Flow
//!
//! ```text
//! (scanner, rssi, t) ──► Kalman1D / AdaptiveEma
//!                    ──► DualPoolEstimator ──► PairCorrelation / AbsoluteSignalProfile
//!                                          ──► AreaProfile / RoomProfile ──► scores
//!                    ──► MultiScannerFilter ──► match_fingerprints(AreaProfiles)
//! ```
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use roomprint_core::RoomProfile;
//!
//! let mut lounge = RoomProfile::new("lounge");
//! let seen: BTreeMap<String, f64> =
//!     [("S1".to_string(), -60.0), ("S2".to_string(), -70.0)].into_iter().collect();
//! for _ in 0..50 {
//!     lounge.update(&seen);
//! }
//! assert!(lounge.get_match_score(&seen) > 0.7);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

mod logging;

pub mod constants;
pub mod correlation;
pub mod errors;
pub mod filters;
pub mod matrix;
pub mod record;
pub mod scoring;
pub mod store;
pub mod time;

// Public API
pub use correlation::{
    AbsoluteSignalProfile, AreaProfile, CorrelationConfig, DualPoolEstimator, PairCorrelation,
    RoomProfile,
};
pub use errors::{ConfigError, ConfigResult, RecordError, RecordResult};
pub use filters::{
    AdaptiveEma, FilterConfig, FilterKind, FingerprintMatch, Kalman1D, MultiScannerFilter,
    ScalarFilter, SignalFilter,
};
pub use record::PortableRecord;
pub use store::ProfileStore;
pub use time::Timestamp;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
