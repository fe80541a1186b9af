//! Error Types for Records and Configuration
//!
//! ## Design Philosophy
//!
//! Most of the estimation engine never fails. Noisy radio data is the normal
//! case, so degenerate inputs are answered with documented fallbacks instead
//! of errors:
//!
//! - An out-of-range reference power is replaced by a safe default.
//! - A zero variance yields a z-score of 0.
//! - A profile with too little data yields a neutral score or no result.
//!
//! Errors are reserved for contract violations by the caller:
//!
//! ### Record Violations
//! - `RecordError::MissingField`: a required key (such as a scanner identity)
//!   is absent from a stored record. Nothing sensible can be substituted.
//! - `RecordError::InvalidField`: a key is present but holds an impossible
//!   value (negative variance, NaN estimate).
//! - `RecordError::Malformed`: the record is not the expected shape at all.
//! - `RecordError::UnsupportedVersion`: a snapshot written by a newer format.
//!
//! ### Configuration Violations
//! - `ConfigError::InvalidParameter`: a tuning constant outside its domain
//!   (zero measurement noise, EMA alpha outside (0, 1], ...).
//! - `ConfigError::UnknownFilterKind`: a filter tag the factory does not know.
//!
//! Matrix failures live next to the kernel in [`crate::matrix::MatrixError`]
//! because callers are expected to recover from them locally.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use roomprint_core::{AreaProfile, PortableRecord, RecordError};
//! use serde_json::json;
//!
//! let stored = json!({ "area_id": "kitchen", "correlations": [{ "estimate": 3.0 }] });
//! match AreaProfile::from_portable_record(&stored) {
//!     Ok(profile) => { let _ = profile; }
//!     Err(RecordError::MissingField { field }) => {
//!         // Storage layer wrote a broken record - discard it
//!         assert_eq!(field, "scanner");
//!     }
//!     Err(_) => {}
//! }
//! ```

use alloc::string::String;

use thiserror_no_std::Error;

/// Result type for record decoding
pub type RecordResult<T> = Result<T, RecordError>;

/// Result type for configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while decoding a portable record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A required key is absent
    #[error("Record is missing required field `{field}`")]
    MissingField {
        /// Name of the absent key
        field: &'static str,
    },

    /// A key is present but its value cannot be used
    #[error("Record field `{field}` is invalid: {reason}")]
    InvalidField {
        /// Name of the offending key
        field: &'static str,
        /// Why the value was rejected
        reason: &'static str,
    },

    /// The record does not have the expected structure
    #[error("Malformed record: {message}")]
    Malformed {
        /// Decoder message
        message: String,
    },

    /// Snapshot version is newer than this build understands
    #[error("Unsupported record version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        /// Version stored in the record
        found: u32,
        /// Newest version this build can read
        supported: u32,
    },
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Malformed {
            message: alloc::format!("{}", err),
        }
    }
}

/// Errors raised by configuration validation
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Parameter outside its valid domain
    #[error("Invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: f64,
        /// Constraint that was violated
        reason: &'static str,
    },

    /// Filter tag not recognised by the factory
    #[error("Unknown filter kind, expected `kalman` or `adaptive_ema`")]
    UnknownFilterKind,
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        ConfigError::InvalidParameter { name, value, reason }
    }
}

/// Fail with `InvalidParameter` unless `value` is finite and strictly positive
pub(crate) fn require_positive(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, value, "must be finite and > 0"))
    }
}

/// Fail with `InvalidParameter` unless `value` is finite and not negative
pub(crate) fn require_non_negative(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, value, "must be finite and >= 0"))
    }
}
