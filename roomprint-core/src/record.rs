//! Portable Records for External Persistence
//!
//! Every stateful entity can be written out as a nested key-value structure
//! and read back. The storage layer owns atomicity, versioning and files; this
//! crate only guarantees:
//!
//! 1. **Round-trip fidelity**: feeding back an unmodified record reproduces
//!    identical estimates, variances and sample counts, and therefore identical
//!    subsequent behaviour.
//! 2. **Tolerant defaults**: absent optional keys (timestamps, the button pool)
//!    fall back to documented defaults.
//! 3. **Fail fast on broken structure**: absent required keys (estimate,
//!    variance, scanner identity) are a [`RecordError::MissingField`].
//!
//! Each entity exposes a typed record (`Self::Record`, plain serde structs) and
//! the untyped [`serde_json::Value`] form used at the storage boundary.
//!
//! ```rust
//! use roomprint_core::{Kalman1D, PortableRecord};
//!
//! let mut filter = Kalman1D::default();
//! filter.update(-62.0, Some(10.0));
//! filter.update(-64.0, Some(11.0));
//!
//! let stored = filter.to_portable_record();
//! let restored = Kalman1D::from_portable_record(&stored).unwrap();
//! assert_eq!(restored.estimate(), filter.estimate());
//! assert_eq!(restored.variance(), filter.variance());
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{RecordError, RecordResult};

/// Conversion between an entity and its persisted form
///
/// Tuning parameters are not persisted; they are supplied again through
/// `Config` when a record is loaded.
pub trait PortableRecord: Sized {
    /// Typed record
    type Record: Serialize + DeserializeOwned;

    /// Configuration needed to rebuild the entity
    type Config: Default;

    /// Snapshot the entity
    fn to_record(&self) -> Self::Record;

    /// Rebuild from a typed record
    fn from_record(record: Self::Record, config: &Self::Config) -> RecordResult<Self>;

    /// Snapshot as an untyped key-value structure
    fn to_portable_record(&self) -> Value {
        // Records only contain numbers, strings and string-keyed maps
        serde_json::to_value(self.to_record()).unwrap_or(Value::Null)
    }

    /// Rebuild from an untyped structure with default configuration
    fn from_portable_record(value: &Value) -> RecordResult<Self> {
        Self::from_portable_record_with(value, &Self::Config::default())
    }

    /// Rebuild from an untyped structure with explicit configuration
    fn from_portable_record_with(value: &Value, config: &Self::Config) -> RecordResult<Self> {
        let record: Self::Record = serde_json::from_value(value.clone())?;
        Self::from_record(record, config)
    }
}

/// Unwrap a required record field
pub(crate) fn require<T>(field: &'static str, value: Option<T>) -> RecordResult<T> {
    value.ok_or(RecordError::MissingField { field })
}

/// Reject non-finite estimates
pub(crate) fn check_estimate(field: &'static str, value: f64) -> RecordResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RecordError::InvalidField {
            field,
            reason: "must be finite",
        })
    }
}

/// Reject negative or non-finite variances
pub(crate) fn check_variance(field: &'static str, value: f64) -> RecordResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RecordError::InvalidField {
            field,
            reason: "must be finite and >= 0",
        })
    }
}
