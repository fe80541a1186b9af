//! In-Memory Profile Store
//!
//! Holds every learned profile for a host:
//!
//! ```text
//! areas   device → area → AreaProfile     (per-device fingerprints)
//! rooms   area → RoomProfile              (shared across devices)
//! ```
//!
//! The host persists the store by writing [`PortableRecord::to_portable_record`]
//! wherever it likes and feeding it back through
//! [`PortableRecord::from_portable_record`]. Snapshots carry a format version;
//! a snapshot without one is read as version 1, a newer one is rejected.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use roomprint_core::{PortableRecord, ProfileStore};
//!
//! let mut store = ProfileStore::default();
//! let others: BTreeMap<String, f64> = [("hall".to_string(), -71.0)].into_iter().collect();
//! store.area_profile_mut("aa:bb:cc", "kitchen").update(-58.0, &others, None);
//!
//! let snapshot = store.to_portable_record();
//! let restored = ProfileStore::from_portable_record(&snapshot).unwrap();
//! assert_eq!(restored.area_count(), 1);
//! ```

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::correlation::{AreaProfile, AreaRecord, CorrelationConfig, RoomProfile, RoomRecord};
use crate::errors::{RecordError, RecordResult};
use crate::logging::log_info;
use crate::record::PortableRecord;

/// Newest snapshot format this build writes and reads
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Format version, 1 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Area profiles per device
    #[serde(default)]
    pub devices: BTreeMap<String, Vec<AreaRecord>>,
    /// Room profiles
    #[serde(default)]
    pub rooms: Vec<RoomRecord>,
}

/// Every area and room profile known to a host
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileStore {
    config: CorrelationConfig,
    areas: BTreeMap<String, BTreeMap<String, AreaProfile>>,
    rooms: BTreeMap<String, RoomProfile>,
}

impl ProfileStore {
    /// Empty store creating profiles with `config`
    pub fn new(config: CorrelationConfig) -> Self {
        Self {
            config,
            areas: BTreeMap::new(),
            rooms: BTreeMap::new(),
        }
    }

    /// Configuration given to new profiles
    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Profile of `device` in `area`, if any
    pub fn area_profile(&self, device: &str, area: &str) -> Option<&AreaProfile> {
        self.areas.get(device)?.get(area)
    }

    /// Profile of `device` in `area`, created on first observation
    pub fn area_profile_mut(&mut self, device: &str, area: &str) -> &mut AreaProfile {
        let config = self.config;
        self.areas
            .entry(device.to_string())
            .or_default()
            .entry(area.to_string())
            .or_insert_with(|| AreaProfile::with_config(area, config))
    }

    /// All area profiles of `device`, keyed by area
    pub fn device_profiles(&self, device: &str) -> Option<&BTreeMap<String, AreaProfile>> {
        self.areas.get(device)
    }

    /// Room profile of `area`, if any
    pub fn room_profile(&self, area: &str) -> Option<&RoomProfile> {
        self.rooms.get(area)
    }

    /// Room profile of `area`, created on first observation
    pub fn room_profile_mut(&mut self, area: &str) -> &mut RoomProfile {
        let config = self.config;
        self.rooms
            .entry(area.to_string())
            .or_insert_with(|| RoomProfile::with_config(area, config))
    }

    /// Room match score per area, best first
    pub fn rank_rooms(&self, readings: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
        let mut scores: Vec<(String, f64)> = self
            .rooms
            .iter()
            .map(|(area, room)| (area.clone(), room.get_match_score(readings)))
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scores
    }

    /// Drop every profile of `device`
    pub fn remove_device(&mut self, device: &str) -> bool {
        self.areas.remove(device).is_some()
    }

    /// Drop `area` for every device and its room profile
    ///
    /// Returns the number of profiles removed.
    pub fn remove_area(&mut self, area: &str) -> usize {
        let mut removed = 0;
        for profiles in self.areas.values_mut() {
            if profiles.remove(area).is_some() {
                removed += 1;
            }
        }
        self.areas.retain(|_, profiles| !profiles.is_empty());
        if self.rooms.remove(area).is_some() {
            removed += 1;
        }
        removed
    }

    /// Forget user confirmations everywhere
    pub fn reset_training(&mut self) {
        for profile in self.areas.values_mut().flat_map(|p| p.values_mut()) {
            profile.reset_training();
        }
        for room in self.rooms.values_mut() {
            room.reset_training();
        }
    }

    /// Number of devices with at least one profile
    pub fn device_count(&self) -> usize {
        self.areas.len()
    }

    /// Number of area profiles across all devices
    pub fn area_count(&self) -> usize {
        self.areas.values().map(BTreeMap::len).sum()
    }

    /// Number of room profiles
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl PortableRecord for ProfileStore {
    type Record = StoreRecord;
    type Config = CorrelationConfig;

    fn to_record(&self) -> StoreRecord {
        StoreRecord {
            version: Some(SNAPSHOT_VERSION),
            devices: self
                .areas
                .iter()
                .map(|(device, profiles)| {
                    (device.clone(), profiles.values().map(AreaProfile::to_record).collect())
                })
                .collect(),
            rooms: self.rooms.values().map(RoomProfile::to_record).collect(),
        }
    }

    fn from_record(record: StoreRecord, config: &CorrelationConfig) -> RecordResult<Self> {
        let version = record.version.unwrap_or(1);
        if version > SNAPSHOT_VERSION {
            return Err(RecordError::UnsupportedVersion {
                found: version,
                supported: SNAPSHOT_VERSION,
            });
        }

        let mut store = ProfileStore::new(*config);
        for (device, entries) in record.devices {
            let mut profiles = BTreeMap::new();
            for entry in entries {
                let profile = AreaProfile::from_record(entry, config)?;
                profiles.insert(profile.area_id().to_string(), profile);
            }
            if !profiles.is_empty() {
                store.areas.insert(device, profiles);
            }
        }
        for entry in record.rooms {
            let room = RoomProfile::from_record(entry, config)?;
            store.rooms.insert(room.area_id().to_string(), room);
        }

        log_info!(
            "Loaded {} area profiles for {} devices and {} room profiles",
            store.area_count(),
            store.device_count(),
            store.room_count()
        );
        Ok(store)
    }
}
