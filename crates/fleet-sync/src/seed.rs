//! Canonical default fleet and the merge that heals stores missing defaults.

use std::collections::HashSet;

use crate::types::{Location, VehicleRecord};

/// Vehicles taken out of service. They may still exist in older stores but
/// are hidden from callers.
pub const RETIRED_VEHICLE_IDS: &[&str] = &["ME 12", "TV 01", "VF 12"];

const DEFAULT_FLEET: &[(&str, Location)] = &[
    ("TM 01", Location::Oficina),
    ("TM 02", Location::Pat),
    ("TM 03", Location::Pat),
    ("TM 04", Location::Etc5),
    ("TM 05", Location::Etc6),
    ("TM 06", Location::Ramal5),
    ("ME 10", Location::Pit),
    ("ME 11", Location::Pti),
    ("TV 02", Location::Ecl3),
    ("VF 10", Location::Ramal6),
];

#[derive(Debug, Clone)]
pub struct SeedRegistry {
    seeds: Vec<VehicleRecord>,
    retired: Vec<String>,
}

/// Result of merging a store's vehicles with the seed list.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedMerge {
    /// Store records in their original order, followed by missing seeds.
    pub records: Vec<VehicleRecord>,
    /// Seeds that were missing from the store and must be written back.
    pub added: Vec<VehicleRecord>,
}

impl Default for SeedRegistry {
    /// The depot's standard fleet, same as [`SeedRegistry::default_fleet`].
    fn default() -> Self {
        Self::default_fleet()
    }
}

impl SeedRegistry {
    pub fn new(seeds: Vec<VehicleRecord>) -> Self {
        Self {
            seeds,
            retired: Vec::new(),
        }
    }

    /// A registry with no seeds and nothing retired.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_retired<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retired = ids.into_iter().map(Into::into).collect();
        self
    }

    /// The depot's standard fleet.
    pub fn default_fleet() -> Self {
        let seeds = DEFAULT_FLEET
            .iter()
            .map(|(id, location)| VehicleRecord::new(*id, *location))
            .collect();
        Self::new(seeds).with_retired(RETIRED_VEHICLE_IDS.iter().copied())
    }

    pub fn seeds(&self) -> &[VehicleRecord] {
        &self.seeds
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.retired.iter().any(|r| r == id)
    }

    /// Append every seed whose id is absent from `store`, in seed order.
    pub fn merge(&self, store: Vec<VehicleRecord>) -> SeedMerge {
        self.merge_excluding(store, &HashSet::new())
    }

    /// Like [`merge`](Self::merge), but ids in `occupied` also count as
    /// present. These are ids held by stored entries that could not be
    /// decoded; a seed must never replace them.
    pub fn merge_excluding(&self, store: Vec<VehicleRecord>, occupied: &HashSet<String>) -> SeedMerge {
        let added: Vec<VehicleRecord> = self
            .seeds
            .iter()
            .filter(|seed| !occupied.contains(&seed.id) && !store.iter().any(|v| v.id == seed.id))
            .cloned()
            .collect();
        let mut records = store;
        records.extend(added.iter().cloned());
        SeedMerge { records, added }
    }
}
