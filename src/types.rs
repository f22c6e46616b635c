//! Relay Node Types
//!
//! Core types for representing relay nodes and per-region iteration counters.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Region code embedded in relay CNAME names (`r-{region}-{iteration}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Na,
    Eu,
    Apac,
    Sa,
    Af,
}

impl Region {
    pub const ALL: [Region; 5] = [Region::Na, Region::Eu, Region::Apac, Region::Sa, Region::Af];

    fn index(self) -> usize {
        match self {
            Region::Na => 0,
            Region::Eu => 1,
            Region::Apac => 2,
            Region::Sa => 3,
            Region::Af => 4,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Na => write!(f, "na"),
            Region::Eu => write!(f, "eu"),
            Region::Apac => write!(f, "apac"),
            Region::Sa => write!(f, "sa"),
            Region::Af => write!(f, "af"),
        }
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "na" => Ok(Region::Na),
            "eu" => Ok(Region::Eu),
            "apac" => Ok(Region::Apac),
            "sa" => Ok(Region::Sa),
            "af" => Ok(Region::Af),
            _ => Err(UnknownRegion(s.to_string())),
        }
    }
}

/// Region code that is not one of na, eu, apac, sa, af
#[derive(Debug, thiserror::Error)]
#[error("unknown region '{0}' (expected one of: na, eu, apac, sa, af)")]
pub struct UnknownRegion(pub String);

/// Highest iteration number observed per region across the zone's CNAMEs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionIterations {
    max_seen: [u32; 5],
}

impl RegionIterations {
    /// Record an observed iteration, keeping the per-region maximum
    pub fn observe(&mut self, region: Region, iteration: u32) {
        let slot = &mut self.max_seen[region.index()];
        *slot = (*slot).max(iteration);
    }

    /// Highest iteration seen for a region, 0 if none
    pub fn max(&self, region: Region) -> u32 {
        self.max_seen[region.index()]
    }

    /// Next free iteration slot for a region
    pub fn next(&self, region: Region) -> u32 {
        self.max(region) + 1
    }
}

/// A relay node reconstructed from its four linked DNS records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayNode {
    pub name: String,
    pub srv_id: Option<String>,
    pub metrics_srv_id: Option<String>,
    pub a_record_id: Option<String>,
    pub cname_id: Option<String>,
}

impl RelayNode {
    /// A node is complete when all four record ids resolved
    pub fn is_complete(&self) -> bool {
        self.srv_id.is_some()
            && self.metrics_srv_id.is_some()
            && self.a_record_id.is_some()
            && self.cname_id.is_some()
    }
}
