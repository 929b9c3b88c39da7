//! Binary campaign snapshots.
//!
//! A snapshot bundles the name-keyed [`SavedCampaign`] with the campaign's
//! [`DrawRng`] and encodes both with `bitcode` behind a versioned header.
//! Because topics are stored by name, a snapshot can be restored against a
//! registry rebuilt from a different mod set.

use crate::campaign::{CampaignState, RestoreError, RestoreMode, SavedCampaign};
use crate::registry::Registry;
use crate::rng::DrawRng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a research campaign snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x6B57_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Restore(#[from] RestoreError),
}

// ---------------------------------------------------------------------------
// Header and snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
}

impl SnapshotHeader {
    pub fn current() -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(SnapshotError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Everything needed to resume a campaign's research.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub header: SnapshotHeader,
    pub campaign: SavedCampaign,
    pub rng: DrawRng,
}

impl CampaignSnapshot {
    pub fn capture(registry: &Registry, campaign: &CampaignState, rng: &DrawRng) -> Self {
        Self {
            header: SnapshotHeader::current(),
            campaign: campaign.to_saved(registry),
            rng: rng.clone(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        bitcode::serialize(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Decode and validate the header. The payload is not checked against
    /// any registry yet; see [`CampaignSnapshot::restore`].
    pub fn decode(data: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: CampaignSnapshot =
            bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        Ok(snapshot)
    }

    /// Rebuild campaign state and RNG against `registry`.
    pub fn restore(
        &self,
        registry: &Registry,
        mode: RestoreMode,
    ) -> Result<(CampaignState, DrawRng), SnapshotError> {
        let campaign = CampaignState::from_saved(registry, &self.campaign, mode)?;
        Ok((campaign, self.rng.clone()))
    }
}
