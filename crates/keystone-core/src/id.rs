use serde::{Deserialize, Serialize};

/// Identifies a research topic in a linked [`Registry`](crate::registry::Registry).
/// Cheap to copy and compare; only meaningful for the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TopicId(pub u32);

impl TopicId {
    /// Position of the topic in the registry's topic table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifies an interceptor craft on the geoscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CraftId(pub u32);

/// Identifies a UFO on the geoscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UfoId(pub u32);
