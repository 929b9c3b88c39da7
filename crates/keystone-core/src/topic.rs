//! Linked research topic records.
//!
//! A [`Topic`] is what a raw [`TopicDef`](crate::catalog::TopicDef) becomes
//! after linking: every name reference is replaced by a [`TopicId`] into the
//! owning registry. Topics are immutable once the registry is built.

use crate::id::TopicId;
use serde::{Deserialize, Serialize};

/// Maximum number of distinct base function names a catalog may use.
pub const MAX_BASE_FUNCTIONS: usize = 64;

// ---------------------------------------------------------------------------
// Base functions
// ---------------------------------------------------------------------------

/// A set of base facility functions, one bit per function name.
///
/// Bits are assigned by the catalog builder in order of first use; use
/// [`Registry::base_functions`](crate::registry::Registry::base_functions) to
/// translate the names a base provides into this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BaseFunctions(u64);

impl BaseFunctions {
    pub const EMPTY: BaseFunctions = BaseFunctions(0);
    pub const ALL: BaseFunctions = BaseFunctions(u64::MAX);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    /// The set containing only function number `bit`. Bits past 63 are ignored.
    pub fn single(bit: u8) -> Self {
        if (bit as usize) < MAX_BASE_FUNCTIONS {
            Self(1u64 << bit)
        } else {
            Self::EMPTY
        }
    }

    pub fn union(self, other: BaseFunctions) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every function in `self` is also provided by `provided`.
    pub fn is_subset_of(self, provided: BaseFunctions) -> bool {
        self.0 & !provided.0 == 0
    }
}

// ---------------------------------------------------------------------------
// Topic record
// ---------------------------------------------------------------------------

/// Item gate: the topic can only be researched while the item is in stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGate {
    pub item: String,
    /// Whether completing the topic consumes one unit of the item.
    pub destroy: bool,
}

/// A bonus pool that only becomes eligible once `trigger` is researched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedPool {
    pub trigger: TopicId,
    pub pool: Vec<TopicId>,
}

/// One research topic after linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,

    /// Research time. Zero marks a checkpoint topic.
    pub cost: u32,
    /// Score awarded on completion.
    pub points: i32,
    pub list_order: i32,
    /// Repeatable topics are never recorded as discovered.
    pub repeatable: bool,

    pub requires_base_functions: BaseFunctions,
    pub needed_item: Option<ItemGate>,
    pub unlock_final_mission: bool,
    /// Topic discovered alongside this one (an encyclopedia entry, usually).
    pub lookup: Option<TopicId>,

    pub dependencies: Vec<TopicId>,
    pub unlocks: Vec<TopicId>,
    pub disables: Vec<TopicId>,
    pub reenables: Vec<TopicId>,
    pub get_one_free: Vec<TopicId>,
    pub get_one_free_protected: Vec<ProtectedPool>,
    pub requires: Vec<TopicId>,
    pub sequential_get_one_free: bool,

    pub spawned_item: Option<String>,
    pub spawned_item_count: u32,
    pub spawned_item_list: Vec<String>,
    pub spawned_event: Option<String>,
    pub cutscene: Option<String>,
    pub decrease_counter: Vec<String>,
    pub increase_counter: Vec<String>,
}

impl Topic {
    /// Zero-cost topics only wire OR-of-AND dependency structures.
    pub fn is_checkpoint(&self) -> bool {
        self.cost == 0
    }

    /// Whether completing this topic adds it to the discovered set.
    pub fn is_discoverable(&self) -> bool {
        !self.is_checkpoint() && !self.repeatable
    }

    /// Whether any bonus pool is declared.
    pub fn grants_bonus(&self) -> bool {
        !self.get_one_free.is_empty() || !self.get_one_free_protected.is_empty()
    }
}
