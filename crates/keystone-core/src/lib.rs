//! Keystone Core -- the research dependency engine.
//!
//! This crate turns a catalog of research topics into an immutable, linked
//! registry, answers which topics a campaign can research right now, and
//! applies the cascade of state changes that follows each completed topic.
//!
//! # Two-Phase Load
//!
//! Raw definitions reference each other by name. They are validated into a
//! [`catalog::RegistryBuilder`] first, then linked into a
//! [`registry::Registry`] where every reference is a [`id::TopicId`]:
//!
//! ```rust,ignore
//! let builder = RegistryBuilder::load(defs)?;
//! let registry = builder.link()?;
//! ```
//!
//! Linking fails on unknown references, dependency cycles, and more than one
//! final-mission topic. A mod reload builds a new registry and swaps it in
//! through [`registry::RegistryCell`].
//!
//! # Per-Turn Flow
//!
//! 1. [`resolver::available`] lists what the player may research.
//! 2. When research finishes, [`processor::Processor::complete`] updates the
//!    [`campaign::CampaignState`] and returns an [`effect::EffectBatch`].
//! 3. The caller hands the batch to its [`effect::EffectSink`] to spawn
//!    items, raise events and so on.
//!
//! # Key Types
//!
//! - [`topic::Topic`] -- One linked research topic.
//! - [`campaign::CampaignState`] -- Discovered, disabled, unlocked and granted
//!   sets plus counters for one campaign.
//! - [`selection`] -- Bonus topic draws from flat and protected pools.
//! - [`rng::DrawRng`] -- Seedable, serializable RNG for those draws.
//! - [`index::AvailabilityIndex`] -- Incremental prerequisite counters.
//! - [`snapshot::CampaignSnapshot`] -- Versioned binary save of a campaign.
//! - [`follower::Follower`] -- Tagged dispatch for craft and UFO pursuers.

pub mod campaign;
pub mod catalog;
pub mod effect;
pub mod follower;
pub mod id;
pub mod index;
pub mod processor;
pub mod registry;
pub mod resolver;
pub mod rng;
pub mod selection;
pub mod snapshot;
pub mod topic;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
