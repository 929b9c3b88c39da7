//! Serde data file structs for research mods.
//!
//! Topic records themselves use [`TopicDef`] from the core crate; this
//! module only adds the wrappers and per-mod metadata that live next to
//! them on disk.

use keystone_core::catalog::TopicDef;
use serde::Deserialize;

// ===========================================================================
// Mod manifest
// ===========================================================================

/// Optional `mod.{ron,toml,json}` file in a mod directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModManifest {
    /// Display name; the directory name is used when absent.
    pub name: Option<String>,
    /// Topics from earlier mods to delete before this mod's research loads.
    pub remove: Vec<String>,
    /// Topics every new campaign starts with.
    pub starting_research: Vec<String>,
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

/// Wrapper for a list of research topics in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlResearch {
    pub research: Vec<TopicDef>,
}

// ===========================================================================
// Tests
// ===========================================================================
