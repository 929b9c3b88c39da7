//! Keystone Data -- loads research mods from RON, TOML or JSON files.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, ModInfo, ModSet, load_mod_dir, load_mods};
