//! Loading pipeline: reads research files from mod directories, layers them
//! into a catalog builder, and links the result.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers. A mod directory holds an optional manifest
//! (`mod.*`) and an optional research file (`research.*`); mods are applied
//! in the order given, later ones overriding earlier ones by topic name.

use crate::schema::{ModManifest, TomlResearch};
use keystone_core::catalog::{LoadError, RegistryBuilder, TopicDef};
use keystone_core::id::TopicId;
use keystone_core::processor::ProcessorConfig;
use keystone_core::registry::{LinkError, Registry};
use ron::extensions::Extensions;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A topic record failed validation.
    #[error("in {file}: {source}")]
    Load { file: PathBuf, source: LoadError },

    /// The combined catalog failed to link.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// A manifest names starting research that no loaded mod defines.
    #[error("mod '{mod_name}' lists unknown starting research '{name}'")]
    UnknownStartingResearch { mod_name: String, name: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// RON with `implicit_some`, so optional fields can be written bare.
fn from_ron<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, DataLoadError> {
    ron::Options::default()
        .with_default_extension(Extensions::IMPLICIT_SOME)
        .from_str(content)
        .map_err(|e| parse_error(path, e))
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => from_ron(path, &content),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

// ===========================================================================
// Research loading
// ===========================================================================

/// Read the topic records of one research file. TOML files keep them under
/// a `research` array of tables; RON and JSON files are a bare list.
pub fn load_research_file(path: &Path) -> Result<Vec<TopicDef>, DataLoadError> {
    match detect_format(path)? {
        Format::Toml => deserialize_file::<TomlResearch>(path).map(|file| file.research),
        Format::Ron | Format::Json => deserialize_file(path),
    }
}

/// Read the processor configuration from a file.
pub fn load_processor_config(path: &Path) -> Result<ProcessorConfig, DataLoadError> {
    deserialize_file(path)
}

/// What one mod directory contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModInfo {
    pub name: String,
    pub dir: PathBuf,
    pub topics: usize,
    pub removed: usize,
    pub starting_research: Vec<String>,
}

/// Apply one mod directory to `builder`: removals first, then its research
/// file. On any error the builder is left as it was.
pub fn load_mod_dir(builder: &mut RegistryBuilder, dir: &Path) -> Result<ModInfo, DataLoadError> {
    let manifest: ModManifest = match find_data_file(dir, "mod")? {
        Some(path) => deserialize_file(&path)?,
        None => ModManifest::default(),
    };
    let name = manifest.name.clone().unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string())
    });

    let mut staged = builder.clone();
    let mut removed = 0;
    for topic in &manifest.remove {
        if staged.remove(topic) {
            removed += 1;
        } else {
            tracing::warn!(mod_name = %name, topic = %topic, "mod removes a topic that is not loaded");
        }
    }

    let mut topics = 0;
    if let Some(path) = find_data_file(dir, "research")? {
        let defs = load_research_file(&path)?;
        topics = defs.len();
        staged
            .extend(defs)
            .map_err(|source| DataLoadError::Load { file: path, source })?;
    }
    *builder = staged;

    tracing::info!(mod_name = %name, topics, removed, "loaded research mod");
    Ok(ModInfo {
        name,
        dir: dir.to_path_buf(),
        topics,
        removed,
        starting_research: manifest.starting_research,
    })
}

/// A linked registry plus what the mods declared about it.
#[derive(Debug, Clone)]
pub struct ModSet {
    pub registry: Registry,
    pub mods: Vec<ModInfo>,
    /// Starting research of every mod, deduplicated, in mod order.
    pub starting_research: Vec<TopicId>,
}

/// Load the given mod directories in order and link the result.
pub fn load_mods<P: AsRef<Path>>(dirs: &[P]) -> Result<ModSet, DataLoadError> {
    let mut builder = RegistryBuilder::new();
    let mut mods = Vec::with_capacity(dirs.len());
    for dir in dirs {
        mods.push(load_mod_dir(&mut builder, dir.as_ref())?);
    }

    let registry = builder.link()?;

    let mut starting_research = Vec::new();
    for info in &mods {
        for name in &info.starting_research {
            let id = registry
                .id(name)
                .ok_or_else(|| DataLoadError::UnknownStartingResearch {
                    mod_name: info.name.clone(),
                    name: name.clone(),
                })?;
            if !starting_research.contains(&id) {
                starting_research.push(id);
            }
        }
    }

    Ok(ModSet {
        registry,
        mods,
        starting_research,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::selection::ProtectedExhaustion;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "keystone_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean up a test directory.
    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("research.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("research.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("research.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["research.yaml", "research"] {
            assert!(matches!(
                detect_format(Path::new(name)),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    // -----------------------------------------------------------------------
    // find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_found_and_missing() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "research").unwrap(), None);

        fs::write(dir.join("research.toml"), "").unwrap();
        assert_eq!(
            find_data_file(&dir, "research").unwrap(),
            Some(dir.join("research.toml"))
        );

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("research.ron"), "[]").unwrap();
        fs::write(dir.join("research.json"), "[]").unwrap();

        assert!(matches!(
            find_data_file(&dir, "research"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Research files
    // -----------------------------------------------------------------------

    #[test]
    fn research_file_ron_allows_bare_options() {
        let dir = make_test_dir("research_ron");
        let path = dir.join("research.ron");
        fs::write(
            &path,
            r#"[
                (name: "laser_weapons", cost: 300, spawnedItem: "laser_rifle"),
                (name: "laser_cannon", cost: 400, dependencies: ["laser_weapons"]),
            ]"#,
        )
        .unwrap();

        let defs = load_research_file(&path).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].cost, Some(300));
        assert_eq!(defs[0].spawned_item.as_deref(), Some("laser_rifle"));

        cleanup(&dir);
    }

    #[test]
    fn research_file_toml_and_json() {
        let dir = make_test_dir("research_toml_json");
        let toml_path = dir.join("a.toml");
        fs::write(
            &toml_path,
            r#"
[[research]]
name = "motion_scanner"
cost = 80
"#,
        )
        .unwrap();
        let json_path = dir.join("b.json");
        fs::write(&json_path, r#"[{"name": "medikit", "cost": 60}]"#).unwrap();

        assert_eq!(load_research_file(&toml_path).unwrap()[0].name, "motion_scanner");
        assert_eq!(load_research_file(&json_path).unwrap()[0].name, "medikit");

        cleanup(&dir);
    }

    #[test]
    fn research_file_toml_missing_key() {
        let dir = make_test_dir("research_toml_missing");
        let path = dir.join("research.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        assert!(matches!(
            load_research_file(&path),
            Err(DataLoadError::Parse { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn research_file_parse_error() {
        let dir = make_test_dir("research_parse_err");
        let path = dir.join("research.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        assert!(matches!(
            load_research_file(&path),
            Err(DataLoadError::Parse { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn processor_config_from_ron_and_toml() {
        let dir = make_test_dir("processor_config");
        let ron_path = dir.join("processor.ron");
        fs::write(&ron_path, "(protected_exhaustion: FallBackToFlat)").unwrap();
        let toml_path = dir.join("processor.toml");
        fs::write(&toml_path, "settle_checkpoints = false\n").unwrap();

        let config = load_processor_config(&ron_path).unwrap();
        assert_eq!(config.protected_exhaustion, ProtectedExhaustion::FallBackToFlat);
        assert!(config.settle_checkpoints);

        let config = load_processor_config(&toml_path).unwrap();
        assert_eq!(
            config,
            ProcessorConfig {
                settle_checkpoints: false,
                ..ProcessorConfig::default()
            }
        );

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Mod directories
    // -----------------------------------------------------------------------

    fn write_mod(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            fs::write(dir.join(file), content).unwrap();
        }
        dir
    }

    #[test]
    fn mods_layer_in_order() {
        let root = make_test_dir("mods_layer");
        let base = write_mod(
            &root,
            "base",
            &[
                (
                    "research.json",
                    r#"[
                        {"name": "a", "cost": 10},
                        {"name": "b", "cost": 10, "dependencies": ["a"]},
                        {"name": "c", "cost": 10}
                    ]"#,
                ),
                ("mod.json", r#"{"startingResearch": ["a"]}"#),
            ],
        );
        let patch = write_mod(
            &root,
            "patch",
            &[
                ("mod.toml", "name = \"Patch\"\nremove = [\"c\", \"ghost\"]\n"),
                (
                    "research.ron",
                    r#"[(name: "b", cost: 99), (name: "d", cost: 5, dependencies: ["b"])]"#,
                ),
            ],
        );

        let set = load_mods(&[base, patch]).unwrap();
        let registry = &set.registry;
        assert_eq!(registry.len(), 3);
        assert!(registry.id("c").is_none());
        assert_eq!(registry.by_name("b").unwrap().cost, 99);
        assert!(registry.by_name("b").unwrap().dependencies.is_empty());
        assert_eq!(set.starting_research, vec![registry.id("a").unwrap()]);

        assert_eq!(set.mods[0].name, "base");
        assert_eq!(set.mods[1].name, "Patch");
        assert_eq!(set.mods[1].removed, 1);
        assert_eq!(set.mods[1].topics, 2);

        cleanup(&root);
    }

    #[test]
    fn invalid_record_names_file() {
        let root = make_test_dir("mods_invalid");
        let dir = write_mod(&root, "broken", &[("research.json", r#"[{"name": "a"}]"#)]);

        let err = load_mods(&[dir.clone()]).unwrap_err();
        match err {
            DataLoadError::Load { file, source } => {
                assert_eq!(file, dir.join("research.json"));
                assert_eq!(
                    source,
                    LoadError::MissingField {
                        topic: "a".to_string(),
                        field: "cost"
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }

        cleanup(&root);
    }

    #[test]
    fn failed_mod_leaves_builder_untouched() {
        let root = make_test_dir("mods_rollback");
        let base = write_mod(
            &root,
            "base",
            &[("research.json", r#"[{"name": "a", "cost": 1}, {"name": "b", "cost": 1}]"#)],
        );
        let broken = write_mod(
            &root,
            "broken",
            &[
                ("mod.json", r#"{"remove": ["a"]}"#),
                ("research.json", r#"[{"name": "c", "cost": -5}]"#),
            ],
        );

        let mut builder = RegistryBuilder::new();
        load_mod_dir(&mut builder, &base).unwrap();
        let err = load_mod_dir(&mut builder, &broken).unwrap_err();
        assert!(matches!(err, DataLoadError::Load { .. }));
        assert_eq!(builder.len(), 2);
        assert!(builder.contains("a"));
        assert!(!builder.contains("c"));

        cleanup(&root);
    }

    #[test]
    fn dangling_reference_fails_link() {
        let root = make_test_dir("mods_dangling");
        let dir = write_mod(
            &root,
            "dangling",
            &[("research.json", r#"[{"name": "a", "cost": 1, "unlocks": ["nowhere"]}]"#)],
        );

        let err = load_mods(&[dir]).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::Link(LinkError::UnknownReference { .. })
        ));
        assert!(err.to_string().contains("nowhere"));

        cleanup(&root);
    }

    #[test]
    fn unknown_starting_research() {
        let root = make_test_dir("mods_starting");
        let dir = write_mod(
            &root,
            "starter",
            &[
                ("research.json", r#"[{"name": "a", "cost": 1}]"#),
                ("mod.json", r#"{"startingResearch": ["b"]}"#),
            ],
        );

        assert!(matches!(
            load_mods(&[dir]),
            Err(DataLoadError::UnknownStartingResearch { ref name, .. }) if name == "b"
        ));

        cleanup(&root);
    }

    // -----------------------------------------------------------------------
    // Io error conversion
    // -----------------------------------------------------------------------

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let data_err: DataLoadError = io_err.into();
        assert!(matches!(data_err, DataLoadError::Io(_)));
        assert!(format!("{data_err}").contains("file not found"));
    }
}
