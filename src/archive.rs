//! Durable artifacts written at episode boundaries: per-episode statistics,
//! champion gene tables, and the resumable training state.
//!
//! Gene files are JSON keyed by species name, each table stored as its vision
//! radius plus a complete `"p,h,o,c" -> action_name` map. Loading is strict:
//! a malformed key tuple, an unknown action name, or an incomplete table is a
//! typed error, never a silent default.

use crate::evolution::GenePools;
use crate::genes::{table_len, Action, GeneTable, PerceptionKey};
use crate::species::Species;
use crate::stats::EpisodeStats;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// On-disk form of one gene table.
#[derive(Serialize, Deserialize)]
struct GeneTableFile {
    vision: u8,
    entries: BTreeMap<String, String>,
}

/// On-disk form of a gene file: species name to champion tables.
type GeneFile = BTreeMap<String, Vec<GeneTableFile>>;

/// A timestamped run directory holding one file set per episode index.
pub struct Archive {
    run_dir: PathBuf,
}

impl Archive {
    /// Create a fresh `run_<timestamp>` directory under `base`.
    pub fn create<P: AsRef<Path>>(base: P) -> Result<Self, ArchiveError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let run_dir = base.as_ref().join(format!("run_{stamp}"));
        std::fs::create_dir_all(&run_dir)?;
        Ok(Self { run_dir })
    }

    /// Reopen an existing run directory (for resumed training).
    pub fn open<P: AsRef<Path>>(run_dir: P) -> Result<Self, ArchiveError> {
        let run_dir = run_dir.as_ref().to_path_buf();
        if !run_dir.is_dir() {
            return Err(ArchiveError::InvalidFormat(format!(
                "run directory not found: {}",
                run_dir.display()
            )));
        }
        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn stats_path(&self, episode: u32) -> PathBuf {
        self.run_dir.join(format!("stats_{episode:04}.json"))
    }

    pub fn genes_path(&self, episode: u32) -> PathBuf {
        self.run_dir.join(format!("genes_{episode:04}.json"))
    }

    pub fn state_path(&self) -> PathBuf {
        self.run_dir.join("training_state.bin")
    }

    /// Write one episode's file set: statistics and champion gene tables.
    pub fn write_episode(
        &self,
        stats: &EpisodeStats,
        champions: &GenePools,
    ) -> Result<(), ArchiveError> {
        let json = serde_json::to_string_pretty(stats)?;
        std::fs::write(self.stats_path(stats.episode), json)?;

        let mut file: GeneFile = BTreeMap::new();
        for species in Species::ALL {
            let tables = champions
                .tables(species)
                .iter()
                .map(table_to_file)
                .collect();
            file.insert(species.as_str().to_string(), tables);
        }
        let json = serde_json::to_string(&file)?;
        std::fs::write(self.genes_path(stats.episode), json)?;
        Ok(())
    }

    /// Parse a persisted gene file back into per-species tables.
    pub fn load_genes<P: AsRef<Path>>(path: P) -> Result<GenePools, ArchiveError> {
        let json = std::fs::read_to_string(path)?;
        let file: GeneFile = serde_json::from_str(&json)?;

        let mut pools = GenePools::default();
        for species in Species::ALL {
            let tables = file.get(species.as_str()).ok_or_else(|| {
                ArchiveError::InvalidFormat(format!("missing species section '{species}'"))
            })?;
            let parsed = tables
                .iter()
                .map(table_from_file)
                .collect::<Result<Vec<_>, _>>()?;
            pools.set_tables(species, parsed);
        }
        Ok(pools)
    }
}

fn table_to_file(table: &GeneTable) -> GeneTableFile {
    let entries = table
        .entries()
        .map(|(key, action)| {
            (
                format!(
                    "{},{},{},{}",
                    key.plant, key.herbivore, key.omnivore, key.carnivore
                ),
                action.name().to_string(),
            )
        })
        .collect();
    GeneTableFile {
        vision: table.vision(),
        entries,
    }
}

fn table_from_file(file: &GeneTableFile) -> Result<GeneTable, ArchiveError> {
    let expected = table_len(file.vision);
    let mut actions: Vec<Option<Action>> = vec![None; expected];

    for (key_text, action_name) in &file.entries {
        let key = parse_key(key_text, file.vision)?;
        let action = Action::from_name(action_name)
            .ok_or_else(|| ArchiveError::UnknownAction(action_name.clone()))?;
        actions[key.index(file.vision)] = Some(action);
    }

    let found = file.entries.len();
    let actions = actions
        .into_iter()
        .collect::<Option<Vec<Action>>>()
        .ok_or(ArchiveError::IncompleteTable { expected, found })?;
    Ok(GeneTable::from_actions(file.vision, actions))
}

fn parse_key(text: &str, vision: u8) -> Result<PerceptionKey, ArchiveError> {
    let malformed = || ArchiveError::MalformedKey(text.to_string());
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 4 {
        return Err(malformed());
    }
    let mut values = [0u8; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        let value: u8 = part.trim().parse().map_err(|_| malformed())?;
        if value > vision {
            return Err(malformed());
        }
        *slot = value;
    }
    Ok(PerceptionKey::new(values[0], values[1], values[2], values[3]))
}

/// Complete trainer state for resuming a run.
#[derive(Serialize, Deserialize)]
pub struct TrainingState {
    /// Version for compatibility checking
    pub version: u32,
    pub episode: u32,
    pub master_seed: u64,
    pub config: crate::config::Config,
    pub pools: Option<GenePools>,
}

impl TrainingState {
    /// Current state-file version
    pub const VERSION: u32 = 1;

    /// Magic bytes identifying a training-state file
    const MAGIC: &'static [u8; 4] = b"SVNA";

    pub fn new(
        episode: u32,
        master_seed: u64,
        config: crate::config::Config,
        pools: Option<GenePools>,
    ) -> Self {
        Self {
            version: Self::VERSION,
            episode,
            master_seed,
            config,
            pools,
        }
    }

    /// Save state to a binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ArchiveError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(Self::MAGIC)?;
        let encoded = bincode::serialize(self)?;
        writer.write_all(&encoded)?;
        Ok(())
    }

    /// Load state from a binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != Self::MAGIC {
            return Err(ArchiveError::InvalidFormat(
                "invalid magic bytes".to_string(),
            ));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let state: TrainingState = bincode::deserialize(&buffer)?;

        if state.version != Self::VERSION {
            return Err(ArchiveError::VersionMismatch {
                expected: Self::VERSION,
                found: state.version,
            });
        }
        Ok(state)
    }
}

/// Errors that can occur while writing or loading archived artifacts.
#[derive(Debug)]
pub enum ArchiveError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Serialization(bincode::Error),
    MalformedKey(String),
    UnknownAction(String),
    IncompleteTable { expected: usize, found: usize },
    InvalidFormat(String),
    VersionMismatch { expected: u32, found: u32 },
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Json(e) => write!(f, "JSON error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::MalformedKey(key) => write!(f, "malformed perception key '{}'", key),
            Self::UnknownAction(name) => write!(f, "unknown action name '{}'", name),
            Self::IncompleteTable { expected, found } => {
                write!(f, "incomplete gene table: {} of {} keys", found, expected)
            }
            Self::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "version mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<bincode::Error> for ArchiveError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e)
    }
}
