use super::state::{SequenceState, SCHEMA_VERSION};
use crate::config::StorageConfig;
use crate::error::{Result, SearchError};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

const STATE_FILE: &str = "sequence-state.json";

/// Persistence for sequence state. A save either replaces the stored state
/// completely or leaves it untouched.
pub trait SequenceStore {
    /// Reserves a fresh sequence id.
    fn create_sequence(&self) -> Result<u64>;
    fn load(&self, sequence_id: u64) -> Result<SequenceState>;
    fn save(&self, state: &SequenceState) -> Result<()>;
    /// Ids of every sequence with saved state, ascending.
    fn list(&self) -> Result<Vec<u64>>;
}

/// Stores each sequence as `<root>/sequence-<id>/sequence-state.json`.
#[derive(Debug, Clone)]
pub struct JsonSequenceStore {
    root: PathBuf,
}

impl JsonSequenceStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at the configured sequences directory.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.sequences_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sequence_dir(&self, sequence_id: u64) -> PathBuf {
        self.root.join(format!("sequence-{}", sequence_id))
    }

    pub fn state_path(&self, sequence_id: u64) -> PathBuf {
        self.sequence_dir(sequence_id).join(STATE_FILE)
    }

    fn parse_dir_name(name: &str) -> Option<u64> {
        name.strip_prefix("sequence-")?.parse().ok()
    }
}

impl SequenceStore for JsonSequenceStore {
    fn create_sequence(&self) -> Result<u64> {
        fs::create_dir_all(&self.root).map_err(|e| {
            SearchError::Persistence(format!("Failed to create {}: {}", self.root.display(), e))
        })?;

        let mut id = self.list()?.last().map_or(0, |max| max + 1);
        loop {
            match fs::create_dir(self.sequence_dir(id)) {
                Ok(()) => return Ok(id),
                // Another process took this id first
                Err(e) if e.kind() == ErrorKind::AlreadyExists => id += 1,
                Err(e) => {
                    return Err(SearchError::Persistence(format!(
                        "Failed to create sequence directory {}: {}",
                        self.sequence_dir(id).display(),
                        e
                    )))
                }
            }
        }
    }

    fn load(&self, sequence_id: u64) -> Result<SequenceState> {
        let path = self.state_path(sequence_id);
        let file = File::open(&path).map_err(|e| {
            SearchError::Persistence(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let state: SequenceState = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            SearchError::Persistence(format!("Malformed state in {}: {}", path.display(), e))
        })?;

        if state.schema_version != SCHEMA_VERSION {
            return Err(SearchError::Persistence(format!(
                "{} has schema version {}, expected {}",
                path.display(),
                state.schema_version,
                SCHEMA_VERSION
            )));
        }
        if state.sequence_id != sequence_id {
            return Err(SearchError::Persistence(format!(
                "{} holds sequence {}, expected {}",
                path.display(),
                state.sequence_id,
                sequence_id
            )));
        }
        check_generations(&state).map_err(|reason| {
            SearchError::Persistence(format!("{}: {}", path.display(), reason))
        })?;

        Ok(state)
    }

    fn save(&self, state: &SequenceState) -> Result<()> {
        let dir = self.sequence_dir(state.sequence_id);
        let path = dir.join(STATE_FILE);
        let tmp = dir.join(format!("{}.tmp", STATE_FILE));

        let write = || -> std::io::Result<()> {
            fs::create_dir_all(&dir)?;
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, state)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            fs::rename(&tmp, &path)
        };

        write().map_err(|e| {
            fs::remove_file(&tmp).ok();
            SearchError::Persistence(format!("Failed to write {}: {}", path.display(), e))
        })?;

        log::debug!(
            "Saved sequence {} ({} generations) to {}",
            state.sequence_id,
            state.generations.len(),
            path.display()
        );
        Ok(())
    }

    fn list(&self) -> Result<Vec<u64>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SearchError::Persistence(format!(
                    "Failed to list {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() || !entry.path().join(STATE_FILE).is_file() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(Self::parse_dir_name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

/// Generations must be numbered by position, and only the last may still be
/// waiting for its outcome.
fn check_generations(state: &SequenceState) -> std::result::Result<(), String> {
    if state.generations.is_empty() {
        return Err("sequence has no generations".to_string());
    }

    let last = state.generations.len() - 1;
    for (position, record) in state.generations.iter().enumerate() {
        if record.index != position {
            return Err(format!(
                "generation at position {} is numbered {}",
                position, record.index
            ));
        }
        if record.outcome.is_none() && position != last {
            return Err(format!("generation {} was never completed", position));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::sampling::GeneratorSpec;
    use crate::engines::search::state::GenerationRecord;
    use crate::types::{Domain, Feature};

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "atnsearch-store-{}-{}",
            name,
            std::process::id()
        ));
        fs::remove_dir_all(&root).ok();
        root
    }

    fn state(id: u64) -> SequenceState {
        let domain = Domain::new(vec![Feature::new("X1", 0.0, 1.0)]).unwrap();
        let mut state = SequenceState::new(id, domain);
        state
            .generations
            .push(GenerationRecord::new(0, GeneratorSpec::uniform(10, 5)));
        state
    }

    #[test]
    fn test_create_save_load() {
        let root = temp_root("roundtrip");
        let store = JsonSequenceStore::new(&root);
        assert!(store.list().unwrap().is_empty());

        let a = store.create_sequence().unwrap();
        let b = store.create_sequence().unwrap();
        assert_eq!((a, b), (0, 1));
        // Reserved but never saved
        assert!(store.list().unwrap().is_empty());

        let saved = state(b);
        store.save(&saved).unwrap();
        assert_eq!(store.load(b).unwrap(), saved);
        assert_eq!(store.list().unwrap(), vec![1]);
        assert_eq!(store.create_sequence().unwrap(), 2);
        assert!(!store.sequence_dir(b).join("sequence-state.json.tmp").exists());
        assert!(store.load(a).is_err());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_rejects_misnumbered_generations() {
        let root = temp_root("numbering");
        let store = JsonSequenceStore::new(&root);
        let id = store.create_sequence().unwrap();

        let mut bad = state(id);
        bad.generations[0].index = 7;
        store.save(&bad).unwrap();
        let err = store.load(id).unwrap_err();
        assert!(matches!(err, SearchError::Persistence(ref msg) if msg.contains("numbered 7")));

        // An unfinished generation followed by another one
        let mut bad = state(id);
        bad
            .generations
            .push(GenerationRecord::new(1, GeneratorSpec::uniform(10, 6)));
        store.save(&bad).unwrap();
        assert!(matches!(store.load(id), Err(SearchError::Persistence(_))));

        let mut bad = state(id);
        bad.generations.clear();
        store.save(&bad).unwrap();
        assert!(matches!(store.load(id), Err(SearchError::Persistence(_))));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_failed_rename_removes_temporary_file() {
        let root = temp_root("rename");
        let store = JsonSequenceStore::new(&root);
        let id = store.create_sequence().unwrap();
        let saved = state(id);
        store.save(&saved).unwrap();

        // A non-empty directory at the target makes the rename fail after the
        // temporary file is written
        let path = store.state_path(id);
        let moved = store.sequence_dir(id).join("previous.json");
        fs::rename(&path, &moved).unwrap();
        fs::create_dir_all(path.join("blocker")).unwrap();

        let mut next = saved.clone();
        next.carried_median = Some(3.0);
        let err = store.save(&next).unwrap_err();
        assert!(matches!(err, SearchError::Persistence(_)));
        assert!(!store.sequence_dir(id).join("sequence-state.json.tmp").exists());
        assert!(path.join("blocker").is_dir());

        fs::remove_dir_all(&path).unwrap();
        fs::rename(&moved, &path).unwrap();
        assert_eq!(store.load(id).unwrap(), saved);

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_layout_follows_storage_config() {
        let config = StorageConfig {
            data_home: PathBuf::from("/srv/atn"),
        };
        let store = JsonSequenceStore::from_config(&config);
        assert_eq!(
            store.state_path(3),
            PathBuf::from("/srv/atn/sequences/sequence-3/sequence-state.json")
        );
    }

    #[test]
    fn test_rejects_wrong_schema_and_garbage() {
        let root = temp_root("schema");
        let store = JsonSequenceStore::new(&root);
        let id = store.create_sequence().unwrap();

        let mut old = state(id);
        old.schema_version = SCHEMA_VERSION + 1;
        store.save(&old).unwrap();
        assert!(matches!(store.load(id), Err(SearchError::Persistence(_))));

        fs::write(store.state_path(id), "{ not json").unwrap();
        assert!(matches!(store.load(id), Err(SearchError::Persistence(_))));

        fs::remove_dir_all(&root).ok();
    }
}
