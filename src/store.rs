/*
Pattern Store
=============

Named-pattern persistence with CRUD semantics. Patterns are stored as a
single JSON document; mutations rewrite the whole file, which at 16 steps
per pattern is never worth anything cleverer. A store without a path is
purely in-memory, which the tests and the TUI's scratch mode use.

The wire shape of a step matches the pattern editor exchange format:

    { "note": "C3", "accent": false, "slide": false, "active": true }
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::pattern::{Pattern, Step};
use crate::transport::{MAX_BPM, MIN_BPM};

#[derive(Debug)]
pub enum StoreError {
    NotFound(u32),
    InvalidPattern(String),
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "pattern {} not found", id),
            StoreError::InvalidPattern(msg) => write!(f, "invalid pattern: {}", msg),
            StoreError::Io(e) => write!(f, "pattern store i/o: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// A saved pattern with its stored tempo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPattern {
    pub id: u32,
    pub name: String,
    pub steps: Vec<Step>,
    pub tempo: u32,
}

impl StoredPattern {
    /// Convert the stored steps into an engine pattern.
    pub fn to_pattern(&self) -> Result<Pattern, StoreError> {
        Pattern::from_steps(&self.steps).map_err(|e| StoreError::InvalidPattern(e.to_string()))
    }
}

/// Payload for creating a pattern. The id is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPattern {
    pub name: String,
    pub steps: Vec<Step>,
    pub tempo: u32,
}

/// Partial update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternUpdate {
    pub name: Option<String>,
    pub steps: Option<Vec<Step>>,
    pub tempo: Option<u32>,
}

#[derive(Serialize, Deserialize, Default)]
struct StoreFile {
    next_id: u32,
    patterns: Vec<StoredPattern>,
}

pub struct PatternStore {
    path: Option<PathBuf>,
    next_id: u32,
    patterns: Vec<StoredPattern>,
}

impl PatternStore {
    /// Volatile store; nothing is written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            next_id: 1,
            patterns: Vec::new(),
        }
    }

    /// Open (or create on first save) a store backed by `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str::<StoreFile>(&text)
                .map_err(|e| StoreError::InvalidPattern(e.to_string()))?
        } else {
            StoreFile {
                next_id: 1,
                patterns: Vec::new(),
            }
        };
        log::info!(
            "pattern store: {} pattern(s) at {}",
            file.patterns.len(),
            path.display()
        );
        Ok(Self {
            path: Some(path),
            next_id: file.next_id.max(1),
            patterns: file.patterns,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = StoreFile {
            next_id: self.next_id,
            patterns: self.patterns.clone(),
        };
        let text = serde_json::to_string_pretty(&file)
            .map_err(|e| StoreError::InvalidPattern(e.to_string()))?;
        fs::write(path, text)?;
        log::debug!("pattern store saved ({} patterns)", self.patterns.len());
        Ok(())
    }

    fn validate(steps: &[Step], tempo: u32) -> Result<(), StoreError> {
        Pattern::from_steps(steps).map_err(|e| StoreError::InvalidPattern(e.to_string()))?;
        if !(MIN_BPM as u32..=MAX_BPM as u32).contains(&tempo) {
            return Err(StoreError::InvalidPattern(format!(
                "tempo {} outside {}..={}",
                tempo, MIN_BPM as u32, MAX_BPM as u32
            )));
        }
        Ok(())
    }

    pub fn list(&self) -> &[StoredPattern] {
        &self.patterns
    }

    pub fn get(&self, id: u32) -> Result<&StoredPattern, StoreError> {
        self.patterns
            .iter()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    pub fn create(&mut self, new: NewPattern) -> Result<&StoredPattern, StoreError> {
        Self::validate(&new.steps, new.tempo)?;
        let id = self.next_id;
        self.next_id += 1;
        self.patterns.push(StoredPattern {
            id,
            name: new.name,
            steps: new.steps,
            tempo: new.tempo,
        });
        self.persist()?;
        Ok(self.patterns.last().unwrap())
    }

    pub fn update(&mut self, id: u32, update: PatternUpdate) -> Result<&StoredPattern, StoreError> {
        let idx = self
            .patterns
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;

        {
            let current = &self.patterns[idx];
            let steps = update.steps.as_deref().unwrap_or(&current.steps);
            let tempo = update.tempo.unwrap_or(current.tempo);
            Self::validate(steps, tempo)?;
        }

        let pat = &mut self.patterns[idx];
        if let Some(name) = update.name {
            pat.name = name;
        }
        if let Some(steps) = update.steps {
            pat.steps = steps;
        }
        if let Some(tempo) = update.tempo {
            pat.tempo = tempo;
        }
        self.persist()?;
        Ok(&self.patterns[idx])
    }

    pub fn delete(&mut self, id: u32) -> Result<(), StoreError> {
        let idx = self
            .patterns
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        self.patterns.remove(idx);
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Note, PATTERN_LEN};

    fn sixteen_steps() -> Vec<Step> {
        let mut steps = vec![Step::rest(Note(36)); PATTERN_LEN];
        steps[0] = Step::on(Note(48));
        steps
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let mut store = PatternStore::in_memory();
        let a = store
            .create(NewPattern {
                name: "one".into(),
                steps: sixteen_steps(),
                tempo: 120,
            })
            .unwrap()
            .id;
        let b = store
            .create(NewPattern {
                name: "two".into(),
                steps: sixteen_steps(),
                tempo: 130,
            })
            .unwrap()
            .id;
        assert!(b > a);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn test_rejects_wrong_length_and_bad_tempo() {
        let mut store = PatternStore::in_memory();
        let short = NewPattern {
            name: "short".into(),
            steps: vec![Step::rest(Note(36)); 8],
            tempo: 120,
        };
        assert!(matches!(
            store.create(short),
            Err(StoreError::InvalidPattern(_))
        ));

        let fast = NewPattern {
            name: "fast".into(),
            steps: sixteen_steps(),
            tempo: 999,
        };
        assert!(matches!(
            store.create(fast),
            Err(StoreError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_partial_update() {
        let mut store = PatternStore::in_memory();
        let id = store
            .create(NewPattern {
                name: "bassline".into(),
                steps: sixteen_steps(),
                tempo: 120,
            })
            .unwrap()
            .id;

        let updated = store
            .update(
                id,
                PatternUpdate {
                    tempo: Some(140),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.tempo, 140);
        assert_eq!(updated.name, "bassline");
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let mut store = PatternStore::in_memory();
        assert!(matches!(store.get(7), Err(StoreError::NotFound(7))));
        assert!(matches!(store.delete(7), Err(StoreError::NotFound(7))));
        assert!(matches!(
            store.update(7, PatternUpdate::default()),
            Err(StoreError::NotFound(7))
        ));
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");

        {
            let mut store = PatternStore::open(&path).unwrap();
            store
                .create(NewPattern {
                    name: "saved".into(),
                    steps: sixteen_steps(),
                    tempo: 125,
                })
                .unwrap();
        }

        let store = PatternStore::open(&path).unwrap();
        assert_eq!(store.list().len(), 1);
        let pat = store.get(1).unwrap();
        assert_eq!(pat.name, "saved");
        assert_eq!(pat.tempo, 125);
        assert!(pat.to_pattern().unwrap().step(0).active);
    }

    #[test]
    fn test_ids_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");

        {
            let mut store = PatternStore::open(&path).unwrap();
            let id = store
                .create(NewPattern {
                    name: "gone".into(),
                    steps: sixteen_steps(),
                    tempo: 120,
                })
                .unwrap()
                .id;
            store.delete(id).unwrap();
        }

        let mut store = PatternStore::open(&path).unwrap();
        let id = store
            .create(NewPattern {
                name: "fresh".into(),
                steps: sixteen_steps(),
                tempo: 120,
            })
            .unwrap()
            .id;
        assert_eq!(id, 2, "deleted id reused");
    }
}
