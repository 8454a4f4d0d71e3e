//! Persistence collaborator.
//!
//! The admin layer never owns records. Everything it needs from storage goes
//! through [`RecordStore`]; two implementations ship here: [`MemoryStore`]
//! for tests and embedding, and [`YamlStore`] which keeps one YAML file per
//! model under the project's data directory.

use crate::error::{Result, UminError};
use crate::paths;
use crate::record::{Filter, Record, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

pub trait RecordStore: Send + Sync {
    /// Records of `model` matching `filter`, ascending by id. Ids in the
    /// filter that do not exist are skipped.
    fn filter(&self, model: &str, filter: &Filter) -> Result<Vec<Record>>;

    /// Remove the given ids and return how many were actually removed.
    fn delete(&self, model: &str, ids: &[RecordId]) -> Result<usize>;

    /// Insert or replace a record.
    fn insert(&self, model: &str, record: Record) -> Result<()>;

    /// Store `fields` under the next unused id (one past the current
    /// maximum) and return the new record.
    fn create(&self, model: &str, fields: BTreeMap<String, Value>) -> Result<Record>;

    fn get(&self, model: &str, id: RecordId) -> Result<Option<Record>> {
        Ok(self.filter(model, &Filter::ids([id]))?.into_iter().next())
    }

    /// Values of `fields` for `record`, in the order asked for.
    fn read_fields(&self, record: &Record, fields: &[String]) -> Vec<Value> {
        fields
            .iter()
            .map(|f| record.field(f).unwrap_or(Value::Null))
            .collect()
    }
}

fn poisoned<T>(_: T) -> UminError {
    UminError::Store("store lock poisoned".to_string())
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<RecordId, Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, model: &str, records: impl IntoIterator<Item = Record>) -> Self {
        if let Ok(mut collections) = self.collections.write() {
            let collection = collections.entry(model.to_string()).or_default();
            for record in records {
                collection.insert(record.id, record);
            }
        }
        self
    }

    pub fn count(&self, model: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(model).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

impl RecordStore for MemoryStore {
    fn filter(&self, model: &str, filter: &Filter) -> Result<Vec<Record>> {
        let collections = self.collections.read().map_err(poisoned)?;
        let Some(collection) = collections.get(model) else {
            return Ok(Vec::new());
        };
        Ok(select(collection, filter))
    }

    fn delete(&self, model: &str, ids: &[RecordId]) -> Result<usize> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let Some(collection) = collections.get_mut(model) else {
            return Ok(0);
        };
        Ok(ids
            .iter()
            .filter(|id| collection.remove(id).is_some())
            .count())
    }

    fn insert(&self, model: &str, record: Record) -> Result<()> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(model.to_string())
            .or_default()
            .insert(record.id, record);
        Ok(())
    }

    fn create(&self, model: &str, fields: BTreeMap<String, Value>) -> Result<Record> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let collection = collections.entry(model.to_string()).or_default();
        let record = Record {
            id: next_id(collection),
            fields,
        };
        collection.insert(record.id, record.clone());
        Ok(record)
    }
}

fn next_id(collection: &BTreeMap<RecordId, Record>) -> RecordId {
    collection.keys().next_back().map_or(1, |max| max + 1)
}

fn select(collection: &BTreeMap<RecordId, Record>, filter: &Filter) -> Vec<Record> {
    match filter {
        Filter::All => collection.values().cloned().collect(),
        Filter::Ids(ids) => ids
            .iter()
            .filter_map(|id| collection.get(id).cloned())
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// YamlStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataFile {
    #[serde(default)]
    records: Vec<Record>,
    updated_at: DateTime<Utc>,
}

/// One YAML file per model. Reads go to disk every time so edits made by the
/// CLI show up in a running server; writes are atomic and serialized within
/// the process.
#[derive(Debug)]
pub struct YamlStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl YamlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load(&self, model: &str) -> Result<BTreeMap<RecordId, Record>> {
        let path = paths::model_data_path(&self.dir, model);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&path)?;
        let file: DataFile = serde_yaml::from_str(&data)?;
        Ok(file.records.into_iter().map(|r| (r.id, r)).collect())
    }

    fn save(&self, model: &str, collection: &BTreeMap<RecordId, Record>) -> Result<()> {
        let file = DataFile {
            records: collection.values().cloned().collect(),
            updated_at: Utc::now(),
        };
        let data = serde_yaml::to_string(&file)?;
        crate::io::atomic_write(&paths::model_data_path(&self.dir, model), data.as_bytes())
    }

    /// Next unused id for `model`.
    pub fn next_id(&self, model: &str) -> Result<RecordId> {
        Ok(next_id(&self.load(model)?))
    }
}

impl RecordStore for YamlStore {
    fn filter(&self, model: &str, filter: &Filter) -> Result<Vec<Record>> {
        Ok(select(&self.load(model)?, filter))
    }

    fn delete(&self, model: &str, ids: &[RecordId]) -> Result<usize> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut collection = self.load(model)?;
        let removed = ids
            .iter()
            .filter(|id| collection.remove(id).is_some())
            .count();
        if removed > 0 {
            self.save(model, &collection)?;
        }
        Ok(removed)
    }

    fn insert(&self, model: &str, record: Record) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut collection = self.load(model)?;
        collection.insert(record.id, record);
        self.save(model, &collection)
    }

    fn create(&self, model: &str, fields: BTreeMap<String, Value>) -> Result<Record> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut collection = self.load(model)?;
        let record = Record {
            id: next_id(&collection),
            fields,
        };
        collection.insert(record.id, record.clone());
        self.save(model, &collection)?;
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
