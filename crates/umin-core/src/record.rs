use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Stable identifier of a record within one model's collection.
pub type RecordId = i64;

/// Pseudo-field naming a record's human-readable label.
pub const LABEL_FIELD: &str = "__str__";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One row of a model's collection. The store owns records; the rest of the
/// crate only ever sees copies handed out by a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Raw value of a field. `id` resolves to the record id.
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == "id" {
            return Some(Value::from(self.id));
        }
        self.fields.get(name).cloned()
    }

    /// Field value as display text: strings unquoted, null and missing empty.
    pub fn display(&self, name: &str) -> String {
        match self.field(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        }
    }
}

/// Ordering used for list sorting: nulls first, then booleans, numbers,
/// strings, and anything else by its JSON text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Predicate over a record collection. Resolving a filter through a store
/// yields only the records that still exist; ids that vanished are dropped
/// silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Ids(BTreeSet<RecordId>),
}

impl Filter {
    pub fn ids(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Filter::Ids(ids.into_iter().collect())
    }

    pub fn matches(&self, id: RecordId) -> bool {
        match self {
            Filter::All => true,
            Filter::Ids(ids) => ids.contains(&id),
        }
    }

    /// True only for an explicit, empty id set.
    pub fn is_empty(&self) -> bool {
        matches!(self, Filter::Ids(ids) if ids.is_empty())
    }

    /// Canonical text form, stable across submission order and duplicates.
    pub fn canonical(&self) -> String {
        match self {
            Filter::All => "*".to_string(),
            Filter::Ids(ids) => ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
