//! Template persistence – save and load the whole store as one JSON document.
//!
//! # File format
//!
//! ```text
//! {
//!   "chest|overworld|10|64|-5": {
//!     "templates": [ {"item": "minecraft:diamond", "count": 1}, {"empty": true} ],
//!     "memorizeMode": false,
//!     "lastModified": 1760000000000
//!   }
//! }
//! ```
//!
//! Template entries may also carry a `"components"` string holding the item's
//! structural attributes; it is omitted when empty.
//!
//! # Failure policy
//!
//! * A missing file loads as an empty store.
//! * A file that is not a JSON object is renamed to
//!   `<name>.corrupt` (replacing any earlier quarantine file) and the store
//!   starts empty.  Start-up never fails because of the data file.
//! * A single malformed record is skipped; an entry with an unusable item id
//!   decodes as a wildcard.
//! * Saves write a temporary file next to the target and rename it into place,
//!   so a crash mid-write leaves the previous snapshot intact.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotmem_types::{ItemSignature, TemplateSlot, is_valid_type_id};
use thiserror::Error;
use tracing::{info, warn};

use crate::record::{ContainerRecord, now_millis};

/// File name of the template document inside a world's data directory.
pub const DATA_FILE_NAME: &str = "memory_templates.json";

/// Suffix appended to a data file that failed to parse.
pub const QUARANTINE_SUFFIX: &str = ".corrupt";

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised inside the persistence layer.
///
/// These never escape the store's public API; the store logs them and keeps
/// its in-memory state authoritative.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse template document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to serialize template document: {0}")]
    Serialize(serde_json::Error),
    #[error("Template document is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("Template document root is not a JSON object")]
    NotAnObject,
    #[error("Simulated write failure")]
    Unavailable,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// On-disk schema
// ─────────────────────────────────────────────────────────────────────────────

/// The whole data file: identity key to record.
pub type StoredDocument = BTreeMap<String, StoredRecord>;

/// One container's entry in the data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoredRecord {
    pub templates: Vec<StoredTemplate>,
    #[serde(rename = "memorizeMode", default)]
    pub memorize_mode: bool,
    #[serde(rename = "lastModified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

/// One slot's entry: either a concrete item or the wildcard marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StoredTemplate {
    Item {
        item: String,
        #[serde(default = "default_count")]
        count: u32,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        components: String,
        /// An explicit empty marker wins over `item`.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        empty: bool,
    },
    Empty {
        #[serde(default)]
        empty: bool,
    },
}

fn default_count() -> u32 {
    1
}

impl StoredTemplate {
    fn from_slot(slot: &TemplateSlot) -> Self {
        match slot {
            Some(sig) => StoredTemplate::Item {
                item: sig.type_id.clone(),
                count: 1,
                components: sig.attributes.clone(),
                empty: false,
            },
            None => StoredTemplate::Empty { empty: true },
        }
    }

    fn into_slot(self) -> TemplateSlot {
        match self {
            StoredTemplate::Item { empty: true, .. } => None,
            StoredTemplate::Item {
                item, components, ..
            } if is_valid_type_id(&item) => Some(ItemSignature::with_attributes(item, components)),
            StoredTemplate::Item { item, .. } => {
                warn!(item = %item, "unparsable item id in template; treating slot as wildcard");
                None
            }
            StoredTemplate::Empty { .. } => None,
        }
    }
}

impl StoredRecord {
    fn from_record(record: &ContainerRecord) -> Self {
        Self {
            templates: record.slots.iter().map(StoredTemplate::from_slot).collect(),
            memorize_mode: record.memorize_mode,
            last_modified: Some(record.last_modified),
        }
    }

    fn into_record(self, identity: String) -> ContainerRecord {
        ContainerRecord {
            identity,
            slots: self.templates.into_iter().map(StoredTemplate::into_slot).collect(),
            memorize_mode: self.memorize_mode,
            last_modified: self.last_modified.unwrap_or_else(now_millis),
        }
    }
}

/// JSON Schema of the data file, for documentation and tooling.
pub fn document_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(StoredDocument)
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize every record into one pretty-printed document, keys sorted.
pub fn encode_document(
    records: &HashMap<String, ContainerRecord>,
) -> Result<String, PersistenceError> {
    let doc: StoredDocument = records
        .iter()
        .map(|(key, rec)| (key.clone(), StoredRecord::from_record(rec)))
        .collect();
    serde_json::to_string_pretty(&doc).map_err(PersistenceError::Serialize)
}

/// Parse a document.  Fails only when the text is not a JSON object;
/// individual malformed records are skipped with a warning.
pub fn decode_document(raw: &str) -> Result<HashMap<String, ContainerRecord>, PersistenceError> {
    let Value::Object(root) = serde_json::from_str::<Value>(raw)? else {
        return Err(PersistenceError::NotAnObject);
    };
    let mut records = HashMap::with_capacity(root.len());
    for (key, value) in root {
        match serde_json::from_value::<StoredRecord>(value) {
            Ok(stored) => {
                let record = stored.into_record(key.clone());
                records.insert(key, record);
            }
            Err(e) => warn!(identity = %key, error = %e, "skipping malformed template record"),
        }
    }
    Ok(records)
}

// ─────────────────────────────────────────────────────────────────────────────
// File helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Where a quarantined copy of `path` is placed.
pub fn quarantine_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(QUARANTINE_SUFFIX);
    PathBuf::from(name)
}

/// Move `path` aside to its quarantine name, replacing an older quarantine.
pub fn quarantine(path: &Path) -> Result<PathBuf, PersistenceError> {
    let target = quarantine_path(path);
    match fs::remove_file(&target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(&target)(e)),
    }
    fs::rename(path, &target).map_err(io_err(path))?;
    Ok(target)
}

/// Write `contents` to `path` via a sibling temporary file and an atomic
/// rename, creating parent directories first.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistenceError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err(parent))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err(parent))?;
    tmp.write_all(contents).map_err(io_err(tmp.path()))?;
    tmp.as_file().sync_all().map_err(io_err(path))?;
    tmp.persist(path).map_err(|e| PersistenceError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Read and decode `path`.
///
/// Missing file is `Ok(empty)`.  Content that is not UTF-8 or does not parse
/// quarantines the file and also yields an empty map.  Only unreadable files
/// surface as `Err`.
pub fn load_or_quarantine(path: &Path) -> Result<HashMap<String, ContainerRecord>, PersistenceError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(io_err(path)(e)),
    };
    let decoded = String::from_utf8(bytes)
        .map_err(PersistenceError::from)
        .and_then(|raw| decode_document(&raw));
    match decoded {
        Ok(records) => Ok(records),
        Err(parse_err) => {
            match quarantine(path) {
                Ok(moved_to) => warn!(
                    path = %path.display(),
                    quarantined = %moved_to.display(),
                    error = %parse_err,
                    "template document is corrupt; starting with an empty store"
                ),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "template document is corrupt and could not be quarantined; starting with an empty store"
                ),
            }
            Ok(HashMap::new())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Data file location
// ─────────────────────────────────────────────────────────────────────────────

/// Which world the templates belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldKey {
    /// A locally hosted save, by folder name.
    Local { save_name: String },
    /// A remote server, by address.
    Remote { address: String },
    /// No world context available.
    Unknown,
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_path_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Data file for `world` under `data_dir`.
pub fn data_file_for(data_dir: &Path, world: &WorldKey) -> PathBuf {
    match world {
        WorldKey::Local { save_name } => data_dir
            .join("worlds")
            .join(sanitize_path_component(save_name))
            .join(DATA_FILE_NAME),
        WorldKey::Remote { address } => data_dir
            .join("server_data")
            .join(sanitize_path_component(address))
            .join(DATA_FILE_NAME),
        WorldKey::Unknown => data_dir.join(DATA_FILE_NAME),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backends
// ─────────────────────────────────────────────────────────────────────────────

/// Storage backend for the template store.
pub trait TemplatePersistence: Send {
    /// Load every record.  Never fails: unreadable or corrupt data yields an
    /// empty map after logging.
    fn load(&self) -> HashMap<String, ContainerRecord>;

    /// Replace the stored snapshot with `records`.
    fn save(&self, records: &HashMap<String, ContainerRecord>) -> Result<(), PersistenceError>;

    /// Short human-readable location, used in log lines.
    fn describe(&self) -> String;
}

/// JSON-file persistence at a fixed path.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemplatePersistence for JsonFilePersistence {
    fn load(&self) -> HashMap<String, ContainerRecord> {
        match load_or_quarantine(&self.path) {
            Ok(records) => {
                info!(
                    path = %self.path.display(),
                    containers = records.len(),
                    "loaded container templates"
                );
                records
            }
            Err(e) => {
                warn!(error = %e, "template document unreadable; starting with an empty store");
                HashMap::new()
            }
        }
    }

    fn save(&self, records: &HashMap<String, ContainerRecord>) -> Result<(), PersistenceError> {
        let json = encode_document(records)?;
        write_atomic(&self.path, json.as_bytes())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process backend holding the last saved document as text.
///
/// Clones share state, so a test can keep a handle while the store owns
/// another.  Writes can be made to fail to exercise the error path.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    document: Option<String>,
    saves: usize,
    failing: bool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize {
        self.state().saves
    }

    /// Last saved document, if any.
    pub fn document(&self) -> Option<String> {
        self.state().document.clone()
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TemplatePersistence for MemoryPersistence {
    fn load(&self) -> HashMap<String, ContainerRecord> {
        let Some(doc) = self.document() else {
            return HashMap::new();
        };
        decode_document(&doc).unwrap_or_else(|e| {
            warn!(error = %e, "in-memory template document is corrupt");
            HashMap::new()
        })
    }

    fn save(&self, records: &HashMap<String, ContainerRecord>) -> Result<(), PersistenceError> {
        let mut state = self.state();
        if state.failing {
            return Err(PersistenceError::Unavailable);
        }
        state.document = Some(encode_document(records)?);
        state.saves += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
