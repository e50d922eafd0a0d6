//! [`TemplateStore`] – in-memory container records with write-behind
//! persistence.
//!
//! The store is the source of truth.  Every content or state change marks it
//! dirty; in [`PersistenceMode::Persistent`] the dirty snapshot is written
//! through the configured [`TemplatePersistence`] backend, either inline
//! (zero debounce) or once the debounce window elapses (see
//! [`poll`][TemplateStore::poll]).  In [`PersistenceMode::Session`] nothing
//! reaches disk.
//!
//! No method returns an error.  Out-of-range indices are ignored, unknown
//! identities read as empty, and failed writes are logged and retried on the
//! next save opportunity.
//!
//! # Example
//!
//! ```rust
//! use slotmem_memory::store::TemplateStore;
//! use slotmem_types::{ItemSignature, PersistenceMode};
//!
//! let mut store = TemplateStore::in_memory(PersistenceMode::Persistent);
//! let id = "chest|overworld|10|64|-5";
//!
//! store.get_or_create(id, 27);
//! store.set_template(id, 0, Some(ItemSignature::new("minecraft:diamond")), 27);
//!
//! assert_eq!(store.template(id, 0), Some(&ItemSignature::new("minecraft:diamond")));
//! assert_eq!(store.template(id, 1), None);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use slotmem_types::{ItemSignature, PersistenceMode, TemplateSlot};
use tracing::{debug, error};

use crate::persistence::{MemoryPersistence, TemplatePersistence};
use crate::record::ContainerRecord;
use crate::write_behind::WriteBehind;

// ─────────────────────────────────────────────────────────────────────────────
// StoreStats
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate view of the store, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub mode: PersistenceMode,
    pub containers: usize,
    pub templated_slots: usize,
    pub memorizing: usize,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.mode {
            PersistenceMode::Persistent => "Persistent mode",
            PersistenceMode::Session => "Session mode",
        };
        write!(
            f,
            "{}: {} containers, {} templated slots, {} memorizing",
            label, self.containers, self.templated_slots, self.memorizing
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TemplateStore
// ─────────────────────────────────────────────────────────────────────────────

/// Mapping from container identity key to [`ContainerRecord`].
///
/// Single-owner and not internally synchronized: the host delivers events one
/// at a time and the store is mutated only through `&mut self`.
pub struct TemplateStore {
    records: HashMap<String, ContainerRecord>,
    mode: PersistenceMode,
    backend: Box<dyn TemplatePersistence>,
    write_behind: WriteBehind,
}

impl TemplateStore {
    /// An empty store over `backend`.  Nothing is read from the backend.
    pub fn new(
        backend: Box<dyn TemplatePersistence>,
        mode: PersistenceMode,
        write_behind: WriteBehind,
    ) -> Self {
        Self {
            records: HashMap::new(),
            mode,
            backend,
            write_behind,
        }
    }

    /// A store populated from `backend`.  Corrupt or missing data yields an
    /// empty store.
    pub fn load(
        backend: Box<dyn TemplatePersistence>,
        mode: PersistenceMode,
        write_behind: WriteBehind,
    ) -> Self {
        let records = backend.load();
        Self {
            records,
            mode,
            backend,
            write_behind,
        }
    }

    /// A write-through store over a fresh [`MemoryPersistence`] (useful for
    /// testing).
    pub fn in_memory(mode: PersistenceMode) -> Self {
        Self::new(
            Box::new(MemoryPersistence::new()),
            mode,
            WriteBehind::write_through(),
        )
    }

    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    /// Switch persistence mode.
    ///
    /// Pending writes are flushed before leaving persistent mode, and entering
    /// persistent mode writes the current snapshot immediately.
    pub fn set_mode(&mut self, mode: PersistenceMode) {
        if mode == self.mode {
            return;
        }
        if self.mode.is_persistent() {
            self.flush();
        }
        self.mode = mode;
        if mode.is_persistent() {
            self.save_now();
        } else {
            self.write_behind.clear();
        }
    }

    // ── queries ──────────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<&ContainerRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &HashMap<String, ContainerRecord> {
        &self.records
    }

    /// All identity keys, sorted.
    pub fn identities(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.records.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Template at `index`; `None` for wildcards, unknown identities and
    /// out-of-range indices.
    pub fn template(&self, id: &str, index: usize) -> Option<&ItemSignature> {
        self.records.get(id).and_then(|r| r.template(index))
    }

    /// Number of slots currently remembered for `id` (0 when unknown).
    pub fn slot_count(&self, id: &str) -> usize {
        self.records.get(id).map(|r| r.slots.len()).unwrap_or(0)
    }

    /// Memorize flag; `false` for unknown identities.
    pub fn is_memorize_mode(&self, id: &str) -> bool {
        self.records.get(id).map(|r| r.memorize_mode).unwrap_or(false)
    }

    pub fn has_any_templates(&self, id: &str) -> bool {
        self.records
            .get(id)
            .map(ContainerRecord::has_any_templates)
            .unwrap_or(false)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            mode: self.mode,
            containers: self.records.len(),
            templated_slots: self.records.values().map(|r| r.templated_count()).sum(),
            memorizing: self.records.values().filter(|r| r.memorize_mode).count(),
        }
    }

    // ── mutations ────────────────────────────────────────────────────────

    /// Return the record for `id`, creating it with `slot_count` wildcards or
    /// resizing it to `slot_count`.
    ///
    /// A resize keeps the existing prefix and counts as a modification.
    pub fn get_or_create(&mut self, id: &str, slot_count: usize) -> &ContainerRecord {
        let mut changed = false;
        match self.records.get_mut(id) {
            Some(record) => changed = record.resize(slot_count),
            None => {
                self.records
                    .insert(id.to_string(), ContainerRecord::new(id, slot_count));
            }
        }
        if changed {
            self.schedule_save();
        }
        &self.records[id]
    }

    /// Set (or with `None`, clear) the template at `index`.
    ///
    /// Ignored when `index >= slot_count`; a UI may race ahead of a resize.
    pub fn set_template(
        &mut self,
        id: &str,
        index: usize,
        template: TemplateSlot,
        slot_count: usize,
    ) {
        if index >= slot_count {
            debug!(identity = %id, index, slot_count, "ignoring out-of-range template write");
            return;
        }
        self.get_or_create(id, slot_count);
        if let Some(record) = self.records.get_mut(id) {
            record.slots[index] = template;
            record.touch();
        }
        self.schedule_save();
    }

    /// Replace every slot with the matching entry of `contents`.
    ///
    /// `contents` is truncated or padded with wildcards to the record's
    /// current length; an unknown identity is created with
    /// `contents.len()` slots.
    pub fn capture_all(&mut self, id: &str, contents: &[TemplateSlot]) {
        let record = self
            .records
            .entry(id.to_string())
            .or_insert_with(|| ContainerRecord::new(id, contents.len()));
        for (i, slot) in record.slots.iter_mut().enumerate() {
            *slot = contents.get(i).cloned().flatten();
        }
        record.touch();
        self.schedule_save();
    }

    /// Reset every slot of `id` to wildcard.  Unknown identities are ignored.
    pub fn clear_all(&mut self, id: &str) {
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        record.slots.iter_mut().for_each(|s| *s = None);
        record.touch();
        self.schedule_save();
    }

    /// Flip the memorize flag of `id` and return the new value.
    ///
    /// Unknown identities are left alone and report `false`.
    pub fn toggle_mode(&mut self, id: &str) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            debug!(identity = %id, "ignoring memorize toggle for unknown container");
            return false;
        };
        record.memorize_mode = !record.memorize_mode;
        record.touch();
        let now = record.memorize_mode;
        self.schedule_save();
        now
    }

    /// Container closed.
    ///
    /// With `persistent` the record is kept and memorize mode ends; otherwise
    /// the record is dropped.
    pub fn release(&mut self, id: &str, persistent: bool) {
        if persistent {
            let Some(record) = self.records.get_mut(id) else {
                return;
            };
            if record.memorize_mode {
                record.memorize_mode = false;
                record.touch();
                self.schedule_save();
            }
        } else if self.records.remove(id).is_some() {
            self.schedule_save();
        }
    }

    /// Delete `id` and, in persistent mode, save immediately regardless of
    /// the debounce window.
    pub fn force_remove(&mut self, id: &str) {
        let removed = self.records.remove(id).is_some();
        debug!(identity = %id, removed, "force-removing container record");
        if self.mode.is_persistent() {
            self.write_behind.mark_dirty(Instant::now());
            self.save_now();
        }
    }

    /// Bump `last_modified` of `id` and schedule a save.
    pub fn mark_modified(&mut self, id: &str) {
        if let Some(record) = self.records.get_mut(id) {
            record.touch();
            self.schedule_save();
        }
    }

    pub(crate) fn record_mut(&mut self, id: &str) -> Option<&mut ContainerRecord> {
        self.records.get_mut(id)
    }

    // ── persistence ──────────────────────────────────────────────────────

    /// Save when the debounce window has elapsed at `now`.  Returns `true`
    /// when a save succeeded.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.mode.is_persistent() && self.write_behind.is_due(now) {
            return self.save_now();
        }
        false
    }

    /// Save pending mutations, if any.
    pub fn flush(&mut self) -> bool {
        if self.mode.is_persistent() && self.write_behind.is_dirty() {
            return self.save_now();
        }
        false
    }

    /// Write the full snapshot now (persistent mode only).
    pub fn save_all(&mut self) -> bool {
        if !self.mode.is_persistent() {
            return false;
        }
        self.save_now()
    }

    pub fn has_pending_writes(&self) -> bool {
        self.write_behind.is_dirty()
    }

    fn schedule_save(&mut self) {
        if !self.mode.is_persistent() {
            return;
        }
        self.write_behind.mark_dirty(Instant::now());
        if self.write_behind.is_write_through() {
            self.save_now();
        }
    }

    fn save_now(&mut self) -> bool {
        match self.backend.save(&self.records) {
            Ok(()) => {
                self.write_behind.clear();
                debug!(
                    target_file = %self.backend.describe(),
                    containers = self.records.len(),
                    "saved container templates"
                );
                true
            }
            Err(e) => {
                // Stay dirty: the next mutation, poll or flush retries.
                self.write_behind.mark_dirty(Instant::now());
                error!(
                    target_file = %self.backend.describe(),
                    error = %e,
                    "failed to save container templates; keeping in-memory state"
                );
                false
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
