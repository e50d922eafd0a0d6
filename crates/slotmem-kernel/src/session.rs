//! [`SlotMemorySession`] – the host-facing entry point.
//!
//! One session owns the [`TemplateStore`] for the lifetime of the host
//! application and is passed by reference to whatever dispatches host events.
//! Each `on_*` method corresponds to one host event; none of them return
//! errors.
//!
//! # Lifecycle
//!
//! 1. [`SlotMemorySession::load_all`] once at start-up.
//! 2. `on_container_opened` / `on_*` / `on_container_closed` per screen.
//! 3. [`SlotMemorySession::tick`] periodically when saves are debounced.
//! 4. [`SlotMemorySession::shutdown`] once at exit; this always flushes.
//!
//! # Close policy
//!
//! Closing a container always ends memorize mode.  A positional record in
//! persistent mode is kept; anything else (session mode, or a session
//! identity used as fallback) is dropped, since a session key can never be
//! reopened.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use slotmem_memory::migration::migrate;
use slotmem_memory::persistence::{JsonFilePersistence, MemoryPersistence, TemplatePersistence};
use slotmem_memory::store::{StoreStats, TemplateStore};
use slotmem_memory::write_behind::WriteBehind;
use slotmem_types::{
    ContainerIdentity, ContainerKind, ItemSignature, PersistenceMode, SpatialCoordinate,
    TemplateSlot,
};
use tracing::{debug, info};

use crate::identity::{SearchRadius, SpatialLocator, find_nearby_container, resolve_identity};
use crate::insertion_gate;
use crate::memorize::{ClickButton, ClickDebounce};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime settings for a [`SlotMemorySession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub persistence_mode: PersistenceMode,
    /// Data file for persistent mode.  `None` keeps the snapshot in memory.
    pub data_file: Option<PathBuf>,
    /// Zero writes every mutation through immediately.
    pub save_debounce: Duration,
    pub search_radius: SearchRadius,
    /// Minimum spacing between accepted memorize clicks on one container.
    pub click_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persistence_mode: PersistenceMode::Persistent,
            data_file: None,
            save_debounce: Duration::ZERO,
            search_radius: SearchRadius::default(),
            click_debounce: Duration::from_millis(100),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// A trackable container screen was opened.
///
/// The host declares the container kind explicitly and passes the number of
/// container slots (player inventory excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerOpened {
    pub kind: ContainerKind,
    pub coordinate: Option<SpatialCoordinate>,
    pub screen_type_tag: String,
    pub session_id: i32,
    pub slot_count: usize,
}

struct OpenContainer {
    event: ContainerOpened,
    identity: ContainerIdentity,
    clicks: ClickDebounce,
}

// ─────────────────────────────────────────────────────────────────────────────
// SlotMemorySession
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the template store and translates host events into store operations.
///
/// # Example
///
/// ```
/// use slotmem_kernel::session::{ContainerOpened, SessionConfig, SlotMemorySession};
/// use slotmem_types::{ContainerKind, ItemSignature, SpatialCoordinate};
///
/// let mut session = SlotMemorySession::load_all(SessionConfig::default());
/// let id = session.on_container_opened(ContainerOpened {
///     kind: ContainerKind::Chest,
///     coordinate: Some(SpatialCoordinate::new("overworld", 10, 64, -5)),
///     screen_type_tag: "GenericContainerScreen".into(),
///     session_id: 1,
///     slot_count: 27,
/// });
///
/// let diamond = ItemSignature::new("minecraft:diamond");
/// session.on_toggle_memorize_mode(&id);
/// session.on_memorize_click(&id, 0, 0, Some(diamond.clone()));
///
/// assert!(session.on_attempt_insert(&id, 0, Some(&diamond)));
/// assert!(!session.on_attempt_insert(&id, 0, Some(&ItemSignature::new("minecraft:emerald"))));
/// ```
pub struct SlotMemorySession {
    store: TemplateStore,
    config: SessionConfig,
    open: HashMap<String, OpenContainer>,
}

impl SlotMemorySession {
    /// Build the configured backend and load it once.
    pub fn load_all(config: SessionConfig) -> Self {
        let backend: Box<dyn TemplatePersistence> = match &config.data_file {
            Some(path) => Box::new(JsonFilePersistence::new(path.clone())),
            None => Box::new(MemoryPersistence::new()),
        };
        info!(
            mode = %config.persistence_mode,
            backend = %backend.describe(),
            "starting slot memory session"
        );
        let store = TemplateStore::load(
            backend,
            config.persistence_mode,
            WriteBehind::new(config.save_debounce),
        );
        Self::with_store(store, config)
    }

    /// Wrap an existing store.  The store's mode wins over the config's.
    pub fn with_store(store: TemplateStore, mut config: SessionConfig) -> Self {
        config.persistence_mode = store.mode();
        Self {
            store,
            config,
            open: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn persistence_mode(&self) -> PersistenceMode {
        self.store.mode()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Identities of currently open containers, sorted by key.
    pub fn open_containers(&self) -> Vec<&ContainerIdentity> {
        let mut ids: Vec<&ContainerIdentity> = self.open.values().map(|o| &o.identity).collect();
        ids.sort_by_key(|id| id.key());
        ids
    }

    /// Locate the container the player most likely opened, scanning around
    /// `origin` with the configured radius.
    pub fn locate<L>(&self, locator: &L, origin: &SpatialCoordinate) -> Option<SpatialCoordinate>
    where
        L: SpatialLocator + ?Sized,
    {
        find_nearby_container(locator, origin, self.config.search_radius)
    }

    // ── screen lifecycle ─────────────────────────────────────────────────

    /// Resolve the identity of an opened container and size its record.
    pub fn on_container_opened(&mut self, event: ContainerOpened) -> ContainerIdentity {
        let identity = resolve_identity(
            &event.kind,
            event.coordinate.as_ref(),
            &event.screen_type_tag,
            event.session_id,
            self.store.mode().is_persistent(),
        );
        let key = identity.key();
        self.store.get_or_create(&key, event.slot_count);
        debug!(identity = %key, slots = event.slot_count, "container opened");
        self.open.insert(
            key,
            OpenContainer {
                event,
                identity: identity.clone(),
                clicks: ClickDebounce::new(self.config.click_debounce),
            },
        );
        identity
    }

    pub fn on_container_closed(&mut self, identity: &ContainerIdentity) {
        let key = identity.key();
        let keep = self.store.mode().is_persistent() && identity.is_positional();
        self.store.release(&key, keep);
        self.open.remove(&key);
        debug!(identity = %key, kept = keep, "container closed");
    }

    // ── slot interaction ─────────────────────────────────────────────────

    /// Whether `candidate` may be inserted into `slot_index`.
    pub fn on_attempt_insert(
        &self,
        identity: &ContainerIdentity,
        slot_index: usize,
        candidate: Option<&ItemSignature>,
    ) -> bool {
        insertion_gate::can_insert(&self.store, &identity.key(), slot_index, candidate)
    }

    /// Taking items out is always allowed.
    pub fn on_attempt_take(&self, identity: &ContainerIdentity, slot_index: usize) -> bool {
        insertion_gate::can_take(&self.store, &identity.key(), slot_index)
    }

    /// Container slots that would accept a quick-moved `candidate`.
    pub fn quick_move_targets(
        &self,
        identity: &ContainerIdentity,
        candidate: &ItemSignature,
    ) -> Vec<usize> {
        insertion_gate::quick_move_targets(&self.store, &identity.key(), candidate)
    }

    /// Template of one slot, for ghost rendering.
    pub fn template(&self, identity: &ContainerIdentity, slot_index: usize) -> Option<&ItemSignature> {
        self.store.template(&identity.key(), slot_index)
    }

    pub fn is_memorize_mode(&self, identity: &ContainerIdentity) -> bool {
        self.store.is_memorize_mode(&identity.key())
    }

    pub fn has_any_templates(&self, identity: &ContainerIdentity) -> bool {
        self.store.has_any_templates(&identity.key())
    }

    /// A slot was clicked while memorize mode is on.  Button 0 remembers
    /// `source`, button 1 clears the slot.
    ///
    /// Returns `true` when the click was consumed and the host must not move
    /// items for it.
    pub fn on_memorize_click(
        &mut self,
        identity: &ContainerIdentity,
        slot_index: usize,
        button: u8,
        source: Option<ItemSignature>,
    ) -> bool {
        self.on_memorize_click_at(identity, slot_index, button, source, Instant::now())
    }

    /// [`on_memorize_click`][Self::on_memorize_click] with an explicit clock.
    pub fn on_memorize_click_at(
        &mut self,
        identity: &ContainerIdentity,
        slot_index: usize,
        button: u8,
        source: Option<ItemSignature>,
        now: Instant,
    ) -> bool {
        let key = identity.key();
        if !self.store.is_memorize_mode(&key) {
            return false;
        }
        if let Some(open) = self.open.get_mut(&key)
            && !open.clicks.accept(now)
        {
            return true;
        }
        let slot_count = self.store.slot_count(&key);
        match ClickButton::from(button) {
            ClickButton::Set => self.store.set_template(&key, slot_index, source, slot_count),
            ClickButton::Clear => self.store.set_template(&key, slot_index, None, slot_count),
            ClickButton::Other(_) => {}
        }
        true
    }

    pub fn on_toggle_memorize_mode(&mut self, identity: &ContainerIdentity) -> bool {
        self.store.toggle_mode(&identity.key())
    }

    pub fn on_clear_all(&mut self, identity: &ContainerIdentity) {
        self.store.clear_all(&identity.key());
    }

    pub fn on_capture_all(&mut self, identity: &ContainerIdentity, contents: &[TemplateSlot]) {
        self.store.capture_all(&identity.key(), contents);
    }

    /// Delete a container's memory outright and persist at once.
    pub fn forget(&mut self, identity_key: &str) {
        self.store.force_remove(identity_key);
    }

    // ── mode & persistence ───────────────────────────────────────────────

    /// Switch address space and persistence at runtime.
    ///
    /// Every open container is re-resolved; if its key changes its templates
    /// follow it.  A session-keyed source is dropped after migration because
    /// it can never be reopened; a positional source is kept.
    pub fn set_persistence_mode(&mut self, mode: PersistenceMode) {
        if mode == self.store.mode() {
            return;
        }
        self.store.set_mode(mode);
        self.config.persistence_mode = mode;

        let open = std::mem::take(&mut self.open);
        for (old_key, mut entry) in open {
            let identity = resolve_identity(
                &entry.event.kind,
                entry.event.coordinate.as_ref(),
                &entry.event.screen_type_tag,
                entry.event.session_id,
                mode.is_persistent(),
            );
            let new_key = identity.key();
            if new_key != old_key && migrate(&mut self.store, &old_key, &new_key) {
                info!(from = %old_key, to = %new_key, "rebound open container");
                if !entry.identity.is_positional() {
                    self.store.force_remove(&old_key);
                }
            }
            entry.identity = identity;
            self.open.insert(new_key, entry);
        }
    }

    /// Drive debounced saves.  Returns `true` when a save happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.store.poll(now)
    }

    /// Write the full snapshot now (persistent mode only).
    pub fn save_all(&mut self) -> bool {
        self.store.save_all()
    }

    /// Final flush at application exit.
    pub fn shutdown(mut self) {
        let saved = self.store.save_all();
        info!(saved, "slot memory session shut down");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> ItemSignature {
        ItemSignature::new("minecraft:diamond")
    }

    fn emerald() -> ItemSignature {
        ItemSignature::new("minecraft:emerald")
    }

    fn chest_event(coordinate: Option<SpatialCoordinate>, session_id: i32) -> ContainerOpened {
        ContainerOpened {
            kind: ContainerKind::Chest,
            coordinate,
            screen_type_tag: "GenericContainerScreen".into(),
            session_id,
            slot_count: 27,
        }
    }

    fn chest_pos() -> Option<SpatialCoordinate> {
        Some(SpatialCoordinate::new("overworld", 10, 64, -5))
    }

    fn session(mode: PersistenceMode) -> SlotMemorySession {
        SlotMemorySession::load_all(SessionConfig {
            persistence_mode: mode,
            click_debounce: Duration::ZERO,
            ..SessionConfig::default()
        })
    }

    #[test]
    fn open_creates_sized_record() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        assert_eq!(id.key(), "chest|overworld|10|64|-5");
        assert_eq!(s.store().slot_count(&id.key()), 27);
        assert_eq!(s.open_containers(), vec![&id]);
    }

    #[test]
    fn memorize_click_requires_memorize_mode() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        assert!(!s.on_memorize_click(&id, 0, 0, Some(diamond())));
        assert_eq!(s.template(&id, 0), None);
    }

    #[test]
    fn left_click_sets_right_click_clears() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        s.on_toggle_memorize_mode(&id);

        assert!(s.on_memorize_click(&id, 4, 0, Some(diamond())));
        assert_eq!(s.template(&id, 4), Some(&diamond()));

        assert!(s.on_memorize_click(&id, 4, 1, Some(diamond())));
        assert_eq!(s.template(&id, 4), None);
    }

    #[test]
    fn other_buttons_are_consumed_but_ignored() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        s.on_toggle_memorize_mode(&id);
        assert!(s.on_memorize_click(&id, 0, 2, Some(diamond())));
        assert_eq!(s.template(&id, 0), None);
    }

    #[test]
    fn debounced_clicks_are_swallowed() {
        let mut s = SlotMemorySession::load_all(SessionConfig {
            click_debounce: Duration::from_millis(100),
            ..SessionConfig::default()
        });
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        s.on_toggle_memorize_mode(&id);
        let t0 = Instant::now();
        assert!(s.on_memorize_click_at(&id, 0, 0, Some(diamond()), t0));
        assert!(s.on_memorize_click_at(&id, 1, 0, Some(diamond()), t0 + Duration::from_millis(10)));
        assert_eq!(s.template(&id, 1), None, "second click inside window is dropped");
        assert!(s.on_memorize_click_at(&id, 1, 0, Some(diamond()), t0 + Duration::from_millis(200)));
        assert_eq!(s.template(&id, 1), Some(&diamond()));
    }

    #[test]
    fn out_of_range_click_is_ignored() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        s.on_toggle_memorize_mode(&id);
        s.on_memorize_click(&id, 99, 0, Some(diamond()));
        assert_eq!(s.store().slot_count(&id.key()), 27);
        assert!(!s.has_any_templates(&id));
    }

    #[test]
    fn insert_filter_and_take_asymmetry() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        let mut contents = vec![None; 27];
        contents[0] = Some(diamond());
        s.on_capture_all(&id, &contents);

        assert!(s.on_attempt_insert(&id, 0, Some(&diamond())));
        assert!(!s.on_attempt_insert(&id, 0, Some(&emerald())));
        assert!(s.on_attempt_insert(&id, 1, Some(&emerald())));
        assert!(s.on_attempt_take(&id, 0));
        assert_eq!(s.quick_move_targets(&id, &emerald()).first(), Some(&1));
    }

    #[test]
    fn close_in_persistent_mode_keeps_templates_and_ends_memorize() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        s.on_toggle_memorize_mode(&id);
        s.on_memorize_click(&id, 0, 0, Some(diamond()));
        s.on_container_closed(&id);

        assert!(!s.is_memorize_mode(&id));
        let reopened = s.on_container_opened(chest_event(chest_pos(), 2));
        assert_eq!(reopened, id);
        assert_eq!(s.template(&reopened, 0), Some(&diamond()));
    }

    #[test]
    fn close_in_session_mode_forgets() {
        let mut s = session(PersistenceMode::Session);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        assert!(!id.is_positional());
        s.on_toggle_memorize_mode(&id);
        s.on_memorize_click(&id, 0, 0, Some(diamond()));
        s.on_container_closed(&id);
        assert!(!s.store().contains(&id.key()));
        assert!(s.open_containers().is_empty());
    }

    #[test]
    fn session_fallback_in_persistent_mode_is_dropped_on_close() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(None, 7));
        assert!(!id.is_positional());
        s.on_container_closed(&id);
        assert!(!s.store().contains(&id.key()));
    }

    #[test]
    fn clear_all_wipes_templates() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        s.on_capture_all(&id, &[Some(diamond()), Some(emerald())]);
        s.on_clear_all(&id);
        assert!(!s.has_any_templates(&id));
    }

    #[test]
    fn forget_removes_record() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        s.on_capture_all(&id, &[Some(diamond())]);
        s.forget(&id.key());
        assert!(!s.store().contains(&id.key()));
    }

    #[test]
    fn enabling_persistence_rebinds_open_container() {
        let mut s = session(PersistenceMode::Session);
        let session_id = s.on_container_opened(chest_event(chest_pos(), 3));
        s.on_toggle_memorize_mode(&session_id);
        s.on_memorize_click(&session_id, 2, 0, Some(diamond()));

        s.set_persistence_mode(PersistenceMode::Persistent);

        let rebound = s.open_containers()[0].clone();
        assert_eq!(rebound.key(), "chest|overworld|10|64|-5");
        assert_eq!(s.template(&rebound, 2), Some(&diamond()));
        assert!(s.is_memorize_mode(&rebound));
        assert!(!s.store().contains(&session_id.key()), "session source is dropped");
    }

    #[test]
    fn disabling_persistence_keeps_positional_source() {
        let mut s = session(PersistenceMode::Persistent);
        let id = s.on_container_opened(chest_event(chest_pos(), 3));
        s.on_capture_all(&id, &[Some(diamond())]);

        s.set_persistence_mode(PersistenceMode::Session);

        let rebound = s.open_containers()[0].clone();
        assert!(!rebound.is_positional());
        assert_eq!(s.template(&rebound, 0), Some(&diamond()));
        assert!(s.store().contains(&id.key()));
    }

    #[test]
    fn locate_uses_configured_radius() {
        let s = SlotMemorySession::load_all(SessionConfig {
            search_radius: SearchRadius {
                horizontal: 1,
                vertical: 0,
            },
            ..SessionConfig::default()
        });
        let origin = SpatialCoordinate::new("overworld", 0, 64, 0);
        let far = |c: &SpatialCoordinate| c.x == 3;
        let near = |c: &SpatialCoordinate| c.x == 1 && c.z == 0;
        assert!(s.locate(&far, &origin).is_none());
        assert_eq!(
            s.locate(&near, &origin),
            Some(SpatialCoordinate::new("overworld", 1, 64, 0))
        );
    }

    #[test]
    fn debounced_session_saves_on_tick() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("memory_templates.json");
        let mut s = SlotMemorySession::load_all(SessionConfig {
            data_file: Some(path.clone()),
            save_debounce: Duration::from_millis(250),
            click_debounce: Duration::ZERO,
            ..SessionConfig::default()
        });
        let id = s.on_container_opened(chest_event(chest_pos(), 1));
        s.on_capture_all(&id, &[Some(diamond())]);
        assert!(!path.exists());
        assert!(s.tick(Instant::now() + Duration::from_secs(1)));
        assert!(path.exists());
    }
}
