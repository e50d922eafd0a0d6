//! [`WriteBehind`] – debounce state for store persistence.
//!
//! The store marks itself dirty on every mutation.  With a zero debounce every
//! mutation is written through immediately; otherwise a save becomes due once
//! the debounce window has elapsed since the first unsaved mutation, and the
//! host drives it by polling.  Shutdown always flushes.

use std::time::{Duration, Instant};

/// Tracks unsaved mutations and decides when a save is due.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use slotmem_memory::write_behind::WriteBehind;
///
/// let mut wb = WriteBehind::new(Duration::from_millis(500));
/// let t0 = Instant::now();
/// wb.mark_dirty(t0);
///
/// assert!(!wb.is_due(t0 + Duration::from_millis(100)));
/// assert!(wb.is_due(t0 + Duration::from_millis(600)));
/// ```
#[derive(Debug, Clone)]
pub struct WriteBehind {
    debounce: Duration,
    dirty_since: Option<Instant>,
}

impl WriteBehind {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            dirty_since: None,
        }
    }

    /// A zero-debounce instance: every mutation saves inline.
    pub fn write_through() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn is_write_through(&self) -> bool {
        self.debounce.is_zero()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Record a mutation at `now`.  The window starts at the first unsaved
    /// mutation and is not extended by later ones, so a steady stream of
    /// edits still reaches disk.
    pub fn mark_dirty(&mut self, now: Instant) {
        if self.dirty_since.is_none() {
            self.dirty_since = Some(now);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// `true` when dirty and the debounce window has elapsed at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.dirty_since {
            Some(since) => now.saturating_duration_since(since) >= self.debounce,
            None => false,
        }
    }

    /// Forget pending mutations after a successful save.
    pub fn clear(&mut self) {
        self.dirty_since = None;
    }
}

impl Default for WriteBehind {
    fn default() -> Self {
        Self::write_through()
    }
}
