//! `slotmem-kernel` – Host Event Handling
//!
//! Sits between a game client and the template store.  It decides which
//! identity an opened container gets, filters insertions, and turns
//! memorize-mode clicks into template edits.
//!
//! # Modules
//!
//! - [`identity`] – [`resolve_identity`][identity::resolve_identity]:
//!   positional or per-session keys, plus a bounded nearby-container search
//!   through a host [`SpatialLocator`][identity::SpatialLocator].
//! - [`insertion_gate`] – [`can_insert`][insertion_gate::can_insert]:
//!   applies the match policy to container slots only, and lists quick-move
//!   targets.
//! - [`memorize`] – click button decoding, template source selection and
//!   [`ClickDebounce`][memorize::ClickDebounce].
//! - [`session`] – [`SlotMemorySession`][session::SlotMemorySession]:
//!   the single object a host holds.  Owns the store, tracks open screens and
//!   rebinds them when the persistence mode changes.

pub mod identity;
pub mod insertion_gate;
pub mod memorize;
pub mod session;

pub use identity::{SearchRadius, SpatialLocator, find_nearby_container, resolve_identity};
pub use insertion_gate::{can_insert, can_take, container_slot_count, quick_move_targets};
pub use memorize::{ClickButton, ClickDebounce, pick_template_source};
pub use session::{ContainerOpened, SessionConfig, SlotMemorySession};
