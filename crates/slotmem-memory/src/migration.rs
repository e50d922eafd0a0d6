//! Identity migration.
//!
//! When a container that is already open changes address space (for example
//! persistent mode is switched on while its screen is up, so its session key
//! becomes a positional key) its templates and memorize flag are copied to
//! the new identity.
//!
//! The source record is left where it is; callers that want it gone must call
//! [`TemplateStore::force_remove`] themselves.

use tracing::debug;

use crate::store::TemplateStore;

/// Copy the templates and memorize flag of `from` into `to`.
///
/// The destination is created (or resized) to the source's slot count first.
/// Returns `true` when anything was copied; identical or unknown sources are
/// no-ops.
///
/// ```
/// use slotmem_memory::{migration::migrate, store::TemplateStore};
/// use slotmem_types::{ItemSignature, PersistenceMode};
///
/// let mut store = TemplateStore::in_memory(PersistenceMode::Persistent);
/// store.set_template("session|Chest|3", 0, Some(ItemSignature::new("minecraft:stone")), 9);
///
/// assert!(migrate(&mut store, "session|Chest|3", "chest|overworld|0|64|0"));
/// assert_eq!(
///     store.template("chest|overworld|0|64|0", 0),
///     Some(&ItemSignature::new("minecraft:stone"))
/// );
/// assert!(store.contains("session|Chest|3"));
/// ```
pub fn migrate(store: &mut TemplateStore, from: &str, to: &str) -> bool {
    if from == to {
        return false;
    }
    let Some(source) = store.get(from) else {
        return false;
    };
    let slots = source.slots.clone();
    let memorize_mode = source.memorize_mode;

    store.get_or_create(to, slots.len());
    let Some(dest) = store.record_mut(to) else {
        return false;
    };
    let n = slots.len().min(dest.slots.len());
    dest.slots[..n].clone_from_slice(&slots[..n]);
    dest.memorize_mode = memorize_mode;

    debug!(from = %from, to = %to, slots = n, "migrated container templates");
    store.mark_modified(to);
    true
}
