//! Insertion filtering.
//!
//! Only container slots are filtered.  A host screen lists the container's
//! slots first and the player's inventory after them; indices at or past the
//! container's slot count always pass.

use slotmem_memory::matching;
use slotmem_memory::store::TemplateStore;
use slotmem_types::ItemSignature;

/// Number of container slots in a screen of `total_slots`, given how many of
/// them belong to the player's inventory.
pub fn container_slot_count(total_slots: usize, player_inventory_slots: usize) -> usize {
    total_slots.saturating_sub(player_inventory_slots)
}

/// May `candidate` be placed into `slot_index` of container `id`?
pub fn can_insert(
    store: &TemplateStore,
    id: &str,
    slot_index: usize,
    candidate: Option<&ItemSignature>,
) -> bool {
    if slot_index >= store.slot_count(id) {
        return true;
    }
    matching::matches(store.template(id, slot_index), candidate)
}

/// Taking items out is never restricted.
pub fn can_take(store: &TemplateStore, id: &str, slot_index: usize) -> bool {
    matching::can_take(store.template(id, slot_index))
}

/// Container slots that would accept `candidate`, ascending.  Used to route a
/// quick-move (shift-click) from the player's inventory.
pub fn quick_move_targets(store: &TemplateStore, id: &str, candidate: &ItemSignature) -> Vec<usize> {
    let Some(record) = store.get(id) else {
        return Vec::new();
    };
    record
        .slots
        .iter()
        .enumerate()
        .filter(|(_, template)| matching::matches(template.as_ref(), Some(candidate)))
        .map(|(i, _)| i)
        .collect()
}
