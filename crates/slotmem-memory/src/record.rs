//! [`ContainerRecord`] – the remembered layout of one container.

use chrono::Utc;
use slotmem_types::{ItemSignature, TemplateSlot};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Templates and memorize state for a single container identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    /// Storage key of the owning container.
    pub identity: String,
    /// One entry per container slot; `None` is a wildcard.
    pub slots: Vec<TemplateSlot>,
    /// While set, slot clicks edit templates instead of moving items.
    pub memorize_mode: bool,
    /// Epoch milliseconds of the last change.
    pub last_modified: i64,
}

impl ContainerRecord {
    /// A record with `slot_count` wildcard slots.
    pub fn new(identity: impl Into<String>, slot_count: usize) -> Self {
        Self {
            identity: identity.into(),
            slots: vec![None; slot_count],
            memorize_mode: false,
            last_modified: now_millis(),
        }
    }

    /// Grow (appending wildcards) or truncate to `slot_count`.
    ///
    /// Returns `true` when the length changed.
    pub fn resize(&mut self, slot_count: usize) -> bool {
        if self.slots.len() == slot_count {
            return false;
        }
        self.slots.resize(slot_count, None);
        self.touch();
        true
    }

    /// Template for `index`, or `None` (wildcard) when out of range.
    pub fn template(&self, index: usize) -> Option<&ItemSignature> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of slots holding a concrete template.
    pub fn templated_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn has_any_templates(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    pub fn touch(&mut self) {
        self.last_modified = now_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(id: &str) -> TemplateSlot {
        Some(ItemSignature::new(id))
    }

    #[test]
    fn new_record_is_all_wildcards() {
        let rec = ContainerRecord::new("c", 4);
        assert_eq!(rec.slots, vec![None; 4]);
        assert!(!rec.memorize_mode);
        assert!(!rec.has_any_templates());
    }

    #[test]
    fn grow_preserves_prefix() {
        let mut rec = ContainerRecord::new("c", 3);
        rec.slots = vec![sig("a"), sig("b"), None];
        assert!(rec.resize(5));
        assert_eq!(rec.slots, vec![sig("a"), sig("b"), None, None, None]);
    }

    #[test]
    fn shrink_truncates() {
        let mut rec = ContainerRecord::new("c", 3);
        rec.slots = vec![sig("a"), sig("b"), None];
        assert!(rec.resize(2));
        assert_eq!(rec.slots, vec![sig("a"), sig("b")]);
    }

    #[test]
    fn same_size_resize_is_noop() {
        let mut rec = ContainerRecord::new("c", 3);
        rec.last_modified = 0;
        assert!(!rec.resize(3));
        assert_eq!(rec.last_modified, 0);
    }

    #[test]
    fn out_of_range_template_is_wildcard() {
        let rec = ContainerRecord::new("c", 1);
        assert!(rec.template(5).is_none());
    }

    #[test]
    fn templated_count_counts_concrete_slots() {
        let mut rec = ContainerRecord::new("c", 3);
        rec.slots[1] = sig("a");
        assert_eq!(rec.templated_count(), 1);
        assert!(rec.has_any_templates());
    }
}
