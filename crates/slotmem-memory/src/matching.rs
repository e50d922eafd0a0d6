//! Template matching.
//!
//! [`matches`] is the single authority on whether an item may be *inserted*
//! into a templated slot.  Nothing here governs removal: taking an item out of
//! a slot is always allowed, whatever its template says, so that misplaced
//! items can be corrected.
//!
//! | template | candidate | result |
//! |----------|-----------|--------|
//! | `None`   | anything  | `true` |
//! | `Some(t)`| `None`    | `false`|
//! | `Some(t)`| `Some(c)` | `t == c` (type + attributes, count ignored) |

use slotmem_types::ItemSignature;

/// Decide whether `candidate` satisfies `template`.
///
/// ```
/// use slotmem_memory::matching::matches;
/// use slotmem_types::ItemSignature;
///
/// let diamond = ItemSignature::new("minecraft:diamond");
/// let emerald = ItemSignature::new("minecraft:emerald");
///
/// assert!(matches(None, Some(&emerald)));
/// assert!(matches(Some(&diamond), Some(&diamond)));
/// assert!(!matches(Some(&diamond), Some(&emerald)));
/// assert!(!matches(Some(&diamond), None));
/// ```
pub fn matches(template: Option<&ItemSignature>, candidate: Option<&ItemSignature>) -> bool {
    match (template, candidate) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(t), Some(c)) => t == c,
    }
}

/// Removal policy: always permitted.
pub fn can_take(_template: Option<&ItemSignature>) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> ItemSignature {
        ItemSignature::new("minecraft:diamond")
    }

    #[test]
    fn wildcard_accepts_everything() {
        assert!(matches(None, None));
        assert!(matches(None, Some(&diamond())));
    }

    #[test]
    fn concrete_template_rejects_nothing() {
        assert!(!matches(Some(&diamond()), None));
    }

    #[test]
    fn equal_signatures_match() {
        assert!(matches(Some(&diamond()), Some(&diamond())));
    }

    #[test]
    fn different_type_rejected() {
        let emerald = ItemSignature::new("minecraft:emerald");
        assert!(!matches(Some(&diamond()), Some(&emerald)));
    }

    #[test]
    fn different_attributes_rejected() {
        let named = ItemSignature::with_attributes("minecraft:diamond", "{name:\"shiny\"}");
        assert!(!matches(Some(&diamond()), Some(&named)));
    }

    #[test]
    fn taking_is_never_blocked() {
        assert!(can_take(Some(&diamond())));
        assert!(can_take(None));
    }
}
