//! Memorize-mode click handling helpers.

use std::time::{Duration, Instant};

use slotmem_types::ItemSignature;

/// Mouse button of a memorize-mode slot click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickButton {
    /// Button 0: remember the source item.
    Set,
    /// Button 1: forget the slot's template.
    Clear,
    /// Anything else is ignored.
    Other(u8),
}

impl From<u8> for ClickButton {
    fn from(button: u8) -> Self {
        match button {
            0 => ClickButton::Set,
            1 => ClickButton::Clear,
            other => ClickButton::Other(other),
        }
    }
}

/// Pick the item a memorize click should remember: the slot's own content,
/// else the cursor stack, else the main-hand stack.
pub fn pick_template_source(
    slot: Option<&ItemSignature>,
    cursor: Option<&ItemSignature>,
    main_hand: Option<&ItemSignature>,
) -> Option<ItemSignature> {
    slot.or(cursor).or(main_hand).cloned()
}

/// Drops clicks that arrive within `window` of the last accepted one.
#[derive(Debug, Clone)]
pub struct ClickDebounce {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl ClickDebounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// `true` when the click at `now` should be processed.
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted
            && now.saturating_duration_since(last) < self.window
        {
            return false;
        }
        self.last_accepted = Some(now);
        true
    }
}
