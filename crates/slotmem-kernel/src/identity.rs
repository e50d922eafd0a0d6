//! Container identity resolution.
//!
//! [`resolve_identity`] picks the address space for an opened container:
//! positional when persistent mode is on and the host could tell where the
//! container sits, per-session otherwise.  Missing coordinates are a mode
//! fallback, never an error.
//!
//! The host supplies coordinates.  When it only knows where the player
//! stands, [`find_nearby_container`] scans a box around that point through
//! the host's [`SpatialLocator`].

use serde::{Deserialize, Serialize};
use slotmem_types::{ContainerIdentity, ContainerKind, SpatialCoordinate};

/// Resolve the identity of an opened container.  Pure.
///
/// ```
/// use slotmem_kernel::identity::resolve_identity;
/// use slotmem_types::{ContainerIdentity, ContainerKind, SpatialCoordinate};
///
/// let pos = SpatialCoordinate::new("overworld", 10, 64, -5);
///
/// let durable = resolve_identity(&ContainerKind::Chest, Some(&pos), "ChestScreen", 4, true);
/// assert_eq!(durable.key(), "chest|overworld|10|64|-5");
///
/// let fallback = resolve_identity(&ContainerKind::Chest, None, "ChestScreen", 4, true);
/// assert_eq!(fallback.key(), "session|ChestScreen|4");
/// ```
pub fn resolve_identity(
    kind: &ContainerKind,
    coordinate: Option<&SpatialCoordinate>,
    screen_type_tag: &str,
    session_id: i32,
    persistent_mode: bool,
) -> ContainerIdentity {
    match coordinate {
        Some(pos) if persistent_mode => ContainerIdentity::Positional {
            container_type: kind.as_str().to_string(),
            dimension: pos.dimension.clone(),
            x: pos.x,
            y: pos.y,
            z: pos.z,
        },
        _ => ContainerIdentity::Session {
            screen_type_tag: screen_type_tag.to_string(),
            session_id,
        },
    }
}

/// Host-side world query: is there a trackable container block at `coord`?
pub trait SpatialLocator {
    fn is_container_at(&self, coord: &SpatialCoordinate) -> bool;
}

impl<F> SpatialLocator for F
where
    F: Fn(&SpatialCoordinate) -> bool,
{
    fn is_container_at(&self, coord: &SpatialCoordinate) -> bool {
        self(coord)
    }
}

/// Half-extents of the box scanned by [`find_nearby_container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRadius {
    /// Applied to both x and z.
    pub horizontal: i32,
    pub vertical: i32,
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self {
            horizontal: 3,
            vertical: 2,
        }
    }
}

/// First container found around `origin`, scanning x, then y, then z from the
/// negative corner of the box.
pub fn find_nearby_container<L>(
    locator: &L,
    origin: &SpatialCoordinate,
    radius: SearchRadius,
) -> Option<SpatialCoordinate>
where
    L: SpatialLocator + ?Sized,
{
    let h = radius.horizontal.max(0);
    let v = radius.vertical.max(0);
    for dx in -h..=h {
        for dy in -v..=v {
            for dz in -h..=h {
                let candidate = origin.offset(dx, dy, dz);
                if locator.is_container_at(&candidate) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> SpatialCoordinate {
        SpatialCoordinate::new("overworld", 0, 64, 0)
    }

    #[test]
    fn persistent_with_coordinate_is_positional() {
        let id = resolve_identity(
            &ContainerKind::Barrel,
            Some(&SpatialCoordinate::new("the_nether", 1, 2, 3)),
            "GenericContainerScreen",
            9,
            true,
        );
        assert_eq!(
            id,
            ContainerIdentity::Positional {
                container_type: "barrel".into(),
                dimension: "the_nether".into(),
                x: 1,
                y: 2,
                z: 3,
            }
        );
    }

    #[test]
    fn session_mode_ignores_coordinate() {
        let id = resolve_identity(&ContainerKind::Chest, Some(&origin()), "Screen", 2, false);
        assert_eq!(
            id,
            ContainerIdentity::Session {
                screen_type_tag: "Screen".into(),
                session_id: 2,
            }
        );
    }

    #[test]
    fn missing_coordinate_falls_back_to_session() {
        let id = resolve_identity(&ContainerKind::Hopper, None, "HopperScreen", 11, true);
        assert!(!id.is_positional());
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = resolve_identity(&ContainerKind::Chest, Some(&origin()), "S", 1, true);
        let b = resolve_identity(&ContainerKind::Chest, Some(&origin()), "S", 99, true);
        assert_eq!(a.key(), b.key(), "session id must not leak into positional keys");
    }

    #[test]
    fn nearby_search_finds_container_in_box() {
        let target = SpatialCoordinate::new("overworld", 2, 63, -1);
        let t = target.clone();
        let locator = move |c: &SpatialCoordinate| *c == t;
        assert_eq!(
            find_nearby_container(&locator, &origin(), SearchRadius::default()),
            Some(target)
        );
    }

    #[test]
    fn nearby_search_respects_vertical_radius() {
        let locator = |c: &SpatialCoordinate| c.y == 67;
        assert_eq!(
            find_nearby_container(&locator, &origin(), SearchRadius::default()),
            None
        );
    }

    #[test]
    fn nearby_search_returns_first_in_scan_order() {
        let locator = |c: &SpatialCoordinate| c.x >= 0;
        let found = find_nearby_container(&locator, &origin(), SearchRadius::default()).unwrap();
        assert_eq!((found.x, found.y, found.z), (0, 62, -3));
    }

    #[test]
    fn nearby_search_stays_in_origin_dimension() {
        let locator = |c: &SpatialCoordinate| c.dimension == "the_end";
        assert!(find_nearby_container(&locator, &origin(), SearchRadius::default()).is_none());
    }
}
