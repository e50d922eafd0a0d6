use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of an item kind: registry type id plus its structural attributes.
///
/// Stack size is deliberately absent; two stacks of 1 and 64 diamonds share
/// the same signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ItemSignature {
    /// Namespaced registry id, e.g. `"minecraft:diamond"`.
    pub type_id: String,
    /// Opaque canonical encoding of the item's components (enchantments,
    /// custom names, ...).  Empty when the item carries none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub attributes: String,
}

impl ItemSignature {
    /// A signature with no structural attributes.
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            attributes: String::new(),
        }
    }

    pub fn with_attributes(type_id: impl Into<String>, attributes: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            attributes: attributes.into(),
        }
    }
}

impl fmt::Display for ItemSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attributes.is_empty() {
            write!(f, "{}", self.type_id)
        } else {
            write!(f, "{}{}", self.type_id, self.attributes)
        }
    }
}

/// Parses the [`Display`][fmt::Display] form: a type id optionally followed by
/// a `{...}` attribute block.
impl FromStr for ItemSignature {
    type Err = SlotMemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_id, attributes) = match s.find('{') {
            Some(at) => s.split_at(at),
            None => (s, ""),
        };
        if !is_valid_type_id(type_id) {
            return Err(SlotMemError::InvalidItemId(s.to_string()));
        }
        Ok(Self::with_attributes(type_id, attributes))
    }
}

/// Returns `true` when `id` is a well-formed `namespace:path` (or bare `path`)
/// registry identifier.
///
/// Namespaces allow `[a-z0-9_.-]`, paths additionally allow `/`.
pub fn is_valid_type_id(id: &str) -> bool {
    let (namespace, path) = match id.split_once(':') {
        Some((ns, p)) => (ns, p),
        None => ("minecraft", id),
    };
    let ns_ok = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.-".contains(c));
    let path_ok = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.-/".contains(c));
    ns_ok && path_ok
}

/// The remembered constraint for one slot.  `None` is the wildcard.
pub type TemplateSlot = Option<ItemSignature>;

/// A block position inside a named dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialCoordinate {
    /// Dimension id, e.g. `"minecraft:overworld"`.
    pub dimension: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SpatialCoordinate {
    pub fn new(dimension: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            dimension: dimension.into(),
            x,
            y,
            z,
        }
    }

    /// The coordinate displaced by `(dx, dy, dz)` in the same dimension.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            dimension: self.dimension.clone(),
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }
}

/// Kind of trackable container, declared by the host when it registers an
/// opened screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Chest,
    ShulkerBox,
    Barrel,
    Hopper,
    Dispenser,
    Dropper,
    Furnace,
    /// Any other trackable container; the string is used verbatim as its type.
    Other(String),
}

impl ContainerKind {
    pub fn as_str(&self) -> &str {
        match self {
            ContainerKind::Chest => "chest",
            ContainerKind::ShulkerBox => "shulker_box",
            ContainerKind::Barrel => "barrel",
            ContainerKind::Hopper => "hopper",
            ContainerKind::Dispenser => "dispenser",
            ContainerKind::Dropper => "dropper",
            ContainerKind::Furnace => "furnace",
            ContainerKind::Other(name) => name,
        }
    }
}

impl FromStr for ContainerKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "chest" => ContainerKind::Chest,
            "shulker_box" => ContainerKind::ShulkerBox,
            "barrel" => ContainerKind::Barrel,
            "hopper" => ContainerKind::Hopper,
            "dispenser" => ContainerKind::Dispenser,
            "dropper" => ContainerKind::Dropper,
            "furnace" => ContainerKind::Furnace,
            other => ContainerKind::Other(other.to_string()),
        })
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether store mutations reach disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    /// Containers are addressed by position and survive restarts.
    #[default]
    Persistent,
    /// Containers are addressed per open/close cycle; nothing is written.
    Session,
}

impl PersistenceMode {
    pub fn is_persistent(self) -> bool {
        matches!(self, PersistenceMode::Persistent)
    }
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceMode::Persistent => write!(f, "persistent"),
            PersistenceMode::Session => write!(f, "session"),
        }
    }
}

impl FromStr for PersistenceMode {
    type Err = SlotMemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persistent" => Ok(PersistenceMode::Persistent),
            "session" | "session-only" => Ok(PersistenceMode::Session),
            other => Err(SlotMemError::InvalidMode(other.to_string())),
        }
    }
}

/// Key under which a container's record is stored.
///
/// Both variants render through [`ContainerIdentity::key`] into a single
/// string.  Fields are `|`-separated with `\` escaping, and the two variants
/// have a different field count, so distinct identities never share a key.
///
/// ```
/// use slotmem_types::ContainerIdentity;
///
/// let id = ContainerIdentity::Positional {
///     container_type: "chest".into(),
///     dimension: "overworld".into(),
///     x: 10,
///     y: 64,
///     z: -5,
/// };
/// assert_eq!(id.key(), "chest|overworld|10|64|-5");
/// assert_eq!(id.key().parse::<ContainerIdentity>().unwrap(), id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerIdentity {
    /// Durable identity derived from where the container sits in the world.
    Positional {
        container_type: String,
        dimension: String,
        x: i32,
        y: i32,
        z: i32,
    },
    /// Ephemeral identity valid for one open/close cycle of a screen.
    Session { screen_type_tag: String, session_id: i32 },
}

const SESSION_PREFIX: &str = "session";
const SEPARATOR: char = '|';
const ESCAPE: char = '\\';

impl ContainerIdentity {
    pub fn is_positional(&self) -> bool {
        matches!(self, ContainerIdentity::Positional { .. })
    }

    /// Render the identity as its storage key.
    pub fn key(&self) -> String {
        match self {
            ContainerIdentity::Positional {
                container_type,
                dimension,
                x,
                y,
                z,
            } => format!(
                "{}|{}|{}|{}|{}",
                escape_field(container_type),
                escape_field(dimension),
                x,
                y,
                z
            ),
            ContainerIdentity::Session {
                screen_type_tag,
                session_id,
            } => format!(
                "{}|{}|{}",
                SESSION_PREFIX,
                escape_field(screen_type_tag),
                session_id
            ),
        }
    }
}

impl fmt::Display for ContainerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for ContainerIdentity {
    type Err = SlotMemError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let invalid = || SlotMemError::InvalidIdentityKey(key.to_string());
        let fields = split_fields(key).ok_or_else(invalid)?;
        let int = |s: &str| s.parse::<i32>().map_err(|_| invalid());
        match fields.as_slice() {
            [prefix, tag, session_id] if prefix == SESSION_PREFIX => {
                Ok(ContainerIdentity::Session {
                    screen_type_tag: tag.clone(),
                    session_id: int(session_id)?,
                })
            }
            [container_type, dimension, x, y, z] => Ok(ContainerIdentity::Positional {
                container_type: container_type.clone(),
                dimension: dimension.clone(),
                x: int(x)?,
                y: int(y)?,
                z: int(z)?,
            }),
            _ => Err(invalid()),
        }
    }
}

fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Split an escaped key into its unescaped fields.  `None` on a dangling
/// escape.
fn split_fields(key: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => current.push(chars.next()?),
            SEPARATOR => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    Some(fields)
}

/// Errors surfaced by slot-memory value parsing.
///
/// Store mutations and queries never return these; they are reserved for
/// decoding user or configuration input.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum SlotMemError {
    #[error("Invalid container identity key: {0}")]
    InvalidIdentityKey(String),

    #[error("Invalid persistence mode: {0} (expected \"persistent\" or \"session\")")]
    InvalidMode(String),

    #[error("Invalid item id: {0}")]
    InvalidItemId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chest_at(x: i32, y: i32, z: i32) -> ContainerIdentity {
        ContainerIdentity::Positional {
            container_type: "chest".into(),
            dimension: "overworld".into(),
            x,
            y,
            z,
        }
    }

    #[test]
    fn positional_key_matches_documented_layout() {
        assert_eq!(chest_at(10, 64, -5).key(), "chest|overworld|10|64|-5");
    }

    #[test]
    fn session_key_is_prefixed() {
        let id = ContainerIdentity::Session {
            screen_type_tag: "GenericContainerScreen".into(),
            session_id: 7,
        };
        assert_eq!(id.key(), "session|GenericContainerScreen|7");
    }

    #[test]
    fn separator_inside_field_does_not_collide() {
        let a = ContainerIdentity::Positional {
            container_type: "a|b".into(),
            dimension: "c".into(),
            x: 0,
            y: 0,
            z: 0,
        };
        let b = ContainerIdentity::Positional {
            container_type: "a".into(),
            dimension: "b|c".into(),
            x: 0,
            y: 0,
            z: 0,
        };
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key().parse::<ContainerIdentity>().unwrap(), a);
        assert_eq!(b.key().parse::<ContainerIdentity>().unwrap(), b);
    }

    #[test]
    fn positional_type_named_session_stays_positional() {
        let id = ContainerIdentity::Positional {
            container_type: "session".into(),
            dimension: "x".into(),
            x: 1,
            y: 2,
            z: 3,
        };
        let back: ContainerIdentity = id.key().parse().unwrap();
        assert!(back.is_positional());
    }

    #[test]
    fn session_key_roundtrips_through_parse() {
        let id = ContainerIdentity::Session {
            screen_type_tag: "weird\\tag|x".into(),
            session_id: -3,
        };
        assert_eq!(id.key().parse::<ContainerIdentity>().unwrap(), id);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!("chest|overworld|10|64".parse::<ContainerIdentity>().is_err());
        assert!("chest|overworld|a|64|1".parse::<ContainerIdentity>().is_err());
        assert!("dangling\\".parse::<ContainerIdentity>().is_err());
    }

    #[test]
    fn signature_equality_ignores_nothing_but_count() {
        let plain = ItemSignature::new("minecraft:diamond_sword");
        let enchanted = ItemSignature::with_attributes("minecraft:diamond_sword", "{sharpness:5}");
        assert_ne!(plain, enchanted);
        assert_eq!(plain, ItemSignature::new("minecraft:diamond_sword"));
    }

    #[test]
    fn signature_parses_display_form() {
        let sword = ItemSignature::with_attributes("minecraft:diamond_sword", "{sharpness:5}");
        assert_eq!(sword.to_string().parse::<ItemSignature>().unwrap(), sword);
        assert_eq!(
            "minecraft:stone".parse::<ItemSignature>().unwrap(),
            ItemSignature::new("minecraft:stone")
        );
        assert!(matches!(
            "Not An Item".parse::<ItemSignature>(),
            Err(SlotMemError::InvalidItemId(_))
        ));
    }

    #[test]
    fn type_id_validation() {
        assert!(is_valid_type_id("minecraft:diamond"));
        assert!(is_valid_type_id("diamond"));
        assert!(is_valid_type_id("mod:blocks/thing_1"));
        assert!(!is_valid_type_id(""));
        assert!(!is_valid_type_id("minecraft:"));
        assert!(!is_valid_type_id("Minecraft:Diamond"));
        assert!(!is_valid_type_id("a:b:c"));
    }

    #[test]
    fn container_kind_string_roundtrip() {
        for kind in [
            ContainerKind::Chest,
            ContainerKind::ShulkerBox,
            ContainerKind::Barrel,
            ContainerKind::Hopper,
            ContainerKind::Dispenser,
            ContainerKind::Dropper,
            ContainerKind::Furnace,
            ContainerKind::Other("crate".into()),
        ] {
            let parsed: ContainerKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn persistence_mode_parses_case_insensitively() {
        assert_eq!("Persistent".parse::<PersistenceMode>().unwrap(), PersistenceMode::Persistent);
        assert_eq!("session".parse::<PersistenceMode>().unwrap(), PersistenceMode::Session);
        assert!(matches!(
            "disk".parse::<PersistenceMode>(),
            Err(SlotMemError::InvalidMode(_))
        ));
    }

    #[test]
    fn persistence_mode_serializes_lowercase() {
        let json = serde_json::to_string(&PersistenceMode::Session).unwrap();
        assert_eq!(json, "\"session\"");
    }

    #[test]
    fn coordinate_offset_keeps_dimension() {
        let c = SpatialCoordinate::new("nether", 1, 2, 3).offset(-1, 0, 4);
        assert_eq!(c, SpatialCoordinate::new("nether", 0, 2, 7));
    }

    #[test]
    fn error_display() {
        let err = SlotMemError::InvalidIdentityKey("x".into());
        assert!(err.to_string().contains("Invalid container identity key"));
    }
}
