//! `slotmem-memory` – The Template Store.
//!
//! Remembers which item kind belongs in each slot of each container and keeps
//! that memory on disk.
//!
//! # Modules
//!
//! - [`record`] – [`ContainerRecord`][record::ContainerRecord]: the slot
//!   templates, memorize flag and modification time of one container.
//! - [`matching`] – [`matches`][matching::matches]: the wildcard/equality
//!   policy deciding whether an item may be inserted under a template.
//! - [`store`] – [`TemplateStore`][store::TemplateStore]: identity-keyed
//!   records with resize, capture, clear, toggle and release semantics.
//! - [`persistence`] – the JSON document format, atomic writes, corrupt-file
//!   quarantine and the [`TemplatePersistence`][persistence::TemplatePersistence]
//!   backends.
//! - [`write_behind`] – [`WriteBehind`][write_behind::WriteBehind]: debounce
//!   state that batches saves and guarantees a flush on shutdown.
//! - [`migration`] – [`migrate`][migration::migrate]: copies a record between
//!   identities when a container changes address space.

pub mod matching;
pub mod migration;
pub mod persistence;
pub mod record;
pub mod store;
pub mod write_behind;

pub use matching::matches;
pub use migration::migrate;
pub use persistence::{JsonFilePersistence, MemoryPersistence, PersistenceError, TemplatePersistence, WorldKey};
pub use record::ContainerRecord;
pub use store::{StoreStats, TemplateStore};
pub use write_behind::WriteBehind;
