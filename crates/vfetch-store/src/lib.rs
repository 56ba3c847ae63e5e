//! Job persistence for vfetch.
//!
//! The persisted form is a single snapshot of the whole job mapping. Backends
//! implement [`SnapshotStore`]; the rest of the system goes through a
//! [`StoreHandle`], which serializes every read-modify-write on one task.

pub mod error;
pub mod handle;
pub mod snapshot;

pub use error::{StoreError, StoreResult};
pub use handle::{JobMutation, StoreCommand, StoreHandle};
pub use snapshot::{decode_snapshot, encode_snapshot, JsonFileStore, MemoryStore, SnapshotStore};
