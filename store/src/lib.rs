//! Archive storage for the compile loop: the in-process cache, the
//! two-phase import scan over it, the remote store client, and the
//! batch fetch coordinator.

mod cache;
mod fetch;

pub use cache::{ArchiveCache, ImportScan};
pub use fetch::{ArchiveStore, FetchCoordinator};
