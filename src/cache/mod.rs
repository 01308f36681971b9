//! Two-tier content cache.
//!
//! Artifacts are addressed by the 64-bit hash of their [`ContentKey`](key::ContentKey). The
//! memory tier holds heap buffers and open file mappings; the disk tier holds cache files whose
//! mappings are reopened on access.

pub mod content_cache;
pub mod entry;
pub mod key;
pub mod storage;
pub mod toc;
