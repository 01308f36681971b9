use std::path::{Path, PathBuf};

use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::hash::hash_hex;

pub const TOC_FILE: &str = "toc.json";
pub const TOC_VERSION: u32 = 1;
pub const SHARD_COUNT: usize = 256;

/// One persisted entry of a disk tier.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TocRecord<K, P> {
    pub hash: u64,
    pub key: K,
    pub params: P,
}

/// Table of contents written by `ContentCache::save` and read back by `restore`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TableOfContents<K, P> {
    pub version: u32,
    pub records: Vec<TocRecord<K, P>>,
}

impl<K, P> Default for TableOfContents<K, P> {
    fn default() -> Self {
        Self {
            version: TOC_VERSION,
            records: Vec::new(),
        }
    }
}

/// Directory layout of a disk tier: `<root>/toc.json` plus 256 shard directories `00`..`ff`.
/// The entry with hash `h` lives at `<root>/<hh>/<rest>.<ext>`, `hh` being the first two of
/// the 16 hex digits of `h`.
#[derive(Clone, Debug)]
pub struct DiskLayout {
    root: PathBuf,
}

impl DiskLayout {
    /// Open `root`, resetting it when the TOC or any shard directory is missing.
    pub fn open(root: impl Into<PathBuf>) -> StrataResult<Self> {
        let layout = Self { root: root.into() };
        std::fs::create_dir_all(&layout.root).map_err(|e| StrataError::io(&layout.root, e))?;
        if !layout.is_intact() {
            tracing::warn!(root = %layout.root.display(), "disk cache structure incomplete, resetting");
            layout.reset()?;
        }
        Ok(layout)
    }

    /// Layout rooted at `root` without touching the filesystem, for inspection.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn toc_path(&self) -> PathBuf {
        self.root.join(TOC_FILE)
    }

    pub fn path_for(&self, hash: u64, ext: &str) -> PathBuf {
        let hex = hash_hex(hash);
        let (shard, rest) = hex.split_at(2);
        self.root.join(shard).join(format!("{rest}.{ext}"))
    }

    pub fn shard_count(&self) -> usize {
        (0..SHARD_COUNT)
            .filter(|i| self.root.join(format!("{i:02x}")).is_dir())
            .count()
    }

    /// TOC present with a readable header and every shard directory in place.
    pub fn is_intact(&self) -> bool {
        let Ok(text) = std::fs::read_to_string(self.toc_path()) else {
            return false;
        };
        let header: Result<TableOfContents<serde_json::Value, serde_json::Value>, _> =
            serde_json::from_str(&text);
        matches!(header, Ok(ref toc) if toc.version == TOC_VERSION)
            && self.shard_count() == SHARD_COUNT
    }

    /// Remove every shard directory and the TOC, then recreate an empty layout.
    ///
    /// Only names this layout owns are touched, so a root shared with other files survives.
    pub fn reset(&self) -> StrataResult<()> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| StrataError::io(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StrataError::io(&self.root, e))?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if path.is_dir() && is_shard_name(&name) {
                std::fs::remove_dir_all(&path).map_err(|e| StrataError::io(&path, e))?;
            } else if name == TOC_FILE || name.starts_with("toc.json.") {
                std::fs::remove_file(&path).map_err(|e| StrataError::io(&path, e))?;
            }
        }
        for i in 0..SHARD_COUNT {
            let dir = self.root.join(format!("{i:02x}"));
            std::fs::create_dir_all(&dir).map_err(|e| StrataError::io(&dir, e))?;
        }
        self.write_toc(&TableOfContents::<(), ()>::default())
    }

    pub fn read_toc<K, P>(&self) -> StrataResult<TableOfContents<K, P>>
    where
        K: serde::de::DeserializeOwned,
        P: serde::de::DeserializeOwned,
    {
        let path = self.toc_path();
        let text = std::fs::read_to_string(&path).map_err(|e| StrataError::io(&path, e))?;
        let toc: TableOfContents<K, P> =
            serde_json::from_str(&text).map_err(|e| StrataError::serde(e.to_string()))?;
        if toc.version != TOC_VERSION {
            return Err(StrataError::serde(format!(
                "unsupported cache TOC version {} (expected {TOC_VERSION})",
                toc.version
            )));
        }
        Ok(toc)
    }

    /// Write the TOC through a temporary file so a crash never leaves a torn TOC behind.
    pub fn write_toc<K, P>(&self, toc: &TableOfContents<K, P>) -> StrataResult<()>
    where
        K: serde::Serialize,
        P: serde::Serialize,
    {
        let path = self.toc_path();
        let tmp = self.root.join(format!("{TOC_FILE}.tmp"));
        let json = serde_json::to_vec_pretty(toc).map_err(|e| StrataError::serde(e.to_string()))?;
        std::fs::write(&tmp, json).map_err(|e| StrataError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StrataError::io(&path, e))?;
        Ok(())
    }

    /// Number of cache files and their total size, across all shards.
    pub fn usage(&self) -> StrataResult<(usize, u64)> {
        let mut files = 0usize;
        let mut bytes = 0u64;
        for i in 0..SHARD_COUNT {
            let dir = self.root.join(format!("{i:02x}"));
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if let Ok(meta) = entry.metadata()
                    && meta.is_file()
                {
                    files += 1;
                    bytes = bytes.saturating_add(meta.len());
                }
            }
        }
        Ok((files, bytes))
    }
}

fn is_shard_name(name: &str) -> bool {
    name.len() == 2 && name.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
#[path = "../../tests/unit/cache/toc.rs"]
mod tests;
