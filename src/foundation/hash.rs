use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;

/// Order-sensitive hasher producing stable 64-bit content hashes.
///
/// Values are fed as little-endian bytes so hashes are reproducible across runs and
/// platforms, which lets the disk cache be reloaded by a later process.
pub struct StableHasher {
    inner: Xxh3,
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StableHasher {
    pub fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    pub fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    /// Length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
    pub fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    pub fn finish(self) -> u64 {
        self.inner.digest()
    }
}

/// Hex form used for cache file names: 16 lowercase digits.
pub fn hash_hex(hash: u64) -> String {
    format!("{hash:016x}")
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/hash.rs"]
mod tests;
