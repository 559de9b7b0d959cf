/// Running CRC32 (reflected, polynomial 0xEDB88320).
///
/// Feed byte ranges with [`update`](Crc32::update); the returned value is the
/// checksum of everything fed so far. Chunking does not change the result.
#[derive(Debug, Clone, Default)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

impl Crc32 {
    /// Start a new checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed `bytes` and return the checksum accumulated so far.
    pub fn update(&mut self, bytes: &[u8]) -> u32 {
        self.hasher.update(bytes);
        self.value()
    }

    /// Checksum of everything fed so far.
    pub fn value(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Discard accumulated state so the instance can start a new checksum.
    pub fn reset(&mut self) {
        self.hasher.reset();
    }
}

/// One-shot CRC32 of `bytes`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}
