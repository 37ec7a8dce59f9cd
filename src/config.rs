/// Configuration for reading and writing ActorInfo containers
#[derive(Debug, Clone)]
pub struct Config {
    /// Yaz0 match search depth when recompressing, 0 emits literals only (default: 6)
    pub compression_level: u32,

    /// Maximum container nesting accepted by the BYML decoder (default: 64)
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compression_level: 6,
            max_depth: 64,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Yaz0 compression level, clamped to 0..=9
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Set the maximum nesting depth accepted when decoding
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
