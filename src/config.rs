use crate::{
  align,
  align::{MAX_BLOCK_SIZE, MIN_BLOCK_SIZE},
};

/// Requests below this many bytes are carved from the low end of a free block.
pub const DEFAULT_SPLIT_THRESHOLD: usize = 120;

/// Preferred heap growth when no free block fits.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 12;

/// Growth requested by `init` right after the sentinels.
pub const DEFAULT_INITIAL_SIZE: usize = 1 << 8;

/// Placement and growth tunables. They change fragmentation, never correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  pub split_threshold: usize,
  pub chunk_size: usize,
  pub initial_size: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      split_threshold: DEFAULT_SPLIT_THRESHOLD,
      chunk_size: DEFAULT_CHUNK_SIZE,
      initial_size: DEFAULT_INITIAL_SIZE,
    }
  }
}

impl Config {
  pub fn with_split_threshold(
    mut self,
    bytes: usize,
  ) -> Self {
    self.split_threshold = bytes;
    self
  }

  pub fn with_chunk_size(
    mut self,
    bytes: usize,
  ) -> Self {
    self.chunk_size = bytes;
    self
  }

  pub fn with_initial_size(
    mut self,
    bytes: usize,
  ) -> Self {
    self.initial_size = bytes;
    self
  }

  /// Rounds growth sizes to whole blocks that a tag can describe.
  pub(crate) fn normalized(self) -> Self {
    let clamp = |bytes: usize| align!(bytes.clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE));

    Self {
      split_threshold: self.split_threshold,
      chunk_size: clamp(self.chunk_size),
      initial_size: clamp(self.initial_size),
    }
  }
}
