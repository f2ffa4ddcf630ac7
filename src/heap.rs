use log::debug;

use crate::{
  align,
  align::{ALIGNMENT, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, WSIZE},
  block::{Block, pack},
  error::ProviderError,
  provider::MemoryProvider,
};

/// Bytes claimed by `install_sentinels`: pad word, prologue header and footer,
/// epilogue header.
pub const SENTINEL_BYTES: usize = 4 * WSIZE;

/// Largest heap, sentinels included. Merged blocks can never outgrow a tag.
pub const MAX_HEAP_SIZE: usize = MAX_BLOCK_SIZE;

/// The managed region and its sentinels.
///
/// ```text
///   base
///   ┌─────┬──────┬──────┬─────────────────────────────┬──────┐
///   │ pad │ 8|1  │ 8|1  │  blocks ...                 │ 0|1  │
///   └─────┴──────┴──────┴─────────────────────────────┴──────┘
///          prologue                                   epilogue
/// ```
pub struct Heap<P> {
  provider: P,
  base: Option<usize>,
  limit: usize,
}

impl<P: MemoryProvider> Heap<P> {
  pub fn new(provider: P) -> Self {
    Self {
      provider,
      base: None,
      limit: MAX_HEAP_SIZE,
    }
  }

  #[cfg(test)]
  pub fn with_limit(
    provider: P,
    limit: usize,
  ) -> Self {
    Self {
      limit,
      ..Self::new(provider)
    }
  }

  pub fn provider(&self) -> &P {
    &self.provider
  }

  #[cfg(test)]
  pub fn provider_mut(&mut self) -> &mut P {
    &mut self.provider
  }

  pub fn into_provider(self) -> P {
    self.provider
  }

  pub fn get(
    &self,
    addr: usize,
  ) -> u32 {
    let mut word = [0u8; WSIZE];
    word.copy_from_slice(&self.provider.bytes()[addr..addr + WSIZE]);
    u32::from_ne_bytes(word)
  }

  pub fn put(
    &mut self,
    addr: usize,
    value: u32,
  ) {
    self.provider.bytes_mut()[addr..addr + WSIZE].copy_from_slice(&value.to_ne_bytes());
  }

  /// Claims sentinel space at the current end of the region.
  ///
  /// Whatever the region held before is abandoned.
  pub fn install_sentinels(&mut self) -> Result<(), ProviderError> {
    let len = self.provider.len();
    let pad = align!(len) - len;

    if pad > 0 {
      self.provider.extend(pad)?;
    }

    let base = self.provider.extend(SENTINEL_BYTES)?;

    self.put(base, 0);
    self.put(base + WSIZE, pack(ALIGNMENT, true));
    self.put(base + 2 * WSIZE, pack(ALIGNMENT, true));
    self.put(base + 3 * WSIZE, pack(0, true));
    self.base = Some(base);

    debug!("heap sentinels installed at {base:#x}");
    Ok(())
  }

  /// Appends `align(bytes)` bytes as one free block and moves the epilogue
  /// behind it. The block is not yet on any free list.
  ///
  /// Refused with `ProviderError::Exhausted` once the heap would pass its
  /// size limit.
  pub fn grow(
    &mut self,
    bytes: usize,
  ) -> Result<Block, ProviderError> {
    let size = align!(bytes.min(MAX_HEAP_SIZE)).max(MIN_BLOCK_SIZE);
    let available = self.limit.saturating_sub(self.size());

    if size > available {
      return Err(ProviderError::Exhausted {
        requested: size,
        available,
      });
    }

    let old = self.provider.extend(size)?;

    let block = Block::at(old);
    block.set(self, size, false);
    let epilogue = block.next(self);
    self.put(epilogue.header(), pack(0, true));

    debug!("heap grown by {size} bytes at {old:#x}, end now {:#x}", self.end());
    Ok(block)
  }

  pub fn is_initialized(&self) -> bool {
    self.base.is_some()
  }

  /// Drops the sentinels; the bytes stay claimed.
  pub fn forget(&mut self) {
    self.base = None;
  }

  #[cfg(test)]
  pub fn base(&self) -> Option<usize> {
    self.base
  }

  pub fn prologue(&self) -> Option<Block> {
    self.base.map(|base| Block::at(base + 2 * WSIZE))
  }

  /// First block after the prologue (the epilogue when the heap is empty).
  pub fn first_block(&self) -> Option<Block> {
    self.base.map(|base| Block::at(base + SENTINEL_BYTES))
  }

  /// One past the last byte; the epilogue header occupies the final word.
  pub fn end(&self) -> usize {
    self.provider.len()
  }

  /// Bytes managed since the sentinels were installed.
  pub fn size(&self) -> usize {
    self.base.map_or(0, |base| self.end() - base)
  }

  pub fn is_epilogue(
    &self,
    block: Block,
  ) -> bool {
    block.offset() == self.end() && block.size(self) == 0
  }

  pub fn slice(
    &self,
    offset: usize,
    len: usize,
  ) -> &[u8] {
    &self.provider.bytes()[offset..offset + len]
  }

  pub fn slice_mut(
    &mut self,
    offset: usize,
    len: usize,
  ) -> &mut [u8] {
    &mut self.provider.bytes_mut()[offset..offset + len]
  }

  pub fn copy_within(
    &mut self,
    src: usize,
    dst: usize,
    len: usize,
  ) {
    self.provider.bytes_mut().copy_within(src..src + len, dst);
  }
}
