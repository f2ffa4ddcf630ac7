use log::{debug, trace, warn};

use crate::{
  align::{OVERHEAD, adjusted_size},
  block::Block,
  config::Config,
  error::{AllocError, ProviderError, Result},
  heap::Heap,
  provider::MemoryProvider,
  seglist::SegList,
};

/// A live allocation: the offset of its payload inside the provider's region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapPtr(usize);

impl HeapPtr {
  pub const fn offset(self) -> usize {
    self.0
  }

  pub(crate) const fn block(self) -> Block {
    Block::at(self.0)
  }
}

/// Segregated-fit allocator with boundary tags and immediate coalescing.
///
/// Single-threaded: every method takes `&mut self` and leaves the heap
/// consistent before returning.
pub struct Allocator<P: MemoryProvider> {
  pub(crate) heap: Heap<P>,
  pub(crate) free: SegList,
  pub(crate) config: Config,
}

impl<P: MemoryProvider> Allocator<P> {
  pub fn new(provider: P) -> Self {
    Self::with_config(provider, Config::default())
  }

  pub fn with_config(
    provider: P,
    config: Config,
  ) -> Self {
    Self {
      heap: Heap::new(provider),
      free: SegList::new(),
      config: config.normalized(),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn provider(&self) -> &P {
    self.heap.provider()
  }

  pub fn into_provider(self) -> P {
    self.heap.into_provider()
  }

  pub fn is_initialized(&self) -> bool {
    self.heap.is_initialized()
  }

  /// Starts a fresh heap: empty free lists, new sentinels, one initial growth.
  ///
  /// # Errors
  ///
  /// - `AllocError::Provider` if the provider cannot supply the sentinels or
  ///   the initial region. The allocator is left uninitialized.
  pub fn init(&mut self) -> Result<()> {
    self.heap.forget();
    self.free.clear();

    let initial = self.config.initial_size;
    let installed = self
      .heap
      .install_sentinels()
      .and_then(|()| self.extend_heap(initial));

    if let Err(err) = installed {
      warn!("init failed: {err}");
      self.heap.forget();
      self.free.clear();
      return Err(err.into());
    }

    debug!("allocator initialized, heap is {} bytes", self.heap.size());
    Ok(())
  }

  /// Allocates at least `size` bytes and returns the payload.
  ///
  /// # Errors
  ///
  /// - `AllocError::ZeroSize` for `size == 0`; nothing is allocated.
  /// - `AllocError::OutOfMemory` when the heap cannot grow enough.
  /// - `AllocError::Uninitialized` before a successful `init`.
  pub fn alloc(
    &mut self,
    size: usize,
  ) -> Result<HeapPtr> {
    self.ensure_initialized()?;

    if size == 0 {
      trace!("alloc(0) -> no-op");
      return Err(AllocError::ZeroSize);
    }

    let need = adjusted_size(size).ok_or(AllocError::OutOfMemory { requested: size })?;

    let block = match self.free.find(need) {
      Some(block) => block,
      None => self
        .grow_for(need)
        .map_err(|_| AllocError::OutOfMemory { requested: size })?,
    };

    if block.size(&self.heap) < need {
      warn!("alloc({size}) -> out of memory, fallback growth too small");
      return Err(AllocError::OutOfMemory { requested: size });
    }

    let block = self.place(block, need);
    trace!("alloc({size}) -> {:#x}", block.offset());
    Ok(HeapPtr(block.offset()))
  }

  /// Returns a block to the heap.
  ///
  /// `ptr` must come from this allocator and must not have been freed since.
  /// Anything else corrupts the heap; debug builds assert.
  pub fn free(
    &mut self,
    ptr: HeapPtr,
  ) {
    let block = ptr.block();

    debug_assert!(self.heap.is_initialized(), "free before init");
    debug_assert!(
      block.is_allocated(&self.heap),
      "free of unallocated block {:#x}",
      block.offset()
    );

    let size = block.size(&self.heap);
    block.set(&mut self.heap, size, false);
    self.free.insert(block, size);
    let merged = self.coalesce(block);

    trace!("free({:#x}) -> free block {:#x}", ptr.offset(), merged.offset());
  }

  /// Grows an allocation to at least `size` bytes, in place when possible.
  ///
  /// `size == 0` frees `ptr` and returns `Ok(None)`. Blocks are never shrunk.
  ///
  /// # Errors
  ///
  /// - `AllocError::OutOfMemory` when no room can be found; `ptr` stays valid.
  pub fn resize(
    &mut self,
    ptr: HeapPtr,
    size: usize,
  ) -> Result<Option<HeapPtr>> {
    self.ensure_initialized()?;

    if size == 0 {
      trace!("resize({:#x}, 0) -> free", ptr.offset());
      self.free(ptr);
      return Ok(None);
    }

    let need = adjusted_size(size).ok_or(AllocError::OutOfMemory { requested: size })?;
    let block = ptr.block();
    let current = block.size(&self.heap);

    if current >= need {
      trace!("resize({:#x}, {size}) -> fits", ptr.offset());
      return Ok(Some(ptr));
    }

    if self.grow_in_place(block, current, need) {
      trace!("resize({:#x}, {size}) -> grown in place", ptr.offset());
      return Ok(Some(ptr));
    }

    let moved = self.alloc(size)?;
    let len = (current - OVERHEAD).min(self.usable_size(moved));
    self.heap.copy_within(ptr.offset(), moved.offset(), len);
    self.free(ptr);

    trace!("resize({:#x}, {size}) -> moved to {:#x}", ptr.offset(), moved.offset());
    Ok(Some(moved))
  }

  /// Payload bytes available behind `ptr`. At least what was requested.
  pub fn usable_size(
    &self,
    ptr: HeapPtr,
  ) -> usize {
    ptr.block().size(&self.heap) - OVERHEAD
  }

  pub fn payload(
    &self,
    ptr: HeapPtr,
  ) -> &[u8] {
    self.heap.slice(ptr.offset(), self.usable_size(ptr))
  }

  pub fn payload_mut(
    &mut self,
    ptr: HeapPtr,
  ) -> &mut [u8] {
    let len = self.usable_size(ptr);
    self.heap.slice_mut(ptr.offset(), len)
  }

  fn ensure_initialized(&self) -> Result<()> {
    if self.heap.is_initialized() {
      Ok(())
    } else {
      Err(AllocError::Uninitialized)
    }
  }

  /// Grows the heap by `bytes`, files the new block and merges it backwards.
  fn extend_heap(
    &mut self,
    bytes: usize,
  ) -> core::result::Result<Block, ProviderError> {
    let block = self.heap.grow(bytes)?;
    let size = block.size(&self.heap);
    self.free.insert(block, size);
    Ok(self.coalesce(block))
  }

  /// Two attempts: a full chunk (or more), then just what is needed (capped).
  fn grow_for(
    &mut self,
    need: usize,
  ) -> core::result::Result<Block, ProviderError> {
    let chunk = self.config.chunk_size;

    self.extend_heap(need.max(chunk)).or_else(|err| {
      warn!(
        "heap growth by {} bytes failed ({err}), retrying with {}",
        need.max(chunk),
        need.min(chunk)
      );
      self.extend_heap(need.min(chunk)).inspect_err(|err| {
        warn!("heap growth by {} bytes failed ({err})", need.min(chunk));
      })
    })
  }

  /// Absorbs the following free block, growing the heap first when the block
  /// sits at its end. Returns `false` when the block has to move instead.
  fn grow_in_place(
    &mut self,
    block: Block,
    current: usize,
    need: usize,
  ) -> bool {
    let next = block.next(&self.heap);
    let next_is_epilogue = self.heap.is_epilogue(next);

    if !next_is_epilogue && next.is_allocated(&self.heap) {
      return false;
    }

    let mut spare = if next_is_epilogue { 0 } else { next.size(&self.heap) };

    if current + spare < need {
      let at_end = next_is_epilogue || self.heap.is_epilogue(next.next(&self.heap));
      if !at_end {
        return false;
      }

      match self.grow_for(need - current - spare) {
        Ok(grown) => {
          debug_assert_eq!(grown, next, "growth did not land behind the block");
          spare = grown.size(&self.heap);
        },
        Err(_) => return false,
      }

      if current + spare < need {
        return false;
      }
    }

    self.free.remove(next);
    block.set(&mut self.heap, current + spare, true);
    true
  }
}
