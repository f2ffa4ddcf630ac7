use crate::{Allocator, align::MIN_BLOCK_SIZE, block::Block, provider::MemoryProvider};

impl<P: MemoryProvider> Allocator<P> {
  /// Turns a listed free block of at least `need` bytes into an allocated one.
  ///
  /// ```text
  ///   need <  threshold:  [ allocated | free remainder ]
  ///   need >= threshold:  [ free remainder | allocated ]
  /// ```
  ///
  /// Remainders of `MIN_BLOCK_SIZE` or less stay inside the allocation.
  pub(crate) fn place(
    &mut self,
    block: Block,
    need: usize,
  ) -> Block {
    let size = block.size(&self.heap);
    debug_assert!(size >= need, "placing {need} bytes into a {size} byte block");

    self.free.remove(block);
    let remainder = size - need;

    if remainder <= MIN_BLOCK_SIZE {
      block.set(&mut self.heap, size, true);
      return block;
    }

    if need < self.config.split_threshold {
      block.set(&mut self.heap, need, true);
      let rest = block.next(&self.heap);
      rest.set(&mut self.heap, remainder, false);
      self.free.insert(rest, remainder);
      block
    } else {
      block.set(&mut self.heap, remainder, false);
      self.free.insert(block, remainder);
      let used = block.next(&self.heap);
      used.set(&mut self.heap, need, true);
      used
    }
  }
}
