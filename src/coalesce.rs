use crate::{Allocator, block::Block, provider::MemoryProvider};

impl<P: MemoryProvider> Allocator<P> {
  /// Merges a free, listed block with its free physical neighbours.
  ///
  /// Sentinels read as allocated, so the edges of the heap need no special
  /// case. Returns the (possibly moved) start of the merged block, which is
  /// on its free list.
  pub(crate) fn coalesce(
    &mut self,
    block: Block,
  ) -> Block {
    let heap = &self.heap;
    let prev = block.prev(heap);
    let next = block.next(heap);
    let prev_free = !prev.is_allocated(heap);
    let next_free = !next.is_allocated(heap);
    let mut size = block.size(heap);

    let start = match (prev_free, next_free) {
      (false, false) => {
        if !self.free.contains(block) {
          self.free.insert(block, size);
        }
        return block;
      },
      (true, false) => {
        size += prev.size(heap);
        self.free.remove(prev);
        self.free.remove(block);
        prev
      },
      (false, true) => {
        size += next.size(heap);
        self.free.remove(block);
        self.free.remove(next);
        block
      },
      (true, true) => {
        size += prev.size(heap) + next.size(heap);
        self.free.remove(prev);
        self.free.remove(block);
        self.free.remove(next);
        prev
      },
    };

    start.set(&mut self.heap, size, false);
    self.free.insert(start, size);
    start
  }
}

#[cfg(test)]
mod tests {
  use crate::{Allocator, HeapPtr, provider::ArenaProvider};

  /// Four 16-byte blocks at the low end, then the 192-byte rest of the
  /// initial region.
  fn four_blocks() -> (Allocator<ArenaProvider>, [HeapPtr; 4]) {
    let mut allocator = Allocator::new(ArenaProvider::new());
    allocator.init().unwrap();
    let blocks = [(); 4].map(|()| allocator.alloc(8).unwrap());
    (allocator, blocks)
  }

  fn free_sizes(allocator: &Allocator<ArenaProvider>) -> Vec<(usize, usize)> {
    let mut sizes: Vec<_> = (0..crate::seglist::LIST_COUNT)
      .flat_map(|bucket| allocator.free.iter_bucket(bucket))
      .map(|(block, size)| (block.offset(), size))
      .collect();
    sizes.sort_unstable();
    sizes
  }

  #[test]
  fn test_no_merge_between_allocated_neighbours() {
    let (mut allocator, [_, b, _, _]) = four_blocks();

    allocator.free(b);

    assert_eq!(free_sizes(&allocator), vec![(32, 16), (80, 192)]);
    allocator.check().unwrap();
  }

  #[test]
  fn test_merge_with_previous() {
    let (mut allocator, [_, b, c, _]) = four_blocks();

    allocator.free(b);
    allocator.free(c);

    assert_eq!(free_sizes(&allocator), vec![(32, 32), (80, 192)]);
    allocator.check().unwrap();
  }

  #[test]
  fn test_merge_with_next() {
    let (mut allocator, [_, b, c, _]) = four_blocks();

    allocator.free(c);
    allocator.free(b);

    assert_eq!(free_sizes(&allocator), vec![(32, 32), (80, 192)]);
    allocator.check().unwrap();
  }

  #[test]
  fn test_merge_both_sides() {
    let (mut allocator, [a, b, c, _]) = four_blocks();

    allocator.free(a);
    allocator.free(c);
    allocator.free(b);

    assert_eq!(free_sizes(&allocator), vec![(16, 48), (80, 192)]);
    allocator.check().unwrap();
  }

  #[test]
  fn test_last_block_merges_into_trailing_space() {
    let (mut allocator, [_, _, _, d]) = four_blocks();

    allocator.free(d);

    assert_eq!(free_sizes(&allocator), vec![(64, 208)]);
    allocator.check().unwrap();
  }
}
