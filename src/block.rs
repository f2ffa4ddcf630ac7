use crate::{
  align::{ALIGNMENT, WSIZE},
  heap::Heap,
  provider::MemoryProvider,
};

const ALLOCATED: u32 = 0x1;
const FLAGS: u32 = (ALIGNMENT as u32) - 1;

/// Packs a block size and its allocation bit into one tag word.
pub const fn pack(
  size: usize,
  allocated: bool,
) -> u32 {
  (size as u32) | (allocated as u32)
}

pub const fn tag_size(tag: u32) -> usize {
  (tag & !FLAGS) as usize
}

pub const fn tag_allocated(tag: u32) -> bool {
  tag & ALLOCATED != 0
}

/// A view over one block, identified by the offset of its payload.
///
/// ```text
///   header        payload (or free-list links)            footer
///   ┌──────┬──────────────────────────────────────────┬──────┐
///   │ size │                                          │ size │
///   │  |a  │                                          │  |a  │
///   └──────┴──────────────────────────────────────────┴──────┘
///   p - 4  p                                          p + size - 8
/// ```
///
/// Every accessor reads the tags currently stored in the heap, so a view is
/// only meaningful while its header is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(usize);

impl Block {
  pub const fn at(payload: usize) -> Self {
    Self(payload)
  }

  pub const fn offset(self) -> usize {
    self.0
  }

  pub const fn header(self) -> usize {
    self.0 - WSIZE
  }

  pub fn size<P: MemoryProvider>(
    self,
    heap: &Heap<P>,
  ) -> usize {
    tag_size(heap.get(self.header()))
  }

  pub fn is_allocated<P: MemoryProvider>(
    self,
    heap: &Heap<P>,
  ) -> bool {
    tag_allocated(heap.get(self.header()))
  }

  /// Derived from the header, so the header must be written first.
  pub fn footer<P: MemoryProvider>(
    self,
    heap: &Heap<P>,
  ) -> usize {
    self.0 + self.size(heap) - ALIGNMENT
  }

  pub fn next<P: MemoryProvider>(
    self,
    heap: &Heap<P>,
  ) -> Block {
    Block(self.0 + self.size(heap))
  }

  /// Reads the previous block's footer, which must be valid.
  pub fn prev<P: MemoryProvider>(
    self,
    heap: &Heap<P>,
  ) -> Block {
    Block(self.0 - tag_size(heap.get(self.0 - ALIGNMENT)))
  }

  /// Rewrites both tags: header first, then the footer it locates.
  pub fn set<P: MemoryProvider>(
    self,
    heap: &mut Heap<P>,
    size: usize,
    allocated: bool,
  ) {
    debug_assert!(size % ALIGNMENT == 0, "unaligned block size {size}");
    debug_assert!(size <= u32::MAX as usize, "block size {size} overflows a tag");

    let tag = pack(size, allocated);
    heap.put(self.header(), tag);
    let footer = self.footer(heap);
    heap.put(footer, tag);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::ArenaProvider;

  fn scratch_heap() -> Heap<ArenaProvider> {
    let mut heap = Heap::new(ArenaProvider::with_capacity(256));
    heap.provider_mut().extend(128).unwrap();
    heap
  }

  #[test]
  fn test_pack_roundtrip() {
    let tag = pack(48, true);

    assert_eq!(tag, 49);
    assert_eq!(tag_size(tag), 48);
    assert!(tag_allocated(tag));
    assert!(!tag_allocated(pack(48, false)));
  }

  #[test]
  fn test_set_writes_header_and_footer() {
    let mut heap = scratch_heap();
    let block = Block::at(16);

    block.set(&mut heap, 32, false);

    assert_eq!(heap.get(12), pack(32, false));
    assert_eq!(block.footer(&heap), 40);
    assert_eq!(heap.get(40), pack(32, false));
    assert_eq!(block.size(&heap), 32);
    assert!(!block.is_allocated(&heap));
  }

  #[test]
  fn test_physical_neighbours() {
    let mut heap = scratch_heap();
    let first = Block::at(16);

    first.set(&mut heap, 24, true);
    let second = first.next(&heap);
    second.set(&mut heap, 40, false);

    assert_eq!(second, Block::at(40));
    assert_eq!(second.prev(&heap), first);
    assert_eq!(second.next(&heap), Block::at(80));
    assert!(first.is_allocated(&heap));
    assert!(!second.is_allocated(&heap));
  }
}
