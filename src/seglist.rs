use std::collections::HashMap;

use crate::block::Block;

/// Number of size classes. The last one holds every larger size.
pub const LIST_COUNT: usize = 16;

/// Size class for `size`: halve it until it reaches 1 or the last bucket.
pub fn bucket_for(mut size: usize) -> usize {
  let mut bucket = 0;

  while bucket < LIST_COUNT - 1 && size > 1 {
    size >>= 1;
    bucket += 1;
  }

  bucket
}

#[derive(Debug, Clone, Copy)]
struct Link {
  prev: Option<Block>,
  next: Option<Block>,
  size: usize,
}

/// Buckets of free blocks, each a doubly linked list in ascending size order.
///
/// Links are kept beside the heap, keyed by block offset, and are only
/// present while the block is free.
#[derive(Debug, Default)]
pub struct SegList {
  heads: [Option<Block>; LIST_COUNT],
  links: HashMap<Block, Link>,
}

impl SegList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear(&mut self) {
    self.heads = [None; LIST_COUNT];
    self.links.clear();
  }

  pub fn len(&self) -> usize {
    self.links.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.links.is_empty()
  }

  pub fn contains(
    &self,
    block: Block,
  ) -> bool {
    self.links.contains_key(&block)
  }

  /// Size recorded when `block` was inserted.
  pub fn size_of(
    &self,
    block: Block,
  ) -> Option<usize> {
    self.links.get(&block).map(|link| link.size)
  }

  pub fn insert(
    &mut self,
    block: Block,
    size: usize,
  ) {
    debug_assert!(!self.contains(block), "block {:#x} inserted twice", block.offset());

    let bucket = bucket_for(size);
    let mut before = None;
    let mut cursor = self.heads[bucket];

    while let Some(current) = cursor {
      let link = self.links[&current];
      if link.size >= size {
        break;
      }
      before = cursor;
      cursor = link.next;
    }

    self.links.insert(
      block,
      Link {
        prev: before,
        next: cursor,
        size,
      },
    );

    match before {
      Some(prev) => self.link_mut(prev).next = Some(block),
      None => self.heads[bucket] = Some(block),
    }

    if let Some(next) = cursor {
      self.link_mut(next).prev = Some(block);
    }
  }

  /// Unlinks `block`, returning the size it was filed under. `None` if absent.
  pub fn remove(
    &mut self,
    block: Block,
  ) -> Option<usize> {
    let link = self.links.remove(&block)?;

    match link.prev {
      Some(prev) => self.link_mut(prev).next = link.next,
      None => self.heads[bucket_for(link.size)] = link.next,
    }

    if let Some(next) = link.next {
      self.link_mut(next).prev = link.prev;
    }

    Some(link.size)
  }

  /// First block of at least `min_size` bytes, starting at its size class.
  pub fn find(
    &self,
    min_size: usize,
  ) -> Option<Block> {
    (bucket_for(min_size)..LIST_COUNT).find_map(|bucket| {
      self
        .iter_bucket(bucket)
        .find(|&(_, size)| size >= min_size)
        .map(|(block, _)| block)
    })
  }

  /// Blocks of one bucket with their sizes, head first.
  pub fn iter_bucket(
    &self,
    bucket: usize,
  ) -> impl Iterator<Item = (Block, usize)> + '_ {
    let mut cursor = self.heads[bucket];

    std::iter::from_fn(move || {
      let block = cursor?;
      let link = self.links.get(&block)?;
      cursor = link.next;
      Some((block, link.size))
    })
  }

  /// The block linked before `block` in its bucket.
  pub fn prev_of(
    &self,
    block: Block,
  ) -> Option<Block> {
    self.links.get(&block).and_then(|link| link.prev)
  }

  fn link_mut(
    &mut self,
    block: Block,
  ) -> &mut Link {
    // Every linked neighbour is itself in `links`.
    self
      .links
      .get_mut(&block)
      .unwrap_or_else(|| unreachable!("dangling free-list link {:#x}", block.offset()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sizes_in(
    list: &SegList,
    bucket: usize,
  ) -> Vec<usize> {
    list.iter_bucket(bucket).map(|(_, size)| size).collect()
  }

  #[test]
  fn test_bucket_for() {
    assert_eq!(bucket_for(0), 0);
    assert_eq!(bucket_for(1), 0);
    assert_eq!(bucket_for(2), 1);
    assert_eq!(bucket_for(3), 1);
    assert_eq!(bucket_for(16), 4);
    assert_eq!(bucket_for(24), 4);
    assert_eq!(bucket_for(32), 5);
    assert_eq!(bucket_for(4096), 12);
    assert_eq!(bucket_for(1 << 15), 15);
    assert_eq!(bucket_for(usize::MAX), LIST_COUNT - 1);
  }

  #[test]
  fn test_bucket_for_is_monotonic() {
    let mut last = 0;

    for size in (16..100_000).step_by(8) {
      let bucket = bucket_for(size);
      assert!(bucket >= last);
      last = bucket;
    }
  }

  #[test]
  fn test_insert_keeps_ascending_order() {
    let mut list = SegList::new();

    list.insert(Block::at(64), 56);
    list.insert(Block::at(128), 40);
    list.insert(Block::at(256), 48);
    list.insert(Block::at(512), 32);
    list.insert(Block::at(640), 48);

    assert_eq!(sizes_in(&list, 5), vec![32, 40, 48, 48, 56]);
    assert_eq!(list.len(), 5);
  }

  #[test]
  fn test_remove_head_middle_and_tail() {
    let mut list = SegList::new();
    for (i, size) in [32, 40, 48].into_iter().enumerate() {
      list.insert(Block::at(64 * (i + 1)), size);
    }

    assert_eq!(list.remove(Block::at(128)), Some(40));
    assert_eq!(sizes_in(&list, 5), vec![32, 48]);

    assert_eq!(list.remove(Block::at(64)), Some(32));
    assert_eq!(sizes_in(&list, 5), vec![48]);
    assert_eq!(list.prev_of(Block::at(192)), None);

    assert_eq!(list.remove(Block::at(192)), Some(48));
    assert!(list.is_empty());
    assert_eq!(list.iter_bucket(5).count(), 0);

    assert_eq!(list.remove(Block::at(192)), None);
  }

  #[test]
  fn test_find_prefers_smallest_fit_in_bucket() {
    let mut list = SegList::new();
    list.insert(Block::at(64), 56);
    list.insert(Block::at(128), 40);

    assert_eq!(list.find(34), Some(Block::at(128)));
    assert_eq!(list.find(48), Some(Block::at(64)));
  }

  #[test]
  fn test_find_falls_through_to_larger_buckets() {
    let mut list = SegList::new();
    list.insert(Block::at(64), 24);
    list.insert(Block::at(4096), 1 << 20);

    assert_eq!(list.find(24), Some(Block::at(64)));
    assert_eq!(list.find(32), Some(Block::at(4096)));
    assert_eq!(list.find((1 << 20) + 8), None);
  }

  #[test]
  fn test_clear_empties_every_bucket() {
    let mut list = SegList::new();
    list.insert(Block::at(64), 24);
    list.insert(Block::at(128), 4096);

    list.clear();

    assert!(list.is_empty());
    assert_eq!(list.find(16), None);
  }
}
