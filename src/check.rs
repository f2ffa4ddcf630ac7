use crate::{
  Allocator,
  align::{ALIGNMENT, MIN_BLOCK_SIZE, OVERHEAD},
  error::HeapViolation,
  provider::MemoryProvider,
  seglist::{LIST_COUNT, bucket_for},
};

/// A snapshot of the heap taken by walking every block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Bytes from the start of the sentinels to the end of the heap.
  pub heap_size: usize,
  pub allocated_blocks: usize,
  /// Sum of allocated block sizes, tags included.
  pub allocated_bytes: usize,
  /// Usable bytes behind the allocated blocks, tags excluded.
  pub payload_bytes: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub largest_free: usize,
}

impl HeapStats {
  /// Share of the heap available to callers as payload.
  pub fn utilization(&self) -> f64 {
    if self.heap_size == 0 {
      return 0.0;
    }
    self.payload_bytes as f64 / self.heap_size as f64
  }
}

impl<P: MemoryProvider> Allocator<P> {
  /// Verifies boundary tags, adjacency and free-list membership.
  ///
  /// An uninitialized allocator is trivially consistent.
  pub fn check(&self) -> Result<(), HeapViolation> {
    let heap = &self.heap;
    let Some(prologue) = heap.prologue() else {
      return Ok(());
    };

    if prologue.size(heap) != ALIGNMENT
      || !prologue.is_allocated(heap)
      || heap.get(prologue.footer(heap)) != heap.get(prologue.header())
    {
      return Err(HeapViolation::BadPrologue(prologue.offset()));
    }

    let end = heap.end();
    let mut walked_free = 0;
    let mut prev_free = None;
    let mut block = prologue.next(heap);

    loop {
      let at = block.offset();
      if at > end {
        return Err(HeapViolation::OutOfBounds(at));
      }

      let size = block.size(heap);
      if size == 0 {
        if at != end || !block.is_allocated(heap) {
          return Err(HeapViolation::MissingEpilogue(at));
        }
        break;
      }

      if at % ALIGNMENT != 0 || size % ALIGNMENT != 0 {
        return Err(HeapViolation::Misaligned(at));
      }
      if size < MIN_BLOCK_SIZE {
        return Err(HeapViolation::Undersized(at, size));
      }
      if at + size > end {
        return Err(HeapViolation::OutOfBounds(at));
      }
      if heap.get(block.header()) != heap.get(block.footer(heap)) {
        return Err(HeapViolation::TagMismatch(at));
      }

      if block.is_allocated(heap) {
        if self.free.contains(block) {
          return Err(HeapViolation::ListedAllocated(at));
        }
        prev_free = None;
      } else {
        if let Some(prev) = prev_free {
          return Err(HeapViolation::AdjacentFree(prev, at));
        }
        match self.free.size_of(block) {
          None => return Err(HeapViolation::Unlisted(at)),
          Some(listed) if listed != size => {
            return Err(HeapViolation::SizeMismatch(at, listed, size));
          },
          Some(_) => {},
        }
        walked_free += 1;
        prev_free = Some(at);
      }

      block = block.next(heap);
    }

    let mut listed = 0;
    for bucket in 0..LIST_COUNT {
      let mut smallest = 0;
      let mut prev = None;

      for (entry, size) in self.free.iter_bucket(bucket).take(self.free.len() + 1) {
        listed += 1;

        if entry.offset() > end || entry.is_allocated(heap) {
          return Err(HeapViolation::ListedAllocated(entry.offset()));
        }
        let expected = bucket_for(size);
        if expected != bucket {
          return Err(HeapViolation::WrongBucket(entry.offset(), bucket, expected));
        }
        if size < smallest {
          return Err(HeapViolation::Unsorted(bucket, entry.offset()));
        }
        if self.free.prev_of(entry) != prev {
          return Err(HeapViolation::BrokenLink(entry.offset()));
        }

        smallest = size;
        prev = Some(entry);
      }
    }

    if listed != walked_free || listed != self.free.len() {
      return Err(HeapViolation::CountMismatch {
        listed,
        walked: walked_free,
      });
    }

    Ok(())
  }

  /// Walks the heap and tallies its blocks. Assumes a consistent heap.
  pub fn stats(&self) -> HeapStats {
    let heap = &self.heap;
    let mut stats = HeapStats {
      heap_size: heap.size(),
      ..HeapStats::default()
    };

    let Some(first) = heap.first_block() else {
      return stats;
    };

    let mut block = first;
    while block.offset() < heap.end() {
      let size = block.size(heap);
      if size == 0 {
        break;
      }

      if block.is_allocated(heap) {
        stats.allocated_blocks += 1;
        stats.allocated_bytes += size;
        stats.payload_bytes += size - OVERHEAD;
      } else {
        stats.free_blocks += 1;
        stats.free_bytes += size;
        stats.largest_free = stats.largest_free.max(size);
      }

      block = block.next(heap);
    }

    stats
  }
}
