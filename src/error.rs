use thiserror::Error;

/// Failures reported by a [`MemoryProvider`](crate::MemoryProvider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProviderError {
  /// The provider has no room left for the requested extension.
  #[error("provider exhausted: {requested} bytes requested, {available} available")]
  Exhausted { requested: usize, available: usize },
  /// `sbrk` refused to move the program break.
  #[error("sbrk failed: errno {0}")]
  Sbrk(i32),
  /// The new bytes do not start where the region previously ended.
  #[error("extension is not contiguous with the region (expected {expected:#x}, got {found:#x})")]
  Discontiguous { expected: usize, found: usize },
}

/// Errors returned by the allocator's public operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// `alloc(0)`: nothing was allocated. This is a sentinel, not a heap failure.
  #[error("zero-size request")]
  ZeroSize,
  /// The heap could not be grown enough to satisfy the request.
  #[error("out of memory: {requested} bytes requested")]
  OutOfMemory { requested: usize },
  /// An operation other than `init` was called before `init` succeeded.
  #[error("allocator is not initialized")]
  Uninitialized,
  #[error(transparent)]
  Provider(#[from] ProviderError),
}

/// First inconsistency found by [`Allocator::check`](crate::Allocator::check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapViolation {
  #[error("bad prologue at {0:#x}")]
  BadPrologue(usize),
  #[error("missing epilogue at {0:#x}")]
  MissingEpilogue(usize),
  #[error("block {0:#x}: header and footer disagree")]
  TagMismatch(usize),
  #[error("block {0:#x}: size or payload is not aligned")]
  Misaligned(usize),
  #[error("block {0:#x}: size {1} is below the minimum block size")]
  Undersized(usize, usize),
  #[error("block {0:#x} runs past the end of the heap")]
  OutOfBounds(usize),
  #[error("blocks {0:#x} and {1:#x} are adjacent and both free")]
  AdjacentFree(usize, usize),
  #[error("free block {0:#x} is not on any free list")]
  Unlisted(usize),
  #[error("block {0:#x} is on a free list but allocated")]
  ListedAllocated(usize),
  #[error("block {0:#x} is in bucket {1}, expected bucket {2}")]
  WrongBucket(usize, usize, usize),
  #[error("bucket {0} is not sorted by size at block {1:#x}")]
  Unsorted(usize, usize),
  #[error("block {0:#x} has a broken back-link")]
  BrokenLink(usize),
  #[error("block {0:#x}: index records size {1}, tag says {2}")]
  SizeMismatch(usize, usize, usize),
  #[error("free lists hold {listed} blocks, heap walk found {walked}")]
  CountMismatch { listed: usize, walked: usize },
}

pub type Result<T> = core::result::Result<T, AllocError>;
