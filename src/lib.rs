//! # segalloc - A Segregated-Fit Memory Allocator Library
//!
//! This crate provides a general-purpose heap allocator that serves
//! allocation, deallocation and resize requests from a single region that
//! only ever grows, the way a classic `malloc` grows the program break.
//!
//! ## Overview
//!
//! Every block carries a boundary tag at both ends, free blocks are filed in
//! size-class buckets, and freed blocks are merged with their free neighbours
//! immediately:
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌─────┬─────────┬──────────┬──────────────┬──────────┬─────────┐
//!   │ pad │prologue │  A1      │    free      │   A2     │epilogue │
//!   │     │  8|1    │ hdr..ftr │   hdr..ftr   │ hdr..ftr │  0|1    │
//!   └─────┴─────────┴──────────┴──────────────┴──────────┴─────────┘
//!                                                        ▲
//!                                                        │
//!                                                   end of heap
//!                                                 (moves on growth)
//!
//!   Segregated Free Lists (ascending size within a bucket):
//!
//!   bucket 4  (16..32)   ──► [16] ◄──► [24]
//!   bucket 5  (32..64)   ──► [40]
//!   ...
//!   bucket 15 (32K..)    ──► [65536] ◄──► [1 MiB]
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - Alignment macro and block size arithmetic
//!   ├── block      - Boundary-tag view over a block (internal)
//!   ├── heap       - Sentinels and heap growth (internal)
//!   ├── seglist    - Segregated free-list index (internal)
//!   ├── coalesce   - Merging of adjacent free blocks (internal)
//!   ├── place      - Splitting policy (internal)
//!   ├── allocator  - Allocator: init / alloc / free / resize
//!   ├── check      - Heap consistency checker and statistics
//!   ├── config     - Placement and growth tunables
//!   ├── provider   - MemoryProvider trait, ArenaProvider, SbrkProvider
//!   └── error      - Error types
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use segalloc::{Allocator, ArenaProvider};
//!
//! let mut allocator = Allocator::new(ArenaProvider::new());
//! allocator.init().unwrap();
//!
//! let p = allocator.alloc(24).unwrap();
//! allocator.payload_mut(p)[..5].copy_from_slice(b"hello");
//!
//! let p = allocator.resize(p, 4096).unwrap().unwrap();
//! assert_eq!(&allocator.payload(p)[..5], b"hello");
//!
//! allocator.free(p);
//! allocator.check().unwrap();
//! ```
//!
//! ## How It Works
//!
//! - **alloc**: the request is padded to a block size, the free lists are
//!   searched from the request's size class upwards, and on a miss the heap
//!   grows by a chunk. The chosen block is split: small requests take the
//!   low end, large requests the high end.
//! - **free**: the block is marked free, filed, and merged with free
//!   neighbours, so no two free blocks are ever adjacent.
//! - **resize**: blocks that already fit are returned as is; otherwise the
//!   following free block (or fresh heap at the end) is absorbed in place,
//!   and only then is the payload moved.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Grow-only**: Memory is never returned to the provider
//! - **No shrinking**: `resize` to a smaller size keeps the block as is
//! - **Fixed alignment**: Payloads are aligned to 8 bytes, nothing more
//! - **4 GiB ceiling**: Tags are 32-bit, so one heap stops growing just below
//!   4 GiB (`ProviderError::Exhausted`)
//!
//! ## Safety
//!
//! Allocations are offsets into the provider's region, so the allocator
//! itself is safe code. Freeing a pointer twice, or one that did not come
//! from the same allocator, corrupts the heap (debug builds assert).

pub mod align;
mod allocator;
mod block;
mod check;
mod coalesce;
mod config;
mod error;
mod heap;
mod place;
mod provider;
mod seglist;

pub use allocator::{Allocator, HeapPtr};
pub use check::HeapStats;
pub use config::{Config, DEFAULT_CHUNK_SIZE, DEFAULT_INITIAL_SIZE, DEFAULT_SPLIT_THRESHOLD};
pub use error::{AllocError, HeapViolation, ProviderError, Result};
pub use provider::{ArenaProvider, DEFAULT_ARENA_CAPACITY, MemoryProvider, SbrkProvider};
pub use seglist::{LIST_COUNT, bucket_for};
