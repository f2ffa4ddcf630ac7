use std::{io, ptr, slice};

use libc::{c_void, intptr_t, sbrk};

use crate::error::ProviderError;

/// Default capacity of an [`ArenaProvider`]: 20 MiB.
pub const DEFAULT_ARENA_CAPACITY: usize = 20 * (1 << 20);

/// A region of memory that can only grow, one contiguous extension at a time.
///
/// Offsets handed out by the allocator are offsets into [`bytes`](Self::bytes).
pub trait MemoryProvider {
  /// Grows the region by `incr` bytes and returns the offset of the old end.
  /// An extension that cannot start at the old end must fail instead.
  fn extend(
    &mut self,
    incr: usize,
  ) -> Result<usize, ProviderError>;

  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];

  fn len(&self) -> usize {
    self.bytes().len()
  }

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// A heap-backed region with a fixed upper bound, for isolated heaps and tests.
#[derive(Debug)]
pub struct ArenaProvider {
  buf: Vec<u8>,
  capacity: usize,
}

impl ArenaProvider {
  pub fn new() -> Self {
    Self::with_capacity(DEFAULT_ARENA_CAPACITY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      buf: Vec::new(),
      capacity,
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

impl Default for ArenaProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryProvider for ArenaProvider {
  fn extend(
    &mut self,
    incr: usize,
  ) -> Result<usize, ProviderError> {
    let old = self.buf.len();
    let available = self.capacity - old;

    if incr > available {
      return Err(ProviderError::Exhausted {
        requested: incr,
        available,
      });
    }

    self.buf.resize(old + incr, 0);
    Ok(old)
  }

  fn bytes(&self) -> &[u8] {
    &self.buf
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    &mut self.buf
  }
}

/// Grows the process data segment with `sbrk(2)`.
///
/// The region starts at the first 8-aligned break observed. Anything else in
/// the process that moves the break (the system `malloc` included) makes the
/// next extension fail with [`ProviderError::Discontiguous`].
#[derive(Debug)]
pub struct SbrkProvider {
  start: *mut u8,
  len: usize,
}

impl SbrkProvider {
  pub fn new() -> Self {
    Self {
      start: ptr::null_mut(),
      len: 0,
    }
  }

  /// Current program break, as reported by `sbrk(0)`.
  pub fn program_break() -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }

  unsafe fn bump(incr: usize) -> Result<*mut u8, ProviderError> {
    let incr = intptr_t::try_from(incr).map_err(|_| ProviderError::Exhausted {
      requested: incr,
      available: intptr_t::MAX as usize,
    })?;

    let address = unsafe { sbrk(incr) };

    if address == usize::MAX as *mut c_void {
      let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
      return Err(ProviderError::Sbrk(errno));
    }

    Ok(address as *mut u8)
  }

  unsafe fn claim_start(&mut self) -> Result<(), ProviderError> {
    unsafe {
      let current = Self::bump(0)?;
      let pad = current.align_offset(crate::align::ALIGNMENT);

      if pad > 0 {
        Self::bump(pad)?;
      }

      self.start = current.add(pad);
    }

    Ok(())
  }
}

impl Default for SbrkProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryProvider for SbrkProvider {
  fn extend(
    &mut self,
    incr: usize,
  ) -> Result<usize, ProviderError> {
    unsafe {
      if self.start.is_null() {
        self.claim_start()?;
      }

      let expected = self.start.add(self.len);
      let address = Self::bump(incr)?;

      if address != expected {
        return Err(ProviderError::Discontiguous {
          expected: expected as usize,
          found: address as usize,
        });
      }
    }

    let old = self.len;
    self.len += incr;
    Ok(old)
  }

  fn bytes(&self) -> &[u8] {
    if self.start.is_null() {
      return &[];
    }

    // SAFETY: [start, start + len) was obtained from sbrk and is owned by us.
    unsafe { slice::from_raw_parts(self.start, self.len) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    if self.start.is_null() {
      return &mut [];
    }

    // SAFETY: see `bytes`; `&mut self` guarantees exclusive access.
    unsafe { slice::from_raw_parts_mut(self.start, self.len) }
  }
}
