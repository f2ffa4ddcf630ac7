/// Size of a boundary tag (header or footer) in bytes.
pub const WSIZE: usize = 4;

/// Alignment unit. Every block size and every payload offset is a multiple of it.
pub const ALIGNMENT: usize = 8;

/// Smallest block that can live on a free list: header, footer and room for links.
pub const MIN_BLOCK_SIZE: usize = 2 * ALIGNMENT;

/// Bytes of metadata carried by every block (header + footer).
pub const OVERHEAD: usize = 2 * WSIZE;

/// Largest block size a 32-bit tag can hold once the flag bits are masked off.
pub const MAX_BLOCK_SIZE: usize = (u32::MAX as usize) & !(ALIGNMENT - 1);

/// Rounds the given size up to the allocator's alignment unit.
///
/// # Examples
///
/// ```rust
/// use segalloc::align;
///
/// assert_eq!(align!(1), 8);
/// assert_eq!(align!(8), 8);
/// assert_eq!(align!(13), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Block size needed to serve a request of `size` payload bytes.
///
/// Returns `None` when the request overflows or cannot be encoded in a tag.
pub fn adjusted_size(size: usize) -> Option<usize> {
  if size <= ALIGNMENT {
    return Some(MIN_BLOCK_SIZE);
  }

  let padded = size.checked_add(OVERHEAD + ALIGNMENT - 1)?;
  let need = padded & !(ALIGNMENT - 1);

  (need <= MAX_BLOCK_SIZE).then_some(need)
}
