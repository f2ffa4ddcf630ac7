use std::io::Read;

use segalloc::{Allocator, HeapPtr, MemoryProvider, SbrkProvider};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations change the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    SbrkProvider::program_break(),
  );
}

fn print_alloc(
  allocator: &Allocator<SbrkProvider>,
  requested: usize,
  ptr: HeapPtr,
) {
  let address = allocator.payload(ptr).as_ptr();
  println!(
    "Allocated {} bytes ({} usable), offset = {:#x}, address = {:?}, addr % 8 = {}",
    requested,
    allocator.usable_size(ptr),
    ptr.offset(),
    address,
    address as usize % 8,
  );
}

fn print_stats(allocator: &Allocator<SbrkProvider>) {
  let stats = allocator.stats();
  println!(
    "heap = {} bytes, {} allocated ({} bytes), {} free ({} bytes), utilization = {:.2}",
    stats.heap_size,
    stats.allocated_blocks,
    stats.allocated_bytes,
    stats.free_blocks,
    stats.free_bytes,
    stats.utilization(),
  );
}

fn main() {
  // Everything the allocator hands out lives between the first break it sees
  // and the break it has pushed since. If anything else in the process moves
  // the break in between, growth fails and the allocator reports it.
  let mut allocator = Allocator::new(SbrkProvider::new());

  print_program_break("start");
  if let Err(err) = allocator.init() {
    eprintln!("init failed: {err}");
    return;
  }
  print_program_break("after init");
  print_stats(&allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Two small allocations land next to each other at the low end.
  // --------------------------------------------------------------------
  let (first, second) = match (allocator.alloc(4), allocator.alloc(12)) {
    (Ok(first), Ok(second)) => (first, second),
    _ => {
      eprintln!("small allocations failed");
      return;
    },
  };
  println!("\n[1] Allocate 4 and 12 bytes");
  print_alloc(&allocator, 4, first);
  print_alloc(&allocator, 12, second);
  allocator.payload_mut(first)[..4].copy_from_slice(&0xDEADBEEFu32.to_ne_bytes());
  print_stats(&allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Free the first block and ask for a small one again: it is reused.
  // --------------------------------------------------------------------
  allocator.free(first);
  let reused = match allocator.alloc(2) {
    Ok(ptr) => ptr,
    Err(err) => {
      eprintln!("alloc failed: {err}");
      return;
    },
  };
  println!("\n[2] Free the first block, allocate 2 bytes");
  print_alloc(&allocator, 2, reused);
  println!(
    "[2] reused == first? {}",
    if reused == first { "Yes, it reused the freed block" } else { "No, it allocated somewhere else" }
  );
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) A 64 KiB request does not fit: the heap grows.
  // --------------------------------------------------------------------
  print_program_break("before large alloc");
  match allocator.alloc(64 * 1024) {
    Ok(big) => {
      println!("\n[3] Allocate large 64 KiB block");
      print_alloc(&allocator, 64 * 1024, big);
    },
    Err(err) => println!("\n[3] Large allocation failed: {err}"),
  }
  print_program_break("after large alloc");
  print_stats(&allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Grow the second block. It absorbs its free neighbour in place.
  // --------------------------------------------------------------------
  match allocator.resize(second, 100) {
    Ok(Some(grown)) => {
      println!("\n[4] Resize second block to 100 bytes");
      print_alloc(&allocator, 100, grown);
      println!("[4] moved? {}", grown != second);
    },
    Ok(None) => println!("\n[4] Block was freed"),
    Err(err) => println!("\n[4] Resize failed: {err}"),
  }
  print_stats(&allocator);

  match allocator.check() {
    Ok(()) => println!("\n[5] Heap is consistent, {} bytes claimed from the break", allocator.provider().len()),
    Err(violation) => println!("\n[5] Heap check failed: {violation}"),
  }

  println!("\n[6] End of example. Process will exit and the OS will reclaim all memory.");
}
