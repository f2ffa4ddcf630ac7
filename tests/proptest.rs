//! Property tests: random alloc/free/resize sequences checked against a
//! shadow copy of every live payload.

use proptest::prelude::*;

use segalloc::{Allocator, ArenaProvider, Config, HeapPtr};

#[derive(Debug, Clone)]
enum Op {
  Alloc(usize),
  Free(usize),
  Resize(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    4 => (1usize..600).prop_map(Op::Alloc),
    2 => any::<usize>().prop_map(Op::Free),
    2 => (any::<usize>(), 0usize..3000).prop_map(|(i, size)| Op::Resize(i, size)),
  ]
}

fn tunables() -> impl Strategy<Value = Config> {
  (0usize..300, 16usize..8192).prop_map(|(threshold, chunk)| {
    Config::default()
      .with_split_threshold(threshold)
      .with_chunk_size(chunk)
  })
}

struct Live {
  ptr: HeapPtr,
  data: Vec<u8>,
}

fn fill(
  allocator: &mut Allocator<ArenaProvider>,
  ptr: HeapPtr,
  len: usize,
  seed: u8,
) -> Vec<u8> {
  let data: Vec<u8> = (0..len).map(|i| seed.wrapping_add(i as u8)).collect();
  allocator.payload_mut(ptr)[..len].copy_from_slice(&data);
  data
}

fn assert_heap(
  allocator: &Allocator<ArenaProvider>,
  live: &[Live],
) -> Result<(), TestCaseError> {
  prop_assert_eq!(allocator.check(), Ok(()));

  let mut spans: Vec<(usize, usize)> = live
    .iter()
    .map(|l| (l.ptr.offset(), l.ptr.offset() + allocator.usable_size(l.ptr)))
    .collect();
  spans.sort_unstable();

  for pair in spans.windows(2) {
    prop_assert!(pair[0].1 <= pair[1].0, "overlap: {:?} and {:?}", pair[0], pair[1]);
  }

  for l in live {
    prop_assert_eq!(l.ptr.offset() % 8, 0);
    prop_assert_eq!(&allocator.payload(l.ptr)[..l.data.len()], l.data.as_slice());
  }

  Ok(())
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(256))]

  #[test]
  fn random_workload_keeps_heap_consistent(
    config in tunables(),
    ops in prop::collection::vec(op(), 1..200),
  ) {
    let mut allocator = Allocator::with_config(ArenaProvider::new(), config);
    allocator.init().unwrap();
    let mut live: Vec<Live> = Vec::new();

    for (step, op) in ops.into_iter().enumerate() {
      let seed = step as u8;

      match op {
        Op::Alloc(size) => {
          let ptr = allocator.alloc(size).unwrap();
          prop_assert!(allocator.usable_size(ptr) >= size);
          let data = fill(&mut allocator, ptr, size, seed);
          live.push(Live { ptr, data });
        },
        Op::Free(i) if !live.is_empty() => {
          let gone = live.swap_remove(i % live.len());
          allocator.free(gone.ptr);
        },
        Op::Resize(i, size) if !live.is_empty() => {
          let idx = i % live.len();
          let old = &live[idx];
          let kept = old.data.len().min(size);
          let prefix = old.data[..kept].to_vec();

          match allocator.resize(old.ptr, size).unwrap() {
            None => {
              prop_assert_eq!(size, 0);
              live.swap_remove(idx);
            },
            Some(ptr) => {
              prop_assert!(allocator.usable_size(ptr) >= size);
              prop_assert_eq!(&allocator.payload(ptr)[..kept], prefix.as_slice());
              let data = fill(&mut allocator, ptr, size, seed);
              live[idx] = Live { ptr, data };
            },
          }
        },
        _ => {},
      }

      assert_heap(&allocator, &live)?;
    }

    for l in live.drain(..) {
      allocator.free(l.ptr);
    }
    prop_assert_eq!(allocator.check(), Ok(()));
    prop_assert_eq!(allocator.stats().free_blocks, 1);
    prop_assert_eq!(allocator.stats().allocated_blocks, 0);
  }

  #[test]
  fn alloc_never_returns_overlapping_or_unaligned(sizes in prop::collection::vec(1usize..5000, 1..100)) {
    let mut allocator = Allocator::new(ArenaProvider::new());
    allocator.init().unwrap();
    let mut live = Vec::new();

    for (step, size) in sizes.into_iter().enumerate() {
      let ptr = allocator.alloc(size).unwrap();
      let data = fill(&mut allocator, ptr, size, step as u8);
      live.push(Live { ptr, data });
    }

    assert_heap(&allocator, &live)?;
  }

  #[test]
  fn exhausted_arena_stays_consistent(
    capacity in 300usize..6000,
    sizes in prop::collection::vec(1usize..2000, 1..60),
  ) {
    let mut allocator = Allocator::new(ArenaProvider::with_capacity(capacity));
    allocator.init().unwrap();
    let mut live = Vec::new();

    for (step, size) in sizes.into_iter().enumerate() {
      if let Ok(ptr) = allocator.alloc(size) {
        let data = fill(&mut allocator, ptr, size, step as u8);
        live.push(Live { ptr, data });
      } else if let Some(l) = live.pop() {
        allocator.free(l.ptr);
      }
      assert_heap(&allocator, &live)?;
    }
  }
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(32))]

  #[test]
  fn churn_keeps_utilization_above_floor(
    first in prop::collection::vec(16usize..256, 500),
    second in prop::collection::vec(16usize..256, 250),
  ) {
    let mut allocator = Allocator::new(ArenaProvider::new());
    allocator.init().unwrap();
    let mut live = Vec::new();
    let mut live_bytes = 0;

    for size in first {
      live.push((allocator.alloc(size).unwrap(), size));
      live_bytes += size;
    }
    let mut peak = live_bytes;

    let mut kept = Vec::new();
    for (i, (ptr, size)) in live.into_iter().enumerate() {
      if i % 2 == 0 {
        allocator.free(ptr);
        live_bytes -= size;
      } else {
        kept.push(ptr);
      }
    }
    prop_assert_eq!(allocator.check(), Ok(()));

    for size in second {
      kept.push(allocator.alloc(size).unwrap());
      live_bytes += size;
      peak = peak.max(live_bytes);
    }
    prop_assert_eq!(allocator.check(), Ok(()));

    let utilization = peak as f64 / allocator.stats().heap_size as f64;
    prop_assert!(utilization > 0.45, "utilization {:.3}", utilization);
  }
}
