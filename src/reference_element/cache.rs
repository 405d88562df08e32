//! Process-wide memoization of data derived from a [`GeometryType`].
//!
//! Entries are keyed by the value type and the geometry type. The map lock is
//! only held to fetch a key's slot; the slot itself is initialized exactly once,
//! with concurrent first accesses blocking until the value is ready.

use crate::GeometryType;

use once_cell::sync::{Lazy, OnceCell};
use std::{
  any::{Any, TypeId},
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

type Erased = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceCell<Erased>>;

static CACHE: Lazy<Mutex<HashMap<(TypeId, GeometryType), Slot>>> = Lazy::new(Default::default);

pub(crate) fn get_or_build<V, F>(geometry_type: GeometryType, build: F) -> Arc<V>
where
  V: Any + Send + Sync,
  F: FnOnce() -> V,
{
  let slot = {
    let mut cache = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    let slot = cache.entry((TypeId::of::<V>(), geometry_type)).or_default();
    Arc::clone(slot)
  };
  let erased = slot.get_or_init(|| Arc::new(build()) as Erased);
  Arc::clone(erased)
    .downcast::<V>()
    .expect("cache slots are keyed by value type")
}

#[cfg(test)]
mod test {
  use super::*;

  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Debug)]
  struct Probe(usize);

  #[test]
  fn computes_once_per_key() {
    static BUILDS: AtomicUsize = AtomicUsize::new(0);
    let gt = GeometryType::cube(7);

    let handles: Vec<_> = (0..8)
      .map(|_| {
        std::thread::spawn(move || {
          get_or_build(gt, || Probe(BUILDS.fetch_add(1, Ordering::SeqCst)))
        })
      })
      .collect();
    let probes: Vec<Arc<Probe>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    assert!(probes.iter().all(|p| Arc::ptr_eq(p, &probes[0])));
    assert_eq!(probes[0].0, 0);
  }
}
