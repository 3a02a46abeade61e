//! # Handle Table
//!
//! Process-wide registry mapping opaque handles to live entries.
//!
//! ## Arena Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          HandleTable<T>                                 │
//! │                                                                         │
//! │   RwLock<Arena>                                                         │
//! │   ├── slots: [ (gen 3, Some(tx)) (gen 1, None) (gen 2, Some(tx)) ... ]  │
//! │   ├── free:  [ 1 ]             ◄── indexes ready for reuse              │
//! │   └── live:  2                                                          │
//! │                                                                         │
//! │   allocate  ──► pop free slot (or push new), handle = (gen, index)     │
//! │   resolve   ──► slot[index].gen == handle.gen ? clone Arc : NotFound   │
//! │   release   ──► take entry, gen += 1, push index to free               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A released handle can never resolve again: its slot's generation has
//! moved on. A slot whose generation counter is exhausted is retired instead
//! of being recycled, so generations never wrap.

use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::error::{KernelError, KernelResult};
use crate::handle::Handle;

struct Slot<T> {
    generation: u32,
    entry: Option<Arc<T>>,
}

struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

/// Generation-tagged arena of shared entries behind a table-wide lock.
pub struct HandleTable<T> {
    arena: RwLock<Arena<T>>,
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        HandleTable {
            arena: RwLock::new(Arena {
                slots: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    /// Allocates a fresh handle and stores the entry built for it.
    ///
    /// `make` receives the handle so the entry can record its own identity.
    pub fn allocate_with<F>(&self, make: F) -> KernelResult<(Handle, Arc<T>)>
    where
        F: FnOnce(Handle) -> T,
    {
        let mut arena = self
            .arena
            .write()
            .map_err(|_| KernelError::poisoned("handle table"))?;

        let index = match arena.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(arena.slots.len())
                    .map_err(|_| KernelError::Internal("handle table exhausted".into()))?;
                arena.slots.push(Slot {
                    generation: 1,
                    entry: None,
                });
                index
            }
        };

        let slot = &mut arena.slots[index as usize];
        let handle = Handle::from_parts(index, slot.generation);
        let entry = Arc::new(make(handle));
        slot.entry = Some(Arc::clone(&entry));
        arena.live += 1;

        Ok((handle, entry))
    }

    /// Resolves a handle to its live entry.
    pub fn resolve(&self, handle: Handle) -> KernelResult<Arc<T>> {
        if handle.is_invalid() {
            return Err(KernelError::NotFound(handle));
        }

        let arena = self
            .arena
            .read()
            .map_err(|_| KernelError::poisoned("handle table"))?;

        arena
            .slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.clone())
            .ok_or(KernelError::NotFound(handle))
    }

    /// Releases a handle, returning the entry it owned.
    ///
    /// A second release of the same handle reports `NotFound`.
    pub fn release(&self, handle: Handle) -> KernelResult<Arc<T>> {
        if handle.is_invalid() {
            return Err(KernelError::NotFound(handle));
        }

        let mut arena = self
            .arena
            .write()
            .map_err(|_| KernelError::poisoned("handle table"))?;

        let index = handle.index();
        let slot = arena
            .slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == handle.generation())
            .ok_or(KernelError::NotFound(handle))?;
        let entry = slot.entry.take().ok_or(KernelError::NotFound(handle))?;

        let recycle = match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                true
            }
            None => {
                warn!(index, "Handle slot generation exhausted, retiring slot");
                false
            }
        };
        if recycle {
            arena.free.push(index);
        }
        arena.live -= 1;

        Ok(entry)
    }

    /// Number of live handles.
    pub fn len(&self) -> KernelResult<usize> {
        let arena = self
            .arena
            .read()
            .map_err(|_| KernelError::poisoned("handle table"))?;
        Ok(arena.live)
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn allocate_resolve_release() {
        let table = HandleTable::new();
        let (handle, entry) = table.allocate_with(|h| h.raw()).unwrap();

        assert!(!handle.is_invalid());
        assert_eq!(*entry, handle.raw());
        assert_eq!(*table.resolve(handle).unwrap(), handle.raw());
        assert_eq!(table.len().unwrap(), 1);

        table.release(handle).unwrap();
        assert!(matches!(table.resolve(handle), Err(KernelError::NotFound(_))));
        assert_eq!(table.len().unwrap(), 0);
    }

    #[test]
    fn double_release_is_not_found() {
        let table = HandleTable::new();
        let (handle, _) = table.allocate_with(|_| ()).unwrap();

        assert!(table.release(handle).is_ok());
        assert!(matches!(table.release(handle), Err(KernelError::NotFound(_))));
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let table = HandleTable::new();
        let (first, _) = table.allocate_with(|_| "first").unwrap();
        table.release(first).unwrap();

        let (second, entry) = table.allocate_with(|_| "second").unwrap();
        assert_eq!(second.index(), first.index());
        assert_ne!(second, first);
        assert_eq!(second.generation(), first.generation() + 1);

        // The stale handle stays dead even though its slot is live again.
        assert!(matches!(table.resolve(first), Err(KernelError::NotFound(_))));
        assert!(matches!(table.release(first), Err(KernelError::NotFound(_))));
        assert_eq!(*entry, "second");
        assert_eq!(*table.resolve(second).unwrap(), "second");
    }

    #[test]
    fn never_issued_handles_are_not_found() {
        let table: HandleTable<()> = HandleTable::new();
        assert!(table.resolve(Handle::INVALID).is_err());
        assert!(table.release(Handle::INVALID).is_err());
        assert!(table.resolve(Handle::from_parts(0, 1)).is_err());
        assert!(table.resolve(Handle::from_parts(99, 1)).is_err());

        let (handle, _) = table.allocate_with(|_| ()).unwrap();
        let forged = Handle::from_parts(handle.index(), handle.generation() + 5);
        assert!(table.resolve(forged).is_err());
    }

    #[test]
    fn exhausted_generation_retires_slot() {
        let table = HandleTable::new();
        let (handle, _) = table.allocate_with(|_| ()).unwrap();
        {
            let mut arena = table.arena.write().unwrap();
            arena.slots[handle.index() as usize].generation = u32::MAX;
        }
        let last = Handle::from_parts(handle.index(), u32::MAX);
        table.release(last).unwrap();

        assert!(table.resolve(last).is_err());
        let (next, _) = table.allocate_with(|_| ()).unwrap();
        assert_ne!(next.index(), last.index());
    }

    #[test]
    fn concurrent_allocations_are_distinct() {
        let table = Arc::new(HandleTable::new());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| table.allocate_with(|_| ()).unwrap().0)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for handle in worker.join().unwrap() {
                assert!(seen.insert(handle), "duplicate handle {handle}");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(table.len().unwrap(), 800);
    }
}
