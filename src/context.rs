//! Context identity, the process-wide active-surface tracker, the scoped
//! context-switch guard, and the per-context resource table shared by every
//! GPU resource type.
//!
//! All state here is thread-local by design: the execution model is one
//! logical thread of graphics control, and OpenGL's "current context" is a
//! single process-wide value on that thread.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::surface::SurfaceShared;

/// Stable identity of one surface and its GL context.
///
/// Identities are never reused within a process, so a map entry keyed by a
/// destroyed surface's id can never be confused with a newer surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(u64);

thread_local! {
    static ACTIVE: RefCell<Weak<SurfaceShared>> = RefCell::new(Weak::new());
    static NEXT_SURFACE_ID: Cell<u64> = const { Cell::new(0) };
    static LIVE_SURFACES: Cell<usize> = const { Cell::new(0) };
}

/// Identity of the surface whose context is current, if any.
pub fn active_surface_id() -> Option<SurfaceId> {
    active_shared().map(|shared| shared.id())
}

/// Number of live surfaces on this thread.
pub fn live_surface_count() -> usize {
    LIVE_SURFACES.with(Cell::get)
}

pub(crate) fn active_shared() -> Option<Rc<SurfaceShared>> {
    ACTIVE.with(|active| active.borrow().upgrade())
}

pub(crate) fn set_active(shared: &Rc<SurfaceShared>) {
    ACTIVE.with(|active| *active.borrow_mut() = Rc::downgrade(shared));
}

pub(crate) fn clear_active() {
    ACTIVE.with(|active| *active.borrow_mut() = Weak::new());
}

/// Allocates an identity for a new surface and counts it as live.
pub(crate) fn surface_created() -> SurfaceId {
    LIVE_SURFACES.with(|count| count.set(count.get() + 1));
    NEXT_SURFACE_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        SurfaceId(id)
    })
}

/// Counts a surface as destroyed. When the last one goes, the shared
/// tracking state is torn down so a later surface starts from a clean
/// subsystem state.
pub(crate) fn surface_dropped(id: SurfaceId) {
    if active_surface_id() == Some(id) {
        clear_active();
    }
    LIVE_SURFACES.with(|count| {
        let remaining = count.get().saturating_sub(1);
        count.set(remaining);
        if remaining == 0 {
            clear_active();
        }
    });
}

/// Scoped context switch.
///
/// Acquiring records whichever surface is active, makes the target's context
/// current (a cheap no-op when it already is), and exposes the target's GL
/// interface. Dropping restores the previously active context on every exit
/// path; when nothing was active before, the target context is released.
pub(crate) struct ContextGuard {
    target: Rc<SurfaceShared>,
    previous: Option<Rc<SurfaceShared>>,
    switched: bool,
}

impl ContextGuard {
    /// Switches to `target`'s context. Returns `None` (with the failure
    /// logged) when the underlying make-current call fails; the caller is
    /// expected to skip the guarded operation.
    pub(crate) fn acquire(target: &Rc<SurfaceShared>) -> Option<Self> {
        let previous = active_shared();
        let switched = previous.as_ref().map(|p| p.id()) != Some(target.id());
        if switched && !target.make_current() {
            return None;
        }
        Some(Self {
            target: Rc::clone(target),
            previous,
            switched,
        })
    }

    pub(crate) fn gl(&self) -> &glow::Context {
        self.target.gl()
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if !self.switched {
            return;
        }
        match self.previous.take() {
            // Restoration failures are logged inside make_current; there is
            // nothing further to do from a destructor.
            Some(previous) => {
                previous.make_current();
            }
            None => self.target.release_current(),
        }
    }
}

/// Per-context resource table: surface identity to opaque GPU handle.
///
/// One instance of this table backs every GPU-resource-bearing type
/// (textures, meshes, programs hold one entry). Entries keep a weak surface
/// reference, so destroying a surface never keeps GPU bookkeeping alive:
/// dead entries are pruned on iteration and their handles dropped (the GL
/// objects they named died with the context).
pub(crate) struct ContextMap<H> {
    entries: Vec<ContextEntry<H>>,
}

struct ContextEntry<H> {
    id: SurfaceId,
    surface: Weak<SurfaceShared>,
    handle: H,
}

impl<H> ContextMap<H> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn contains(&self, id: SurfaceId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub(crate) fn get(&self, id: SurfaceId) -> Option<&H> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.handle)
    }

    /// Upsert. Registering a surface that already has an entry replaces the
    /// handle and returns the displaced one, so a caller can never leak a
    /// GPU object by re-registering.
    pub(crate) fn insert(
        &mut self,
        id: SurfaceId,
        surface: Weak<SurfaceShared>,
        handle: H,
    ) -> Option<H> {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.surface = surface;
                Some(std::mem::replace(&mut entry.handle, handle))
            }
            None => {
                self.entries.push(ContextEntry {
                    id,
                    surface,
                    handle,
                });
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, id: SurfaceId) -> Option<H> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.swap_remove(index).handle)
    }

    /// Drops entries whose surface has been destroyed.
    pub(crate) fn prune(&mut self) {
        self.entries
            .retain(|entry| entry.surface.upgrade().is_some());
    }

    /// Live registrations: surface plus handle, skipping dead entries.
    pub(crate) fn iter_live(&self) -> impl Iterator<Item = (Rc<SurfaceShared>, &H)> + '_ {
        self.entries
            .iter()
            .filter_map(|entry| entry.surface.upgrade().map(|shared| (shared, &entry.handle)))
    }

    /// Empties the table, returning handles whose surface is still alive so
    /// the caller can delete the GL objects they name. Handles for dead
    /// surfaces are silently dropped.
    pub(crate) fn drain_live(&mut self) -> Vec<(Rc<SurfaceShared>, H)> {
        self.entries
            .drain(..)
            .filter_map(|entry| entry.surface.upgrade().map(|shared| (shared, entry.handle)))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_per_surface() {
        let mut map = ContextMap::new();
        let id = surface_created();

        assert_eq!(map.insert(id, Weak::new(), 7u32), None);
        assert_eq!(map.len(), 1);

        // Re-registering the same surface must not grow the table, and the
        // displaced handle comes back to the caller.
        assert_eq!(map.insert(id, Weak::new(), 9u32), Some(7));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(id), Some(&9));

        surface_dropped(id);
    }

    #[test]
    fn distinct_surfaces_get_distinct_entries() {
        let mut map = ContextMap::new();
        let a = surface_created();
        let b = surface_created();
        assert_ne!(a, b);

        map.insert(a, Weak::new(), 1u32);
        map.insert(b, Weak::new(), 2u32);
        assert_eq!(map.get(a), Some(&1));
        assert_eq!(map.get(b), Some(&2));
        assert!(!map.contains(surface_created()));

        surface_dropped(a);
        surface_dropped(b);
    }

    #[test]
    fn remove_returns_handle() {
        let mut map = ContextMap::new();
        let id = surface_created();
        map.insert(id, Weak::new(), 42u32);

        assert_eq!(map.remove(id), Some(42));
        assert!(map.is_empty());
        assert_eq!(map.remove(id), None);

        surface_dropped(id);
    }

    #[test]
    fn prune_drops_dead_surfaces() {
        let mut map = ContextMap::new();
        let id = surface_created();

        // A `Weak::new()` entry stands in for a registration whose surface
        // has since been destroyed.
        map.insert(id, Weak::new(), 3u32);
        assert_eq!(map.len(), 1);

        map.prune();
        assert!(map.is_empty());
        assert_eq!(map.iter_live().count(), 0);

        surface_dropped(id);
    }

    #[test]
    fn live_counter_tracks_create_and_drop() {
        let before = live_surface_count();
        let a = surface_created();
        let b = surface_created();
        assert_eq!(live_surface_count(), before + 2);

        surface_dropped(a);
        surface_dropped(b);
        assert_eq!(live_surface_count(), before);
    }

    #[test]
    fn no_active_surface_by_default() {
        assert_eq!(active_surface_id(), None);
    }
}
