//! ResourceCache: keyed roots with a grace window before eviction.

use crate::clock::{Clock, MonotonicClock};
use crate::config::CacheConfig;
use crate::entry_table::{EntryId, EntryTable, InsertError};
use crate::free_list::{FreeList, FreeSlot};
use crate::handle::Handle;
use crate::hook::{Hook, ReleaseSink};
use crate::loader::Loader;
use crate::root::{RootOwner, SharePtr};
use crate::tokens::Token;
use core::borrow::Borrow;
use core::cell::RefCell;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;
use std::rc::{Rc, Weak};
use std::time::Duration;

struct Entry<T> {
    root: RootOwner<T>,
    // Present iff the root's count is zero.
    parked: Option<FreeSlot>,
}

struct CacheState<K, T, S> {
    entries: EntryTable<K, Entry<T>, S>,
    free: FreeList,
}

struct CacheCore<K, T, C, S> {
    state: RefCell<CacheState<K, T, S>>,
    clock: C,
    window: Duration,
}

/// A cache of shared resources keyed by `K`.
///
/// [`get`](Self::get) returns a [`Handle`] to the resource for a key,
/// building it with the loader on a miss. When the last handle for an entry
/// is dropped the entry is parked rather than destroyed; asking for the key
/// again within the eviction window returns the same resource. Parked
/// entries older than the window are evicted by [`sweep`](Self::sweep),
/// which every `get` runs after serving its request. There is no background
/// timer: a cache nobody calls keeps its parked entries.
///
/// The cache and its handles are single-threaded (`!Send`, `!Sync`).
/// Resources are always dropped after the cache's bookkeeping is consistent
/// again, so a resource may itself hold handles into the same cache.
///
/// ```
/// use resource_cache::{CacheConfig, ManualClock, ResourceCache};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let mut built = 0;
/// let mut cache: ResourceCache<u32, _, _> = ResourceCache::with_clock(
///     CacheConfig::new(Duration::from_secs(2)),
///     |id: &u32| -> Result<String, ()> {
///         built += 1;
///         Ok(format!("mesh-{id}"))
///     },
///     clock.clone(),
/// );
///
/// let a = cache.get(&1).unwrap();
/// drop(a);
/// let b = cache.get(&1).unwrap(); // parked, not rebuilt
/// assert_eq!(&*b, "mesh-1");
/// drop(b);
///
/// clock.advance(Duration::from_millis(2100));
/// cache.get(&2).unwrap(); // sweeps key 1
/// assert!(!cache.contains_key(&1));
/// ```
pub struct ResourceCache<K, L, C = MonotonicClock, S = RandomState>
where
    L: Loader<K>,
{
    core: Rc<CacheCore<K, L::Resource, C, S>>,
    loader: L,
}

impl<K, L> ResourceCache<K, L>
where
    K: Eq + Hash + 'static,
    L: Loader<K>,
    L::Resource: 'static,
{
    pub fn new(config: CacheConfig, loader: L) -> Self {
        Self::with_clock_and_hasher(config, loader, MonotonicClock, RandomState::new())
    }
}

impl<K, L, C> ResourceCache<K, L, C>
where
    K: Eq + Hash + 'static,
    L: Loader<K>,
    L::Resource: 'static,
    C: Clock + 'static,
{
    pub fn with_clock(config: CacheConfig, loader: L, clock: C) -> Self {
        Self::with_clock_and_hasher(config, loader, clock, RandomState::new())
    }
}

impl<K, L, C, S> ResourceCache<K, L, C, S>
where
    K: Eq + Hash + 'static,
    L: Loader<K>,
    L::Resource: 'static,
    C: Clock + 'static,
    S: BuildHasher + 'static,
{
    pub fn with_clock_and_hasher(config: CacheConfig, loader: L, clock: C, hasher: S) -> Self {
        let state = CacheState {
            entries: EntryTable::with_capacity_and_hasher(config.capacity, hasher),
            free: FreeList::default(),
        };
        Self {
            core: Rc::new(CacheCore {
                state: RefCell::new(state),
                clock,
                window: config.eviction_window,
            }),
            loader,
        }
    }

    /// Return a handle to the resource for `key`, building it on a miss.
    ///
    /// A hit shares the existing root; if the entry was parked it becomes
    /// live again and leaves the free order. A miss calls the loader once;
    /// if the loader fails its error is returned and nothing is cached.
    /// Either way a sweep runs before returning.
    pub fn get<Q>(&mut self, key: &Q) -> Result<Handle<L::Resource>, L::Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + ToOwned<Owned = K>,
    {
        let hit = self.core.lookup(key);
        let handle = match hit {
            // SAFETY: the entry owns the root and nothing has run since the
            // lookup that could have removed it.
            Some(ptr) => unsafe { Handle::acquire(ptr) },
            None => {
                let key = key.to_owned();
                let value = self.loader.load(&key)?;
                self.core.admit(key, value)
            }
        };
        self.core.sweep();
        Ok(handle)
    }

    /// Evict every parked entry whose parking age has reached the eviction
    /// window. Returns how many entries were evicted.
    ///
    /// Scans from the longest-parked entry and stops at the first one still
    /// inside the window.
    pub fn sweep(&mut self) -> usize {
        self.core.sweep()
    }

    /// Forget every entry, parked or live.
    ///
    /// Parked resources are destroyed. Resources that still have handles are
    /// not: those handles stay valid and the last one to drop destroys the
    /// resource. The cache no longer knows about them, so a later `get` for
    /// the same key builds a second, independent resource while the old one
    /// may still be in use.
    pub fn clear(&mut self) {
        self.core.clear()
    }

    /// Number of entries, live or parked.
    pub fn len(&self) -> usize {
        self.core.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of parked entries awaiting eviction.
    pub fn parked_len(&self) -> usize {
        self.core.state.borrow().free.len()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.core.state.borrow().entries.find(key).is_some()
    }

    pub fn eviction_window(&self) -> Duration {
        self.core.window
    }

    pub fn clock(&self) -> &C {
        &self.core.clock
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}

impl<K, L, C, S> fmt::Debug for ResourceCache<K, L, C, S>
where
    L: Loader<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ResourceCache");
        if let Ok(state) = self.core.state.try_borrow() {
            d.field("len", &state.entries.len());
            d.field("parked", &state.free.len());
        }
        d.field("eviction_window", &self.core.window).finish()
    }
}

impl<K, T, C, S> CacheCore<K, T, C, S>
where
    K: Eq + Hash + 'static,
    T: 'static,
    C: Clock + 'static,
    S: BuildHasher + 'static,
{
    fn lookup<Q>(&self, key: &Q) -> Option<SharePtr<T>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let state = self.state.borrow();
        let id = state.entries.find(key)?;
        state.entries.get(id).map(|e| e.root.share_ptr())
    }

    fn admit(self: &Rc<Self>, key: K, value: T) -> Handle<T> {
        let sink: Weak<dyn ReleaseSink> = Rc::downgrade(self) as Weak<dyn ReleaseSink>;
        let mut first: Option<(SharePtr<T>, Token)> = None;
        let inserted = self.state.borrow_mut().entries.insert_with(key, |id| {
            let (root, ptr, token) = RootOwner::new(value, Hook::cached(sink, id));
            first = Some((ptr, token));
            Entry { root, parked: None }
        });
        match inserted {
            Ok(id) => tracing::debug!(?id, "cache miss, resource constructed"),
            Err(InsertError::DuplicateKey) => panic!("cache miss for a key that is already cached"),
        }
        let (ptr, token) = first.expect("entry must exist immediately after successful insert");
        Handle::from_share(ptr, token)
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        // Unlink under the borrow, destroy after it: dropping a resource may
        // release handles into this cache.
        let evicted = {
            let mut state = self.state.borrow_mut();
            let CacheState { entries, free } = &mut *state;
            let mut evicted = Vec::new();
            while let Some((id, parked_at)) = free.back() {
                if now.saturating_duration_since(parked_at) < self.window {
                    break;
                }
                free.pop_back();
                let (key, entry) = entries
                    .remove(id)
                    .expect("parked entry must be present in the table");
                debug_assert_eq!(entry.root.use_count(), 0);
                evicted.push((key, entry.root));
            }
            evicted
        };
        let n = evicted.len();
        if n > 0 {
            tracing::debug!(evicted = n, "swept stale entries");
        }
        drop(evicted);
        n
    }

    fn clear(&self) {
        let (keys, parked) = {
            let mut state = self.state.borrow_mut();
            state.free.clear();
            let mut keys = Vec::new();
            let mut parked = Vec::new();
            for (key, entry) in state.entries.take_all() {
                keys.push(key);
                // Live roots go to their handles before anything is dropped.
                if let Some(root) = entry.root.hand_off() {
                    parked.push(root);
                }
            }
            (keys, parked)
        };
        tracing::debug!(
            entries = keys.len(),
            destroyed = parked.len(),
            "cache cleared"
        );
        drop(parked);
        drop(keys);
    }
}

impl<K, T, C, S> ReleaseSink for CacheCore<K, T, C, S>
where
    K: Eq + Hash + 'static,
    T: 'static,
    C: Clock + 'static,
    S: BuildHasher + 'static,
{
    fn parked(&self, id: EntryId) {
        let now = self.clock.now();
        let mut state = self.state.borrow_mut();
        let CacheState { entries, free } = &mut *state;
        let entry = match entries.get_mut(id) {
            Some(entry) => entry,
            None => panic!("release notification for an entry the cache does not hold"),
        };
        assert!(entry.parked.is_none(), "entry parked twice");
        entry.parked = Some(free.push_front(id, now));
        tracing::trace!(?id, "entry parked");
    }

    fn reacquired(&self, id: EntryId) {
        let mut state = self.state.borrow_mut();
        let CacheState { entries, free } = &mut *state;
        let slot = match entries.get_mut(id).and_then(|e| e.parked.take()) {
            Some(slot) => slot,
            None => panic!("reacquired an entry that was not parked"),
        };
        let unlinked = free.remove(slot);
        assert_eq!(unlinked, Some(id), "free order out of sync with entries");
        tracing::trace!(?id, "entry reacquired");
    }
}
