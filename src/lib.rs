//! resource-cache: a single-threaded cache of shared resources with
//! reference-counted handles and a grace window before eviction.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: share expensive resources (meshes, textures, shader programs)
//!   between many owners, keep them for a while after the last owner lets
//!   go, and reclaim them once nobody has asked for them in time.
//! - Layers:
//!   - `tokens`: the per-root counter and the linear tokens that keep
//!     increments and decrements balanced.
//!   - `root` + `hook`: one heap block per resource holding the count, the
//!     resource and a hook that decides what happens when the count crosses
//!     zero (destroy now, or tell the owning cache).
//!   - `Handle<T>`: public counted reference to a root.
//!   - `entry_table` + `free_list`: keyed storage with stable entry ids, and
//!     the free order of parked entries (newest in front, oldest at the back).
//!   - `ResourceCache`: ties it together; parks on release, unparks on
//!     reacquire, sweeps stale entries on every `get`.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by design (no atomics, no locks).
//!   Wrap the whole cache in your own synchronization if you must share it,
//!   and keep its handles on one thread.
//! - Reference-count overflow aborts the process, matching `Rc`. Underflow
//!   is a bug and panics.
//! - O(1) average lookups; O(1) park/unpark; a sweep costs one step per
//!   evicted entry plus one.
//!
//! Drop ordering
//! - The cache never runs user code while its state is borrowed, except
//!   `K: Eq/Hash` during lookups. Entries are unlinked first and dropped
//!   afterwards, so a resource holding handles into the same cache can be
//!   evicted or cleared and its handles release normally.
//! - A hook refers to its cache through a `Weak`; when the cache is being
//!   dropped, release notifications are ignored and the cache's own
//!   teardown reclaims the roots.
//!
//! Notes and non-goals
//! - No background eviction; sweeps are driven by `get` and `sweep`.
//! - Handles give shared access only; use interior mutability inside `T`
//!   if a resource must change in place.
//!
//! Handles cannot leave their thread:
//!
//! ```compile_fail
//! fn assert_send<T: Send>() {}
//! assert_send::<resource_cache::Handle<u32>>();
//! ```
//!
//! Handles carry no lifetime, so neither a resource nor a projection of it
//! may borrow from the caller's stack:
//!
//! ```compile_fail
//! use resource_cache::Handle;
//!
//! fn escape() -> Handle<Vec<u64>> {
//!     let local = vec![1u64, 2, 3];
//!     let outer = Handle::new(&local);
//!     outer.map(|r| *r)
//! }
//! ```

mod cache;
mod clock;
mod config;
mod entry_table;
mod error;
mod free_list;
mod handle;
mod hook;
mod loader;
mod root;
mod tokens;

// Public surface
pub use cache::ResourceCache;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{CacheConfig, DEFAULT_EVICTION_WINDOW};
pub use error::NullHandle;
pub use handle::Handle;
pub use loader::Loader;
