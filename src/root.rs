//! Heap-allocated root blocks shared by handles.
//!
//! A root is a single allocation holding the reference count, the hook and
//! the resource. Handles keep two pointers into it: a type-erased pointer to
//! the header (for counting and hook dispatch) and a pointer to the resource
//! or to a projection of it. Because the header carries its own destructor,
//! a `Handle<U>` projected from a `Handle<T>` can release the root without
//! knowing `T`.
//!
//! Ownership rules
//! - Detached roots are owned collectively by their handles; the last
//!   release destroys the allocation.
//! - Cached roots are owned by exactly one [`RootOwner`] stored in a cache
//!   entry. Releasing the last handle leaves the allocation in place. When
//!   the owner is dropped it destroys the root if no handle remains, or
//!   rewrites the hook to `Detached` and hands ownership to the handles.

use crate::hook::{AfterRelease, Hook};
use crate::tokens::{RefCount, Token};
use core::cell::RefCell;
use core::marker::PhantomData;
use core::ptr::NonNull;

pub(crate) struct RootHeader {
    refs: RefCount,
    hook: RefCell<Hook>,
    destroy: unsafe fn(NonNull<RootHeader>),
}

// `repr(C)` pins the header at offset zero so a header pointer can be cast
// back to the full box.
#[repr(C)]
struct RootBox<T> {
    header: RootHeader,
    value: T,
}

unsafe fn destroy_box<T>(header: NonNull<RootHeader>) {
    drop(Box::from_raw(header.cast::<RootBox<T>>().as_ptr()));
}

/// Pointers a handle needs to share a root.
pub(crate) struct SharePtr<T: ?Sized> {
    pub(crate) root: NonNull<RootHeader>,
    pub(crate) value: NonNull<T>,
}

impl<T: ?Sized> Clone for SharePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: ?Sized> Copy for SharePtr<T> {}

/// Allocate a root with a count of one and return its first token.
pub(crate) fn allocate<T>(value: T, hook: Hook) -> (SharePtr<T>, Token) {
    let (refs, token) = RefCount::with_first();
    let boxed = Box::new(RootBox {
        header: RootHeader {
            refs,
            hook: RefCell::new(hook),
            destroy: destroy_box::<T>,
        },
        value,
    });
    let raw = Box::into_raw(boxed);
    // SAFETY: `raw` comes from Box::into_raw and is non-null.
    let value = unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*raw).value)) };
    let root = unsafe { NonNull::new_unchecked(raw) }.cast::<RootHeader>();
    (SharePtr { root, value }, token)
}

/// Acquire one reference, running the reacquire hook on a zero-to-one move.
///
/// # Safety
/// `root` must point to a live root.
pub(crate) unsafe fn acquire(root: NonNull<RootHeader>) -> Token {
    let header = root.as_ref();
    let acquired = header.refs.acquire();
    if acquired.revived {
        let hook = header.hook.borrow().clone();
        hook.on_reacquired();
    }
    acquired.token
}

/// Return one reference, running the release hook when the count hits zero.
///
/// # Safety
/// `root` must point to a live root and `token` must have been minted by it.
pub(crate) unsafe fn release(root: NonNull<RootHeader>, token: Token) {
    let destroy = {
        let header = root.as_ref();
        if !header.refs.put(token) {
            return;
        }
        let hook = header.hook.borrow().clone();
        match hook.on_released() {
            AfterRelease::Destroy => header.destroy,
            AfterRelease::Keep => return,
        }
    };
    destroy(root);
}

/// # Safety
/// `root` must point to a live root.
pub(crate) unsafe fn use_count(root: NonNull<RootHeader>) -> usize {
    root.as_ref().refs.get()
}

/// Exclusive owner of a cache-bound root.
pub(crate) struct RootOwner<T> {
    ptr: SharePtr<T>,
    _owns: PhantomData<T>,
}

impl<T> RootOwner<T> {
    /// Allocate a root owned by a cache entry, plus its first reference.
    pub(crate) fn new(value: T, hook: Hook) -> (Self, SharePtr<T>, Token) {
        let (ptr, token) = allocate(value, hook);
        (
            Self {
                ptr,
                _owns: PhantomData,
            },
            ptr,
            token,
        )
    }

    pub(crate) fn share_ptr(&self) -> SharePtr<T> {
        self.ptr
    }

    pub(crate) fn use_count(&self) -> usize {
        // SAFETY: the owner keeps the root alive.
        unsafe { use_count(self.ptr.root) }
    }

    /// Give the root to its handles if any exist. With no handles left the
    /// owner comes back, and dropping it destroys the root.
    pub(crate) fn hand_off(self) -> Option<Self> {
        if self.use_count() == 0 {
            return Some(self);
        }
        // SAFETY: the owner keeps the root alive until this point.
        let header = unsafe { self.ptr.root.as_ref() };
        *header.hook.borrow_mut() = Hook::Detached;
        core::mem::forget(self);
        None
    }
}

impl<T> Drop for RootOwner<T> {
    fn drop(&mut self) {
        // SAFETY: the owner keeps the root alive until this point.
        let header = unsafe { self.ptr.root.as_ref() };
        if header.refs.get() == 0 {
            let destroy = header.destroy;
            unsafe { destroy(self.ptr.root) };
        } else {
            // Outstanding handles take over; the last one destroys the root.
            *header.hook.borrow_mut() = Hook::Detached;
        }
    }
}
