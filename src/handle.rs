//! `Handle<T>`: a counted, clonable reference to a shared root.

use crate::error::NullHandle;
use crate::hook::Hook;
use crate::root::{self, SharePtr};
use crate::tokens::Token;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;
use std::any::Any;

struct Share<T: ?Sized> {
    ptr: SharePtr<T>,
    token: Token,
}

/// A reference to a shared resource, or null.
///
/// Cloning increments the root's count and dropping decrements it. What
/// happens when the count reaches zero depends on the root's hook: a handle
/// created with [`Handle::new`] destroys the resource immediately, a handle
/// issued by [`ResourceCache`](crate::ResourceCache) parks the entry instead.
///
/// Handles are `!Send` and `!Sync`; counts are not atomic.
pub struct Handle<T: ?Sized> {
    share: Option<Share<T>>,
    _owns: PhantomData<T>,
}

impl<T: 'static> Handle<T> {
    /// Wrap `value` in a fresh root owned only by handles.
    ///
    /// Handles carry no lifetime, so the resource must not borrow anything.
    pub fn new(value: T) -> Self {
        let (ptr, token) = root::allocate(value, Hook::Detached);
        Self::from_share(ptr, token)
    }
}

impl<T: ?Sized> Handle<T> {
    /// A handle that references nothing.
    pub const fn null() -> Self {
        Self {
            share: None,
            _owns: PhantomData,
        }
    }

    pub(crate) fn from_share(ptr: SharePtr<T>, token: Token) -> Self {
        Self {
            share: Some(Share { ptr, token }),
            _owns: PhantomData,
        }
    }

    /// Mint a new handle for a root that is kept alive elsewhere.
    ///
    /// # Safety
    /// `ptr` must point into a live root.
    pub(crate) unsafe fn acquire(ptr: SharePtr<T>) -> Self {
        let token = root::acquire(ptr.root);
        Self::from_share(ptr, token)
    }

    pub fn is_null(&self) -> bool {
        self.share.is_none()
    }

    /// Borrow the resource, or report that the handle is null.
    pub fn try_get(&self) -> Result<&T, NullHandle> {
        match &self.share {
            // SAFETY: our token keeps the root, and so the value, alive.
            Some(share) => Ok(unsafe { share.ptr.value.as_ref() }),
            None => Err(NullHandle),
        }
    }

    /// Number of live handles sharing this root; zero for a null handle.
    pub fn use_count(&self) -> usize {
        match &self.share {
            Some(share) => unsafe { root::use_count(share.ptr.root) },
            None => 0,
        }
    }

    /// True if both handles share one root (or both are null).
    pub fn ptr_eq<U: ?Sized>(this: &Self, other: &Handle<U>) -> bool {
        this.root_ptr() == other.root_ptr()
    }

    fn root_ptr(&self) -> Option<NonNull<u8>> {
        self.share.as_ref().map(|s| s.ptr.root.cast::<u8>())
    }

    fn value_addr(&self) -> Option<NonNull<u8>> {
        self.share.as_ref().map(|s| s.ptr.value.cast::<u8>())
    }
}

impl<T: ?Sized + 'static> Handle<T> {
    /// Project to a related view of the resource that shares this root's count.
    ///
    /// Typical uses are up-casting to a trait object or exposing a field:
    ///
    /// ```
    /// use resource_cache::Handle;
    /// use std::fmt::Debug;
    ///
    /// let mesh = Handle::new((String::from("quad"), 4u32));
    /// let name: Handle<String> = mesh.map(|m| &m.0);
    /// let shown: Handle<dyn Debug> = mesh.map(|m| &m.1 as &(dyn Debug + 'static));
    /// assert_eq!(&*name, "quad");
    /// assert_eq!(mesh.use_count(), 3);
    /// drop(shown);
    /// assert_eq!(name.use_count(), 2);
    /// ```
    ///
    /// Mapping a null handle yields a null handle.
    pub fn map<U, F>(&self, f: F) -> Handle<U>
    where
        U: ?Sized + 'static,
        F: FnOnce(&T) -> &U,
    {
        self.try_map(|t| Some(f(t))).unwrap_or_else(Handle::null)
    }

    /// Like [`map`](Self::map), for projections that can fail (down-casts).
    /// Returns `None` for a null handle or when `f` declines.
    pub fn try_map<U, F>(&self, f: F) -> Option<Handle<U>>
    where
        U: ?Sized + 'static,
        F: FnOnce(&T) -> Option<&U>,
    {
        let share = self.share.as_ref()?;
        // SAFETY: our token keeps the root alive while `f` runs.
        let view = f(unsafe { share.ptr.value.as_ref() })?;
        let ptr = SharePtr {
            root: share.ptr.root,
            value: NonNull::from(view),
        };
        // SAFETY: the projection borrows from the boxed resource, which never
        // moves and lives as long as the root.
        Some(unsafe { Handle::acquire(ptr) })
    }
}

impl Handle<dyn Any> {
    /// Checked down-cast of a type-erased handle.
    pub fn downcast<U: Any>(&self) -> Option<Handle<U>> {
        self.try_map(|a| a.downcast_ref::<U>())
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        match &self.share {
            // SAFETY: our own token keeps the root alive.
            Some(share) => unsafe { Handle::acquire(share.ptr) },
            None => Handle::null(),
        }
    }
}

impl<T: ?Sized> Drop for Handle<T> {
    fn drop(&mut self) {
        if let Some(Share { ptr, token }) = self.share.take() {
            // SAFETY: the token was minted by this root and is returned once.
            unsafe { root::release(ptr.root, token) };
        }
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.try_get() {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: ?Sized> Default for Handle<T> {
    fn default() -> Self {
        Handle::null()
    }
}

impl<T: ?Sized> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.root_ptr() == other.root_ptr() && self.value_addr() == other.value_addr()
    }
}

impl<T: ?Sized> Eq for Handle<T> {}

impl<T: ?Sized> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root_ptr().hash(state);
        self.value_addr().hash(state);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_get() {
            Ok(v) => f
                .debug_struct("Handle")
                .field("value", &v)
                .field("use_count", &self.use_count())
                .finish(),
            Err(_) => f.write_str("Handle(null)"),
        }
    }
}
