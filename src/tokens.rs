//! Linear tokens and the per-root reference counter.
//!
//! Every counted reference to a root is represented by a zero-sized
//! [`Token`]. Dropping a token panics; the only valid way to dispose of it
//! is to hand it back to the counter that minted it via [`RefCount::put`].
//! This keeps increments and decrements balanced by construction.

use core::cell::Cell;
use core::marker::PhantomData;

/// Zero-sized proof that one unit was acquired from a [`RefCount`].
pub(crate) struct Token {
    // !Send + !Sync, like the counter it came from.
    _nosend: PhantomData<*mut ()>,
}

impl Token {
    #[inline]
    fn new() -> Self {
        Self {
            _nosend: PhantomData,
        }
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        // Fail fast: a token must be consumed by RefCount::put. Stay quiet
        // while already unwinding so a panic elsewhere does not abort.
        if !std::thread::panicking() {
            panic!("Token dropped without RefCount::put");
        }
    }
}

/// Outcome of acquiring a reference.
pub(crate) struct Acquired {
    pub(crate) token: Token,
    /// The count went from zero to one.
    pub(crate) revived: bool,
}

/// Single-threaded reference counter.
#[derive(Debug)]
pub(crate) struct RefCount {
    count: Cell<usize>,
}

impl RefCount {
    /// A counter that already holds one reference, returned as its token.
    ///
    /// Creating a root counts its first handle without reporting a revival.
    pub(crate) fn with_first() -> (Self, Token) {
        (
            Self {
                count: Cell::new(1),
            },
            Token::new(),
        )
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.count.get()
    }

    /// Acquire one reference.
    #[inline]
    pub(crate) fn acquire(&self) -> Acquired {
        let c = self.count.get();
        let n = c.wrapping_add(1);
        if n == 0 {
            // Follow Rc semantics: abort on overflow rather than continue unsafely.
            std::process::abort();
        }
        self.count.set(n);
        Acquired {
            token: Token::new(),
            revived: c == 0,
        }
    }

    /// Return a previously acquired token. Returns true if the count is now zero.
    #[inline]
    pub(crate) fn put(&self, t: Token) -> bool {
        core::mem::forget(t);
        let c = self.count.get();
        assert!(c > 0, "RefCount underflow");
        let n = c - 1;
        self.count.set(n);
        n == 0
    }
}
