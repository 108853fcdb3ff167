//! Transition hooks fired when a root's count crosses zero.
//!
//! A root carries exactly one [`Hook`]:
//! - `Detached`: the root belongs to its handles. Reaching zero destroys the
//!   resource and the root on the spot.
//! - `Cached`: the root belongs to a cache entry. Reaching zero parks the
//!   entry; going back to one unparks it. The hook only knows the entry id and
//!   a non-owning reference to the cache, so there is no ownership cycle.

use crate::entry_table::EntryId;
use std::rc::Weak;

/// Receiver of park/unpark notifications; implemented by the cache core.
pub(crate) trait ReleaseSink {
    /// The entry's count dropped to zero.
    fn parked(&self, id: EntryId);
    /// The entry's count went from zero back to one.
    fn reacquired(&self, id: EntryId);
}

#[derive(Clone)]
pub(crate) struct CacheLink {
    sink: Weak<dyn ReleaseSink>,
    id: EntryId,
}

#[derive(Clone)]
pub(crate) enum Hook {
    Detached,
    Cached(CacheLink),
}

/// What the root must do after its last reference went away.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum AfterRelease {
    Destroy,
    Keep,
}

impl Hook {
    pub(crate) fn cached(sink: Weak<dyn ReleaseSink>, id: EntryId) -> Self {
        Hook::Cached(CacheLink { sink, id })
    }

    #[cfg(test)]
    pub(crate) fn is_detached(&self) -> bool {
        matches!(self, Hook::Detached)
    }

    pub(crate) fn on_released(&self) -> AfterRelease {
        match self {
            Hook::Detached => AfterRelease::Destroy,
            Hook::Cached(link) => {
                // A dead sink means the cache is mid-teardown; its entry still
                // owns the root and reclaims it.
                if let Some(sink) = link.sink.upgrade() {
                    sink.parked(link.id);
                }
                AfterRelease::Keep
            }
        }
    }

    pub(crate) fn on_reacquired(&self) {
        match self {
            // Detached roots are destroyed at zero and can never come back.
            Hook::Detached => unreachable!("detached root revived"),
            Hook::Cached(link) => {
                if let Some(sink) = link.sink.upgrade() {
                    sink.reacquired(link.id);
                }
            }
        }
    }
}
