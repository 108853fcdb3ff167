//! Free-order list of parked entries.
//!
//! A doubly linked list whose nodes live in a `SlotMap` and link to each
//! other by [`FreeSlot`] ids. New parkings go to the front, so the back
//! always holds the entry that has been parked the longest.
//!
//! ```text
//!   front (newest)                                   back (oldest)
//!   head ─► [id_3, t3] ◄──► [id_2, t2] ◄──► [id_1, t1] ◄── tail
//!                                            t1 <= t2 <= t3
//! ```
//!
//! - `push_front`: O(1), returns the node id the entry stores
//! - `remove(id)`: O(1)
//! - `back` / `pop_back`: O(1)

use crate::entry_table::EntryId;
use slotmap::SlotMap;
use std::time::Instant;

slotmap::new_key_type! {
    /// Position of a parked entry inside the free-order list.
    pub(crate) struct FreeSlot;
}

#[derive(Debug)]
struct Node {
    entry: EntryId,
    parked_at: Instant,
    prev: Option<FreeSlot>,
    next: Option<FreeSlot>,
}

#[derive(Debug, Default)]
pub(crate) struct FreeList {
    nodes: SlotMap<FreeSlot, Node>,
    head: Option<FreeSlot>,
    tail: Option<FreeSlot>,
}

impl FreeList {
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn push_front(&mut self, entry: EntryId, parked_at: Instant) -> FreeSlot {
        let old_head = self.head;
        let slot = self.nodes.insert(Node {
            entry,
            parked_at,
            prev: None,
            next: old_head,
        });
        match old_head {
            Some(h) => self.nodes[h].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        slot
    }

    /// The entry parked the longest, with its parking time.
    pub(crate) fn back(&self) -> Option<(EntryId, Instant)> {
        let node = &self.nodes[self.tail?];
        Some((node.entry, node.parked_at))
    }

    pub(crate) fn pop_back(&mut self) -> Option<EntryId> {
        let tail = self.tail?;
        self.remove(tail)
    }

    /// Unlink a node. Returns `None` if the slot is not in the list.
    pub(crate) fn remove(&mut self, slot: FreeSlot) -> Option<EntryId> {
        let node = self.nodes.remove(slot)?;
        match node.prev {
            Some(p) => self.nodes[p].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.nodes[n].prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node.entry)
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    /// Entry ids from back (oldest) to front (newest).
    #[cfg(test)]
    fn oldest_first(&self) -> Vec<EntryId> {
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.tail;
        while let Some(slot) = cur {
            let node = &self.nodes[slot];
            out.push(node.entry);
            cur = node.prev;
        }
        out
    }
}
