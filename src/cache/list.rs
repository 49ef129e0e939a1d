//! Ordered entry storage shared by every cache variant.
//!
//! [`EntryList`] owns the entries of one cache: a dense `Vec` of nodes plus
//! a `HashMap` from key to node index. Nodes are threaded by index-based
//! doubly-linked lists:
//!
//! - the recency order, always kept: inserts and [`touch`](EntryList::touch)
//!   move a node to the tail, so the head is the least recently used;
//! - the expiry order, kept by expiring lists only: ascending horizon, so
//!   the head is the next entry to expire. A node with no horizon never
//!   expires and sorts after every node that has one.
//!
//! Removal uses `swap_remove`, so the last node moves into the freed slot
//! and its neighbours in both orders and its index entry are patched. Every
//! public operation leaves the map and the links describing the same set of
//! entries.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

/// One of the two orders an [`EntryList`] threads its nodes by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Order {
    Recency,
    Expiry,
}

impl Order {
    const fn slot(self) -> usize {
        match self {
            Order::Recency => 0,
            Order::Expiry => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Links {
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Ends {
    head: Option<usize>,
    tail: Option<usize>,
}

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) expires_at: Option<Instant>,
    links: [Links; 2],
}

impl<K, V> Node<K, V> {
    /// Expired at or before `now`.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// `a` expires no later than `b`; `None` is later than any instant.
fn no_later(a: Option<Instant>, b: Option<Instant>) -> bool {
    match (a, b) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(a), Some(b)) => a <= b,
    }
}

pub(crate) struct EntryList<K, V> {
    nodes: Vec<Node<K, V>>,
    index: HashMap<K, usize>,
    ends: [Ends; 2],
    expiring: bool,
}

impl<K, V> EntryList<K, V>
where
    K: Eq + Hash + Clone,
{
    /// A list kept in recency order only.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self::build(capacity, false)
    }

    /// A list kept in both recency and expiry order.
    pub(crate) fn expiring(capacity: usize) -> Self {
        Self::build(capacity, true)
    }

    fn build(capacity: usize, expiring: bool) -> Self {
        // Large capacities are limits, not expected sizes.
        let hint = capacity.min(1024);
        Self {
            nodes: Vec::with_capacity(hint),
            index: HashMap::with_capacity(hint),
            ends: [Ends::default(); 2],
            expiring,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn find(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub(crate) fn node(&self, idx: usize) -> &Node<K, V> {
        &self.nodes[idx]
    }

    pub(crate) fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        &mut self.nodes[idx]
    }

    /// Insert as the most recently used entry and, for an expiring list,
    /// at its sorted position (ties go after existing entries). `key` must
    /// not be present.
    pub(crate) fn insert(&mut self, key: K, value: V, expires_at: Option<Instant>) -> usize {
        let idx = self.nodes.len();
        self.index.insert(key.clone(), idx);
        self.nodes.push(Node {
            key,
            value,
            expires_at,
            links: [Links::default(); 2],
        });
        let tail = self.ends[Order::Recency.slot()].tail;
        self.link_after(Order::Recency, tail, idx);
        if self.expiring {
            self.link_by_expiry(idx);
        }
        idx
    }

    /// Mark a node as the most recently used.
    pub(crate) fn touch(&mut self, idx: usize) {
        let order = Order::Recency;
        let tail = self.ends[order.slot()].tail;
        if tail == Some(idx) {
            return;
        }
        self.unlink(order, idx);
        let tail = self.ends[order.slot()].tail;
        self.link_after(order, tail, idx);
    }

    /// Give a node a new horizon and relocate it to its sorted position.
    ///
    /// Scanning starts at the tail, so a horizon later than every other
    /// entry (the usual case for a refreshed entry) costs O(1).
    pub(crate) fn set_expiry(&mut self, idx: usize, expires_at: Option<Instant>) {
        self.nodes[idx].expires_at = expires_at;
        if self.expiring {
            self.unlink(Order::Expiry, idx);
            self.link_by_expiry(idx);
        }
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.find(key)?;
        Some(self.remove_at(idx).1)
    }

    /// Remove the head of `order`.
    pub(crate) fn pop_front(&mut self, order: Order) -> Option<(K, V)> {
        let idx = self.ends[order.slot()].head?;
        Some(self.remove_at(idx))
    }

    pub(crate) fn remove_at(&mut self, idx: usize) -> (K, V) {
        self.unlink(Order::Recency, idx);
        if self.expiring {
            self.unlink(Order::Expiry, idx);
        }
        let node = self.nodes.swap_remove(idx);
        self.index.remove(&node.key);
        if idx < self.nodes.len() {
            self.relink_moved(idx);
        }
        (node.key, node.value)
    }

    /// Drop expired entries from the head of the expiry order.
    pub(crate) fn purge_expired(&mut self, now: Instant) -> usize {
        let mut purged = 0;
        while let Some(idx) = self.ends[Order::Expiry.slot()].head {
            if !self.nodes[idx].is_expired(now) {
                break;
            }
            self.remove_at(idx);
            purged += 1;
        }
        purged
    }

    /// Evict from the head of `order` until at most `capacity` entries remain.
    pub(crate) fn shrink_to(&mut self, capacity: usize, order: Order) -> usize {
        let mut evicted = 0;
        while self.nodes.len() > capacity && self.pop_front(order).is_some() {
            evicted += 1;
        }
        evicted
    }

    /// Keys in expiry order for an expiring list, recency order otherwise.
    pub(crate) fn keys(&self) -> Vec<K> {
        let order = if self.expiring {
            Order::Expiry
        } else {
            Order::Recency
        };
        self.iter(order).map(|node| node.key.clone()).collect()
    }

    pub(crate) fn iter(&self, order: Order) -> Iter<'_, K, V> {
        Iter {
            list: self,
            order,
            cursor: self.ends[order.slot()].head,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.ends = [Ends::default(); 2];
    }

    fn link_by_expiry(&mut self, idx: usize) {
        let order = Order::Expiry;
        let expires_at = self.nodes[idx].expires_at;
        let mut anchor = self.ends[order.slot()].tail;
        while let Some(candidate) = anchor {
            if no_later(self.nodes[candidate].expires_at, expires_at) {
                break;
            }
            anchor = self.nodes[candidate].links[order.slot()].prev;
        }
        self.link_after(order, anchor, idx);
    }

    /// Link `idx` right after `anchor` in `order`; `None` links it at the head.
    fn link_after(&mut self, order: Order, anchor: Option<usize>, idx: usize) {
        let s = order.slot();
        let next = match anchor {
            Some(a) => self.nodes[a].links[s].next,
            None => self.ends[s].head,
        };
        self.nodes[idx].links[s] = Links { prev: anchor, next };
        match anchor {
            Some(a) => self.nodes[a].links[s].next = Some(idx),
            None => self.ends[s].head = Some(idx),
        }
        match next {
            Some(n) => self.nodes[n].links[s].prev = Some(idx),
            None => self.ends[s].tail = Some(idx),
        }
    }

    fn unlink(&mut self, order: Order, idx: usize) {
        let s = order.slot();
        let Links { prev, next } = self.nodes[idx].links[s];
        match prev {
            Some(p) => self.nodes[p].links[s].next = next,
            None => self.ends[s].head = next,
        }
        match next {
            Some(n) => self.nodes[n].links[s].prev = prev,
            None => self.ends[s].tail = prev,
        }
        self.nodes[idx].links[s] = Links::default();
    }

    /// The former last node now lives at `idx`; point its neighbours in
    /// every kept order and its index entry at the new slot.
    fn relink_moved(&mut self, idx: usize) {
        self.relink_moved_in(Order::Recency, idx);
        if self.expiring {
            self.relink_moved_in(Order::Expiry, idx);
        }
        if let Some(slot) = self.index.get_mut(&self.nodes[idx].key) {
            *slot = idx;
        }
    }

    fn relink_moved_in(&mut self, order: Order, idx: usize) {
        let s = order.slot();
        let Links { prev, next } = self.nodes[idx].links[s];
        match prev {
            Some(p) => self.nodes[p].links[s].next = Some(idx),
            None => self.ends[s].head = Some(idx),
        }
        match next {
            Some(n) => self.nodes[n].links[s].prev = Some(idx),
            None => self.ends[s].tail = Some(idx),
        }
    }
}

pub(crate) struct Iter<'a, K, V> {
    list: &'a EntryList<K, V>,
    order: Order,
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a Node<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = &self.list.nodes[idx];
        self.cursor = node.links[self.order.slot()].next;
        Some(node)
    }
}
