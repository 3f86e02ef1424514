//! BucketHashMap: fixed bucket array, separate chaining, checked positions.

use crate::position::{Position, PositionError};
use crate::reentrancy::ReentrancyCheck;
use core::borrow::Borrow;
use core::cell::Cell;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use log::{debug, trace};
use slotmap::{DefaultKey, SlotMap};

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    next: Option<DefaultKey>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Bucket {
    head: Option<DefaultKey>,
    len: usize,
    generation: u64,
}

/// Result of a chain walk: the matching slot and the slot linking to it.
#[derive(Clone, Copy)]
struct Link {
    ordinal: usize,
    slot: DefaultKey,
    prev: Option<DefaultKey>,
}

thread_local! {
    // Shared by every map on the thread and never reset, so no two buckets,
    // in one map or across maps, ever carry the same stamp. Maps are !Send,
    // so a map only ever draws from one thread's counter.
    static STAMPS: Cell<u64> = const { Cell::new(0) };
}

fn next_stamp() -> u64 {
    STAMPS.with(|s| {
        let stamp = s.get() + 1;
        s.set(stamp);
        stamp
    })
}

/// Structural state, kept apart from the hasher and reentrancy check so
/// relinking can borrow it mutably while an entry guard is held.
struct Table<K, V, const N: usize> {
    buckets: Option<Box<[Bucket]>>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
}

impl<K, V, const N: usize> Table<K, V, N> {
    fn new() -> Self {
        Self {
            buckets: None,
            nodes: SlotMap::with_key(),
        }
    }

    fn bucket(&self, bucket: usize) -> Option<&Bucket> {
        self.buckets.as_deref().and_then(|b| b.get(bucket))
    }

    fn chain(&self, head: Option<DefaultKey>) -> Chain<'_, K, V> {
        Chain {
            nodes: &self.nodes,
            cursor: head,
        }
    }

    fn push_front(&mut self, bucket: usize, key: K, value: V) -> Position {
        let stamp = next_stamp();
        let buckets = self.buckets.get_or_insert_with(|| {
            trace!("allocating bucket array ({} buckets)", N);
            vec![Bucket::default(); N].into_boxed_slice()
        });
        let b = &mut buckets[bucket];
        let slot = self.nodes.insert(Node {
            key,
            value,
            next: b.head,
        });
        b.head = Some(slot);
        b.len += 1;
        b.generation = stamp;
        Position::new(bucket, 0, stamp)
    }

    fn find_in(&self, bucket: usize, mut matches: impl FnMut(&K) -> bool) -> Option<Link> {
        let head = self.bucket(bucket)?.head;
        let mut prev = None;
        for (ordinal, (slot, node)) in self.chain(head).enumerate() {
            if matches(&node.key) {
                return Some(Link {
                    ordinal,
                    slot,
                    prev,
                });
            }
            prev = Some(slot);
        }
        None
    }

    fn resolve(&self, pos: Position) -> Result<Link, PositionError> {
        let buckets = self.buckets.as_deref().ok_or(PositionError::Unallocated)?;
        let b = buckets
            .get(pos.primary_index())
            .ok_or(PositionError::BucketOutOfRange {
                bucket: pos.primary_index(),
                buckets: N,
            })?;
        if b.generation != pos.generation() {
            return Err(PositionError::Stale {
                bucket: pos.primary_index(),
            });
        }
        let out_of_range = PositionError::OrdinalOutOfRange {
            ordinal: pos.secondary_index(),
            len: b.len,
        };
        if pos.secondary_index() >= b.len {
            return Err(out_of_range);
        }
        let mut prev = None;
        for (ordinal, (slot, _)) in self.chain(b.head).enumerate() {
            if ordinal == pos.secondary_index() {
                return Ok(Link {
                    ordinal,
                    slot,
                    prev,
                });
            }
            prev = Some(slot);
        }
        Err(out_of_range)
    }

    fn checked(&self, pos: Position) -> Result<Link, PositionError> {
        self.resolve(pos).map_err(|e| {
            debug!("rejected {pos:?}: {e}");
            e
        })
    }

    /// Relinks around `link.slot` and only then frees it, so a failed lookup
    /// leaves the chain, the arena and `len` untouched.
    fn unlink(&mut self, bucket: usize, link: Link) -> Option<(K, V)> {
        let next = self.nodes.get(link.slot)?.next;
        let b = self.buckets.as_deref_mut()?.get_mut(bucket)?;
        match link.prev {
            Some(prev) => self.nodes.get_mut(prev)?.next = next,
            None => b.head = next,
        }
        b.len -= 1;
        b.generation = next_stamp();
        let node = self.nodes.remove(link.slot)?;
        Some((node.key, node.value))
    }

    /// Detaches every node and the bucket array, handing the nodes back so
    /// they are dropped only once the table is consistent again.
    fn take_all(&mut self) -> SlotMap<DefaultKey, Node<K, V>> {
        self.buckets = None;
        core::mem::replace(&mut self.nodes, SlotMap::with_key())
    }
}

struct Chain<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    cursor: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (DefaultKey, &'a Node<K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = self.nodes.get(slot)?;
        self.cursor = node.next;
        Some((slot, node))
    }
}

/// A hash map with a fixed number of buckets `N` and one chain per bucket.
///
/// - `hash(key) % N` picks the bucket; the bucket array is never resized and
///   entries never move between buckets.
/// - New entries go to the head of their chain, so within a bucket the most
///   recently pushed entry comes first. Across buckets no order is promised
///   beyond "bucket 0 first" in exports.
/// - Duplicate keys are allowed. Every key-based operation acts on the first
///   match in chain order.
/// - The bucket array is allocated by the first `push` and released by
///   `clear`.
///
/// Nodes live in a generational arena; chain links are arena keys, so a
/// removal frees its slot for reuse without any pointer juggling.
pub struct BucketHashMap<K, V, const N: usize, S = DefaultHashBuilder> {
    hasher: S,
    table: Table<K, V, N>,
    reentrancy: ReentrancyCheck,
}

impl<K, V, const N: usize> BucketHashMap<K, V, N>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V, const N: usize, S> Default for BucketHashMap<K, V, N, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

/// Iterator over entries in export order: buckets in array order, each
/// chain from its head.
pub struct Iter<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    buckets: &'a [Bucket],
    bucket: usize,
    ordinal: usize,
    cursor: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Position, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(slot) = self.cursor {
                let node = self.nodes.get(slot)?;
                let generation = self.buckets[self.bucket].generation;
                let pos = Position::new(self.bucket, self.ordinal, generation);
                self.cursor = node.next;
                self.ordinal += 1;
                self.remaining = self.remaining.saturating_sub(1);
                return Some((pos, &node.key, &node.value));
            }
            self.bucket += 1;
            self.cursor = self.buckets.get(self.bucket)?.head;
            self.ordinal = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over mutable values. Order is arena order, not export order.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Node<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| (&n.key, &mut n.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V, const N: usize, S> BucketHashMap<K, V, N, S> {
    const HAS_BUCKETS: () = assert!(N > 0, "BucketHashMap needs at least one bucket");

    pub fn with_hasher(hasher: S) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HAS_BUCKETS;
        Self {
            hasher,
            table: Table::new(),
            reentrancy: ReentrancyCheck::new(),
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.table.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.nodes.is_empty()
    }

    /// Number of buckets, fixed for the lifetime of the map.
    pub const fn bucket_count(&self) -> usize {
        N
    }

    /// Whether the bucket array currently exists.
    pub fn is_allocated(&self) -> bool {
        self.table.buckets.is_some()
    }

    /// Entries per bucket. Unbounded, since the map never grows.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / N as f64
    }

    /// Length of the chain in `bucket`; 0 for unallocated or out-of-range buckets.
    pub fn chain_len(&self, bucket: usize) -> usize {
        self.table.bucket(bucket).map_or(0, |b| b.len)
    }

    pub fn longest_chain(&self) -> usize {
        self.table
            .buckets
            .as_deref()
            .map_or(0, |b| b.iter().map(|b| b.len).max().unwrap_or(0))
    }

    pub fn key_at(&self, pos: Position) -> Option<&K> {
        let _g = self.reentrancy.enter("key_at");
        let link = self.table.checked(pos).ok()?;
        self.table.nodes.get(link.slot).map(|n| &n.key)
    }

    pub fn value_at(&self, pos: Position) -> Option<&V> {
        let _g = self.reentrancy.enter("value_at");
        let link = self.table.checked(pos).ok()?;
        self.table.nodes.get(link.slot).map(|n| &n.value)
    }

    /// Mutable access by position. Updating a value is not a structural
    /// change and leaves outstanding positions valid.
    pub fn value_at_mut(&mut self, pos: Position) -> Option<&mut V> {
        let _g = self.reentrancy.enter("value_at_mut");
        let link = self.table.checked(pos).ok()?;
        self.table.nodes.get_mut(link.slot).map(|n| &mut n.value)
    }

    /// Removes the entry at `pos`, returning it, or explains why `pos` does
    /// not name a live entry.
    pub fn try_remove_at(&mut self, pos: Position) -> Result<(K, V), PositionError> {
        let _g = self.reentrancy.enter("remove_at");
        let link = self.table.checked(pos)?;
        self.table
            .unlink(pos.primary_index(), link)
            .ok_or(PositionError::Stale {
                bucket: pos.primary_index(),
            })
    }

    /// Removes the entry at `pos`. Returns `false`, changing nothing, when
    /// `pos` is stale or out of range.
    pub fn remove_at(&mut self, pos: Position) -> bool {
        self.try_remove_at(pos).is_ok()
    }

    /// Drops every entry and the bucket array; the map is as if new.
    pub fn clear(&mut self) {
        if self.table.buckets.is_none() {
            return;
        }
        trace!("clearing {} entries from {} buckets", self.len(), N);
        let nodes = self.table.take_all();
        drop(nodes);
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        let buckets = self.table.buckets.as_deref().unwrap_or(&[]);
        Iter {
            nodes: &self.table.nodes,
            buckets,
            bucket: 0,
            ordinal: 0,
            cursor: buckets.first().and_then(|b| b.head),
            remaining: self.len(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.table.nodes.iter_mut(),
        }
    }

    /// Copies the contents into two aligned lists, `values[i]` belonging to
    /// `keys[i]`, in export order. Both lists are cleared first.
    pub fn collect_into(&self, values: &mut Vec<V>, keys: &mut Vec<K>)
    where
        K: Clone,
        V: Clone,
    {
        values.clear();
        keys.clear();
        values.reserve(self.len());
        keys.reserve(self.len());
        for (_, k, v) in self.iter() {
            values.push(v.clone());
            keys.push(k.clone());
        }
    }

    /// Snapshot of the contents as `(values, keys)`; see [`Self::collect_into`].
    pub fn to_lists(&self) -> (Vec<V>, Vec<K>)
    where
        K: Clone,
        V: Clone,
    {
        let mut values = Vec::new();
        let mut keys = Vec::new();
        self.collect_into(&mut values, &mut keys);
        (values, keys)
    }
}

impl<K, V, const N: usize, S> BucketHashMap<K, V, N, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn bucket_of<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized + Hash,
    {
        (self.hasher.hash_one(q) % N as u64) as usize
    }

    fn locate<Q>(&self, q: &Q) -> Option<(usize, Link)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if !self.is_allocated() {
            return None;
        }
        let bucket = self.bucket_of(q);
        let link = self.table.find_in(bucket, |k| <K as Borrow<Q>>::borrow(k) == q)?;
        Some((bucket, link))
    }

    /// Adds an entry at the head of its bucket's chain. Existing entries with
    /// an equal key are kept and shadowed. Returns the new entry's position.
    pub fn push(&mut self, key: K, value: V) -> Position {
        let _g = self.reentrancy.enter("push");
        let bucket = self.bucket_of(&key);
        self.table.push_front(bucket, key, value)
    }

    pub fn peek<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("peek");
        let (_, link) = self.locate(q)?;
        self.table.nodes.get(link.slot).map(|n| &n.value)
    }

    pub fn peek_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("peek_mut");
        let (_, link) = self.locate(q)?;
        self.table.nodes.get_mut(link.slot).map(|n| &mut n.value)
    }

    /// Removes the first entry matching `q` and returns its value.
    pub fn pop<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        // The key is dropped after the guard so its Drop may use the map.
        let (_key, value) = self.pop_entry(q)?;
        Some(value)
    }

    pub fn pop_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("pop");
        let (bucket, link) = self.locate(q)?;
        self.table.unlink(bucket, link)
    }

    /// Removes the first entry matching `q`. Same as `index_of` followed by
    /// `remove_at`.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.index_of(q) {
            Some(pos) => self.remove_at(pos),
            None => false,
        }
    }

    /// Position of the first entry matching `q`, valid until its bucket is
    /// next modified.
    pub fn index_of<Q>(&self, q: &Q) -> Option<Position>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("index_of");
        let (bucket, link) = self.locate(q)?;
        let generation = self.table.bucket(bucket)?.generation;
        Some(Position::new(bucket, link.ordinal, generation))
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.index_of(q).is_some()
    }
}

impl<K, V, const N: usize, S> Extend<(K, V)> for BucketHashMap<K, V, N, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.push(k, v);
        }
    }
}

impl<K, V, const N: usize, S> FromIterator<(K, V)> for BucketHashMap<K, V, N, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::with_hasher(S::default());
        m.extend(iter);
        m
    }
}

impl<K, V, const N: usize, S> fmt::Debug for BucketHashMap<K, V, N, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, k, v)| (k, v)))
            .finish()
    }
}

impl<'a, K, V, const N: usize, S> IntoIterator for &'a BucketHashMap<K, V, N, S> {
    type Item = (Position, &'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
