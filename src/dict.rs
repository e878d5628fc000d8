//! Dict: byte-keyed separate-chaining table over a generational node arena.

use crate::config::Config;
use crate::error::DictError;
use crate::hash::{key_equals, JenkinsState};
use core::fmt;
use core::hash::{BuildHasher, Hasher};
use core::iter::FusedIterator;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct NodeKey;
}

#[derive(Clone, Debug)]
struct Node<V> {
    key: Box<[u8]>,
    value: V,
    hash: u64, // computed once on insert, reused by resize
    next: Option<NodeKey>,
}

/// Chain-shape snapshot returned by [`Dict::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub len: usize,
    pub capacity: usize,
    pub size_class: usize,
    pub occupied_buckets: usize,
    pub longest_chain: usize,
}

/// Hash table mapping byte-string keys to values of type `V`.
///
/// Keys are copied into owned storage on insert. Each bucket holds the head
/// of a singly linked chain threaded through the node arena; new keys are
/// appended at the chain tail. The bucket array only grows, one size class
/// at a time, when an insert would cross the configured load limit.
#[derive(Clone)]
pub struct Dict<V, S = JenkinsState> {
    hasher: S,
    config: Config,
    buckets: Vec<Option<NodeKey>>,
    nodes: SlotMap<NodeKey, Node<V>>,
    size_class: usize,
}

#[inline]
fn bucket_for(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

fn alloc_buckets(capacity: usize) -> Result<Vec<Option<NodeKey>>, DictError> {
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(|_| DictError::OutOfMemory)?;
    buckets.resize(capacity, None);
    Ok(buckets)
}

fn copy_key(key: &[u8]) -> Result<Box<[u8]>, DictError> {
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(key.len())
        .map_err(|_| DictError::OutOfMemory)?;
    owned.extend_from_slice(key);
    Ok(owned.into_boxed_slice())
}

impl<V> Dict<V> {
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Like [`Dict::new`], but reports a failed bucket-array allocation
    /// instead of aborting.
    pub fn try_new() -> Result<Self, DictError> {
        Self::try_with_config(Config::new())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_config_and_hasher(config, JenkinsState)
    }

    pub fn try_with_config(config: Config) -> Result<Self, DictError> {
        Self::try_with_config_and_hasher(config, JenkinsState)
    }
}

impl<V> Default for Dict<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> Dict<V, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config_and_hasher(Config::new(), hasher)
    }

    pub fn with_config_and_hasher(config: Config, hasher: S) -> Self {
        let capacity = config.capacity_of(0);
        Self {
            hasher,
            config,
            buckets: vec![None; capacity],
            nodes: SlotMap::with_key(),
            size_class: 0,
        }
    }

    pub fn try_with_config_and_hasher(config: Config, hasher: S) -> Result<Self, DictError> {
        let buckets = alloc_buckets(config.capacity_of(0))?;
        Ok(Self {
            hasher,
            config,
            buckets,
            nodes: SlotMap::with_key(),
            size_class: 0,
        })
    }

    fn hash_key(&self, key: &[u8]) -> u64 {
        let mut h = self.hasher.build_hasher();
        h.write(key);
        h.finish()
    }

    /// Walk one chain from `head`, yielding node keys with their nodes.
    fn chain(&self, head: Option<NodeKey>) -> impl Iterator<Item = (NodeKey, &Node<V>)> + '_ {
        let mut cur = head;
        core::iter::from_fn(move || {
            let k = cur?;
            let node = self.nodes.get(k)?;
            cur = node.next;
            Some((k, node))
        })
    }

    fn find(&self, key: &[u8]) -> Option<NodeKey> {
        let hash = self.hash_key(key);
        let head = self.buckets[bucket_for(hash, self.buckets.len())];
        self.chain(head)
            .find(|(_, n)| n.hash == hash && key_equals(&n.key, key))
            .map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Index of the current capacity in the configured size-class sequence.
    pub fn size_class(&self) -> usize {
        self.size_class
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let k = self.find(key)?;
        self.nodes.get(k).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let k = self.find(key)?;
        self.nodes.get_mut(k).map(|n| &mut n.value)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Insert or overwrite `key`. Returns the previous value on overwrite.
    ///
    /// The load check runs before the lookup, so a call that would cross the
    /// load limit grows the table first even when `key` is already present.
    /// On error no entry has been added, replaced or removed; the table may
    /// already have grown if the failure came after the resize.
    pub fn set(&mut self, key: &[u8], value: V) -> Result<Option<V>, DictError> {
        if self.config.over_limit(self.capacity(), self.len() + 1) {
            self.grow()?;
        }

        let hash = self.hash_key(key);
        let bucket = bucket_for(hash, self.buckets.len());
        let mut tail = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let node = &mut self.nodes[k];
            if node.hash == hash && key_equals(&node.key, key) {
                return Ok(Some(core::mem::replace(&mut node.value, value)));
            }
            tail = Some(k);
            cur = node.next;
        }

        let node = Node {
            key: copy_key(key)?,
            value,
            hash,
            next: None,
        };
        let k = self.nodes.insert(node);
        match tail {
            Some(t) => self.nodes[t].next = Some(k),
            None => self.buckets[bucket] = Some(k),
        }
        Ok(None)
    }

    /// Remove `key`, returning its value.
    pub fn pop(&mut self, key: &[u8]) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Remove `key`, returning the stored key copy and its value.
    pub fn remove_entry(&mut self, key: &[u8]) -> Option<(Box<[u8]>, V)> {
        let hash = self.hash_key(key);
        let bucket = bucket_for(hash, self.buckets.len());
        let mut prev: Option<NodeKey> = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if node.hash == hash && key_equals(&node.key, key) {
                let next = node.next;
                match prev {
                    Some(p) => self.nodes[p].next = next,
                    None => self.buckets[bucket] = next,
                }
                let node = self.nodes.remove(k)?;
                return Some((node.key, node.value));
            }
            prev = cur;
            cur = node.next;
        }
        None
    }

    /// Drop every entry. The size class is kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.buckets.fill(None);
    }

    /// Move to the next size class and relink every node.
    ///
    /// Old buckets are walked in index order and each chain front to back,
    /// appending to the tail of the new chain, so relative order within a
    /// new bucket follows the old traversal. Both new arrays are allocated
    /// before any link changes.
    fn grow(&mut self) -> Result<(), DictError> {
        let next_class = self.size_class + 1;
        if next_class > self.config.last_class() {
            return Err(DictError::CapacityExhausted {
                size_class: self.size_class,
                capacity: self.capacity(),
            });
        }
        let capacity = self.config.capacity_of(next_class);
        let mut buckets = alloc_buckets(capacity)?;
        let mut tails = alloc_buckets(capacity)?;

        for &head in &self.buckets {
            let mut cur = head;
            while let Some(k) = cur {
                let node = &mut self.nodes[k];
                cur = node.next.take();
                let b = bucket_for(node.hash, capacity);
                match tails[b] {
                    Some(t) => self.nodes[t].next = Some(k),
                    None => buckets[b] = Some(k),
                }
                tails[b] = Some(k);
            }
        }

        self.buckets = buckets;
        self.size_class = next_class;
        Ok(())
    }

    pub fn iter(&self) -> Cursor<'_, V, S> {
        Cursor::new(self)
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn stats(&self) -> Stats {
        let mut occupied_buckets = 0;
        let mut longest_chain = 0;
        for &head in &self.buckets {
            let n = self.chain(head).count();
            if n > 0 {
                occupied_buckets += 1;
            }
            longest_chain = longest_chain.max(n);
        }
        Stats {
            len: self.len(),
            capacity: self.capacity(),
            size_class: self.size_class,
            occupied_buckets,
            longest_chain,
        }
    }

    /// Structural self-check used by tests: every node is reachable from
    /// exactly one bucket, sits in `hash % capacity`, and its stored hash
    /// matches the hasher.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert_eq!(self.buckets.len(), self.config.capacity_of(self.size_class));
        let mut seen = std::collections::HashSet::new();
        for (b, &head) in self.buckets.iter().enumerate() {
            for (k, node) in self.chain(head) {
                assert!(seen.insert(k), "node linked twice");
                assert!(seen.len() <= self.nodes.len(), "chain cycle");
                assert_eq!(node.hash, self.hash_key(&node.key), "stale stored hash");
                assert_eq!(bucket_for(node.hash, self.buckets.len()), b, "misplaced node");
            }
        }
        assert_eq!(seen.len(), self.nodes.len(), "unreachable nodes");
    }
}

impl<V, S> fmt::Debug for Dict<V, S>
where
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V, S> IntoIterator for &'a Dict<V, S>
where
    S: BuildHasher,
{
    type Item = (&'a [u8], &'a V);
    type IntoIter = Cursor<'a, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Rewindable cursor over a [`Dict`], in bucket order then chain order.
///
/// The cursor borrows the table, so the table cannot be mutated while the
/// cursor is alive. After exhaustion it keeps returning `None` until
/// [`Cursor::rewind`] is called.
pub struct Cursor<'a, V, S = JenkinsState> {
    dict: &'a Dict<V, S>,
    bucket: usize,
    pending: Option<NodeKey>,
    remaining: usize,
}

impl<'a, V, S> Cursor<'a, V, S> {
    pub fn new(dict: &'a Dict<V, S>) -> Self {
        Self {
            dict,
            bucket: 0,
            pending: None,
            remaining: dict.nodes.len(),
        }
    }

    /// Restart from bucket 0.
    pub fn rewind(&mut self) {
        self.bucket = 0;
        self.pending = None;
        self.remaining = self.dict.nodes.len();
    }
}

impl<'a, V, S> Iterator for Cursor<'a, V, S> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pending.is_none() {
            let head = *self.dict.buckets.get(self.bucket)?;
            self.bucket += 1;
            self.pending = head;
        }
        let node = self.dict.nodes.get(self.pending?)?;
        self.pending = node.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V, S> ExactSizeIterator for Cursor<'_, V, S> {}

impl<V, S> FusedIterator for Cursor<'_, V, S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // every key lands in bucket 0
    }

    fn chain_keys<V, S: BuildHasher>(d: &Dict<V, S>, bucket: usize) -> Vec<Vec<u8>> {
        d.chain(d.buckets[bucket])
            .map(|(_, n)| n.key.to_vec())
            .collect()
    }

    /// Invariant: a fresh table is empty at size class 0 with every bucket empty.
    #[test]
    fn new_is_empty_at_smallest_class() {
        let d: Dict<i32> = Dict::new();
        assert_eq!(d.len(), 0);
        assert!(d.is_empty());
        assert_eq!(d.size_class(), 0);
        assert_eq!(d.capacity(), 7);
        assert!(d.buckets.iter().all(Option::is_none));
        d.check_invariants();

        let t: Dict<i32> = Dict::try_new().expect("small allocation");
        assert_eq!((t.size_class(), t.capacity()), (0, 7));
    }

    /// Invariant: overwriting keeps one entry, replaces the value and returns
    /// the previous one.
    #[test]
    fn overwrite_returns_previous_value() {
        let mut d = Dict::new();
        assert_eq!(d.set(b"k", 1).unwrap(), None);
        assert_eq!(d.set(b"k", 2).unwrap(), Some(1));
        assert_eq!(d.len(), 1);
        assert_eq!(d.get(b"k"), Some(&2));
        d.check_invariants();
    }

    /// Invariant: new keys go to the tail of their chain; overwriting does not
    /// move an entry.
    #[test]
    fn chain_appends_at_tail() {
        let mut d = Dict::with_hasher(ConstBuildHasher);
        d.set(b"a", 1).unwrap();
        d.set(b"b", 2).unwrap();
        d.set(b"c", 3).unwrap();
        d.set(b"a", 10).unwrap();
        assert_eq!(
            chain_keys(&d, 0),
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
        );
        assert_eq!(d.get(b"a"), Some(&10));
    }

    /// Invariant: popping from the head, middle and tail of a chain relinks
    /// the neighbours correctly.
    #[test]
    fn pop_unlinks_anywhere_in_chain() {
        let mut d = Dict::with_hasher(ConstBuildHasher);
        for (i, k) in [b"a", b"b", b"c", b"d"].iter().enumerate() {
            d.set(*k, i).unwrap();
        }
        assert_eq!(d.pop(b"b"), Some(1));
        assert_eq!(chain_keys(&d, 0), vec![b"a".to_vec(), b"c".to_vec(), b"d".to_vec()]);
        assert_eq!(d.pop(b"a"), Some(0));
        assert_eq!(chain_keys(&d, 0), vec![b"c".to_vec(), b"d".to_vec()]);
        assert_eq!(d.pop(b"d"), Some(3));
        assert_eq!(chain_keys(&d, 0), vec![b"c".to_vec()]);
        assert_eq!(d.pop(b"zz"), None);
        assert_eq!(d.len(), 1);
        d.check_invariants();
    }

    /// Invariant: resize happens exactly when `capacity * limit < len + 1`
    /// and moves to the next size class.
    #[test]
    fn grows_at_load_limit() {
        let mut d = Dict::new();
        // 7 * 0.72 = 5.04, so the sixth insert triggers the first resize.
        for i in 0..5u8 {
            d.set(&[i], i).unwrap();
        }
        assert_eq!(d.size_class(), 0);
        d.set(&[5], 5).unwrap();
        assert_eq!(d.size_class(), 1);
        assert_eq!(d.capacity(), 17);
        d.check_invariants();
    }

    /// Invariant: overwriting a present key at the load boundary still grows
    /// the table before the value is replaced.
    #[test]
    fn overwrite_at_load_limit_grows() {
        let mut d = Dict::new();
        for i in 0..5u8 {
            d.set(&[i], i).unwrap();
        }
        assert_eq!(d.size_class(), 0);
        assert_eq!(d.set(&[0], 50).unwrap(), Some(0));
        assert_eq!(d.size_class(), 1);
        assert_eq!(d.capacity(), 17);
        assert_eq!(d.len(), 5);
        assert_eq!(d.get(&[0]), Some(&50));
        d.check_invariants();
    }

    /// Invariant: rehash keeps old traversal order among entries that share
    /// a new bucket.
    #[test]
    fn grow_preserves_relative_chain_order() {
        let mut d = Dict::with_hasher(ConstBuildHasher);
        let keys: Vec<Vec<u8>> = (0..20u8).map(|i| vec![b'k', i]).collect();
        for (i, k) in keys.iter().enumerate() {
            d.set(k, i).unwrap();
        }
        assert!(d.size_class() > 0);
        assert_eq!(chain_keys(&d, 0), keys);
        d.check_invariants();
    }

    /// Invariant: clear drops all entries but keeps the size class; the
    /// table is reusable afterwards.
    #[test]
    fn clear_keeps_capacity() {
        let mut d = Dict::new();
        for i in 0..100u32 {
            d.set(&i.to_le_bytes(), i).unwrap();
        }
        let class = d.size_class();
        d.clear();
        assert_eq!(d.len(), 0);
        assert_eq!(d.size_class(), class);
        assert_eq!(d.iter().count(), 0);
        d.set(b"again", 1).unwrap();
        assert_eq!(d.get(b"again"), Some(&1));
        d.check_invariants();
    }

    /// Invariant: exhausting the last size class reports the error and leaves
    /// every entry, the count and the class untouched.
    #[test]
    fn capacity_exhausted_is_atomic() {
        static CLASSES: [usize; 2] = [2, 3];
        let mut d = Dict::with_config(Config::new().size_classes(&CLASSES).load_limit(1.0));
        d.set(b"a", 1).unwrap();
        d.set(b"b", 2).unwrap();
        d.set(b"c", 3).unwrap();
        assert_eq!(d.size_class(), 1);
        let err = d.set(b"d", 4).unwrap_err();
        assert_eq!(
            err,
            DictError::CapacityExhausted {
                size_class: 1,
                capacity: 3
            }
        );
        assert_eq!(d.len(), 3);
        assert_eq!(d.size_class(), 1);
        assert!(!d.has(b"d"));
        assert_eq!(d.get(b"c"), Some(&3));
        d.check_invariants();
    }

    /// Invariant: `get_mut` edits in place; `remove_entry` hands back the
    /// stored key copy.
    #[test]
    fn get_mut_and_remove_entry() {
        let mut d = Dict::new();
        d.set(b"key", String::from("v")).unwrap();
        d.get_mut(b"key").unwrap().push('2');
        assert_eq!(d.get(b"key").map(String::as_str), Some("v2"));
        let (k, v) = d.remove_entry(b"key").unwrap();
        assert_eq!(&*k, b"key");
        assert_eq!(v, "v2");
        assert!(d.get_mut(b"key").is_none());
    }

    /// Invariant: keys are arbitrary bytes; interior NULs and prefixes are
    /// distinct keys, and the empty key is a valid key.
    #[test]
    fn binary_keys() {
        let mut d = Dict::new();
        d.set(b"ab", 1).unwrap();
        d.set(b"ab\0", 2).unwrap();
        d.set(b"", 3).unwrap();
        assert_eq!(d.get(b"ab"), Some(&1));
        assert_eq!(d.get(b"ab\0"), Some(&2));
        assert_eq!(d.get(b""), Some(&3));
        assert_eq!(d.get(b"a"), None);
    }

    /// Invariant: the table stores a copy, so the caller's buffer can change
    /// or go away after `set`.
    #[test]
    fn keys_are_copied() {
        let mut d = Dict::new();
        let mut buf = b"temp".to_vec();
        d.set(&buf, 7).unwrap();
        buf[0] = b'x';
        drop(buf);
        assert_eq!(d.get(b"temp"), Some(&7));
        assert!(!d.has(b"xemp"));
    }

    /// Invariant: the cursor reports an exact remaining count and stays
    /// exhausted until rewound.
    #[test]
    fn cursor_exact_size_and_fused() {
        let mut d = Dict::new();
        for k in [b"x", b"y", b"z"] {
            d.set(k, ()).unwrap();
        }
        let mut c = d.iter();
        assert_eq!(c.len(), 3);
        c.next();
        assert_eq!(c.len(), 2);
        assert_eq!(c.by_ref().count(), 2);
        assert!(c.next().is_none());
        assert!(c.next().is_none());
        c.rewind();
        assert_eq!(c.len(), 3);
        let seen: BTreeSet<_> = c.map(|(k, _)| k.to_vec()).collect();
        assert_eq!(seen.len(), 3);
    }

    /// Invariant: stats reflect chain shape; under a constant hasher all
    /// entries share one chain.
    #[test]
    fn stats_report_chain_shape() {
        let mut d = Dict::with_hasher(ConstBuildHasher);
        for i in 0..4u8 {
            d.set(&[i], i).unwrap();
        }
        let s = d.stats();
        assert_eq!(s.len, 4);
        assert_eq!(s.occupied_buckets, 1);
        assert_eq!(s.longest_chain, 4);
        assert_eq!(s.capacity, d.capacity());
    }

    /// Invariant: Debug renders as a map of byte keys to values.
    #[test]
    fn debug_is_map_like() {
        let mut d = Dict::new();
        d.set(b"a", 1).unwrap();
        assert_eq!(format!("{:?}", d), "{[97]: 1}");
    }
}
