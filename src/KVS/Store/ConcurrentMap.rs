// Striped-lock hash map executing the KVS requests on the server side

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

// Use parking_lot's Mutex for better performance
use parking_lot::Mutex;

/// Collision chains per stripe; total bucket count is
/// `BUCKETS_PER_STRIPE * stripe_count`.
const BUCKETS_PER_STRIPE: usize = 10;

type Bucket<K, V> = Vec<(K, V)>;

/// Hash map partitioned into independently-locked stripes.
///
/// A key hashes to one global bucket (`hash % (10 * S)`), and every bucket
/// belongs to exactly one stripe (`bucket % S`, which equals `hash % S`),
/// so holding the stripe lock gives exclusive access to the key's chain.
/// Operations on keys in different stripes run concurrently; `size` takes
/// every stripe lock in index order.
pub struct ConcurrentMap<K, V> {
    stripes: Vec<Mutex<[Bucket<K, V>; BUCKETS_PER_STRIPE]>>,
}

impl<K: Copy + Eq + Hash, V: Copy> ConcurrentMap<K, V> {
    /// Create a map with `stripe_count` lock stripes (clamped to at least
    /// one). Callers default this to the hardware parallelism.
    pub fn new(stripe_count: usize) -> Self {
        let stripe_count = stripe_count.max(1);
        let stripes = (0..stripe_count)
            .map(|_| Mutex::new(std::array::from_fn(|_| Vec::new())))
            .collect();
        Self { stripes }
    }

    fn hash_of(key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// Stripe index and chain position within the stripe for `key`.
    ///
    /// The global bucket index is `hash % (10 * S)`; it lives in stripe
    /// `bucket % S` at local position `bucket / S`.
    fn locate(&self, key: &K) -> (usize, usize) {
        let stripe_count = self.stripes.len() as u64;
        let bucket = Self::hash_of(key) % (BUCKETS_PER_STRIPE as u64 * stripe_count);
        ((bucket % stripe_count) as usize, (bucket / stripe_count) as usize)
    }

    /// Insert-if-absent. Returns false (and changes nothing) when the key
    /// is already present.
    pub fn insert(&self, key: K, value: V) -> bool {
        let (stripe, chain) = self.locate(&key);
        let mut buckets = self.stripes[stripe].lock();
        let bucket = &mut buckets[chain];

        if bucket.iter().any(|(k, _)| *k == key) {
            return false;
        }

        bucket.push((key, value));
        true
    }

    /// Upsert: overwrite the existing value or append a new entry.
    pub fn insert_or_assign(&self, key: K, value: V) {
        let (stripe, chain) = self.locate(&key);
        let mut buckets = self.stripes[stripe].lock();
        let bucket = &mut buckets[chain];

        for (k, v) in bucket.iter_mut() {
            if *k == key {
                *v = value;
                return;
            }
        }

        bucket.push((key, value));
    }

    /// Copy out the value stored under `key`, if any. First match wins;
    /// chains hold at most one entry per key.
    pub fn find(&self, key: &K) -> Option<V> {
        let (stripe, chain) = self.locate(key);
        let buckets = self.stripes[stripe].lock();
        buckets[chain].iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Remove `key`. Returns true iff an entry was removed.
    pub fn erase(&self, key: &K) -> bool {
        let (stripe, chain) = self.locate(key);
        let mut buckets = self.stripes[stripe].lock();
        let bucket = &mut buckets[chain];

        if let Some(pos) = bucket.iter().position(|(k, _)| k == key) {
            bucket.remove(pos);
            return true;
        }
        false
    }

    /// Exact entry count. Acquires every stripe lock in index order, so
    /// concurrent `size` calls cannot deadlock each other.
    pub fn size(&self) -> usize {
        let guards: Vec<_> = self.stripes.iter().map(|stripe| stripe.lock()).collect();
        guards
            .iter()
            .map(|buckets| buckets.iter().map(Vec::len).sum::<usize>())
            .sum()
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }
}
