// This is the shared request ring for the KVS - one per region

use std::cell::UnsafeCell;
use std::sync::atomic::AtomicU64;

use crossbeam_utils::CachePadded;

use crate::KVS::Structs::Task;

/// Number of request slots in the ring. One slot always stays empty as the
/// full/empty sentinel, so at most `RING_CAPACITY - 1` requests are queued.
pub const RING_CAPACITY: usize = 1024;

/// Default bound on retry rounds before `try_enqueue`/`try_dequeue` give up.
/// Bounded retries let callers distinguish "come back later" from blocking
/// forever; a false return may mean full or merely contended.
pub const MAX_RETRIES: usize = 1000;

/// A bounded, multi-producer multi-consumer ring of request records,
/// designed to live inside a shared memory region mapped by several
/// processes at different addresses.
///
/// ### Concurrency design:
/// - **Cursors** are 64-bit monotone counters; the slot index is
///   `cursor % RING_CAPACITY`. Monotone cursors rule out ABA on the
///   claiming CAS for any practical process lifetime. Do not narrow them.
/// - **Producers** snapshot both cursors, write the record into
///   `slots[tail % C]` with a plain store, then claim the slot by CASing
///   `tail` forward with Release. A losing producer may have stomped the
///   slot bytes, but the slot was never published (tail unmoved) and the
///   eventual winner rewrites them before publishing.
/// - **Consumers** mirror the producers on `head`: the record is copied out
///   before the CAS, and the copy is discarded when the CAS loses.
/// - **Cache-line padding**: the cursors are wrapped in `CachePadded` so
///   producer and consumer contention stay on separate cache lines.
#[repr(C)]
pub struct TaskRing<K, V> {
    /// The request records. Plain stores and loads; ordering is carried by
    /// the Release/Acquire pair on the owning cursor CAS.
    pub(crate) slots: [UnsafeCell<Task<K, V>>; RING_CAPACITY],

    /// Consumer cursor: next slot to read.
    pub(crate) head: CachePadded<AtomicU64>,

    /// Producer cursor: next slot to claim for writing.
    pub(crate) tail: CachePadded<AtomicU64>,

    /// Bumped once per successful cursor CAS. Observability only; nothing
    /// synchronizes on it.
    pub(crate) version: CachePadded<AtomicU64>,
}

unsafe impl<K: Copy + Send, V: Copy + Send> Send for TaskRing<K, V> {}
unsafe impl<K: Copy + Send, V: Copy + Send> Sync for TaskRing<K, V> {}
