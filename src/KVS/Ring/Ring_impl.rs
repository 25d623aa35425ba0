use std::fmt;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use super::Ring::{TaskRing, MAX_RETRIES, RING_CAPACITY};
use crate::KVS::Structs::Task;

impl<K: Copy, V: Copy> TaskRing<K, V> {
    #[inline]
    fn slot_ptr(&self, cursor: u64) -> *mut Task<K, V> {
        self.slots[(cursor % RING_CAPACITY as u64) as usize].get()
    }

    /// Attempt to publish `task`, giving up after `max_retries` CAS rounds.
    ///
    /// Returns false when the ring is full or the retry budget ran out
    /// under contention; the two cases are indistinguishable to the caller
    /// and both are handled by retrying later.
    pub fn try_enqueue(&self, task: Task<K, V>, max_retries: usize) -> bool {
        let mut retries = 0;
        let mut backoff: u32 = 1;

        while retries < max_retries {
            let current_tail = self.tail.load(Acquire);
            let current_head = self.head.load(Acquire);
            let next_tail = current_tail + 1;

            if next_tail % RING_CAPACITY as u64 == current_head % RING_CAPACITY as u64 {
                return false; // full
            }

            // Plain store; the Release on the winning CAS publishes it.
            unsafe { self.slot_ptr(current_tail).write(task) };

            if self
                .tail
                .compare_exchange_weak(current_tail, next_tail, Release, Relaxed)
                .is_ok()
            {
                self.version.fetch_add(1, Release);
                return true;
            }

            for _ in 0..backoff {
                std::hint::spin_loop();
            }
            backoff = (backoff << 1) & 0xFF;
            retries += 1;
        }

        false
    }

    /// Attempt to take one request, giving up after `max_retries` CAS rounds.
    pub fn try_dequeue(&self, max_retries: usize) -> Option<Task<K, V>> {
        let mut retries = 0;
        let mut backoff: u32 = 1;

        while retries < max_retries {
            let current_head = self.head.load(Acquire);
            let current_tail = self.tail.load(Acquire);

            if current_head % RING_CAPACITY as u64 == current_tail % RING_CAPACITY as u64 {
                return None; // empty
            }

            // Copy out before claiming; when the CAS below loses, the copy
            // is dropped and the slot is re-read on the next round.
            let task = unsafe { self.slot_ptr(current_head).read() };

            if self
                .head
                .compare_exchange_weak(current_head, current_head + 1, Release, Relaxed)
                .is_ok()
            {
                self.version.fetch_add(1, Release);
                return Some(task);
            }

            for _ in 0..backoff {
                std::hint::spin_loop();
            }
            backoff = (backoff << 1) & 0xFF;
            retries += 1;
        }

        None
    }

    /// Blocking enqueue: yields to the scheduler between bounded retry rounds.
    pub fn enqueue(&self, task: Task<K, V>) {
        while !self.try_enqueue(task, MAX_RETRIES) {
            std::thread::yield_now();
        }
    }

    /// Blocking dequeue: yields to the scheduler between bounded retry rounds.
    pub fn dequeue(&self) -> Task<K, V> {
        loop {
            if let Some(task) = self.try_dequeue(MAX_RETRIES) {
                return task;
            }
            std::thread::yield_now();
        }
    }

    /// Best-effort occupancy. The two cursor loads are not linearized
    /// against each other, so the result is a hint, not a guarantee.
    pub fn size(&self) -> usize {
        let current_tail = self.tail.load(Relaxed);
        let current_head = self.head.load(Relaxed);
        current_tail.saturating_sub(current_head) as usize
    }

    pub fn empty(&self) -> bool {
        self.head.load(Acquire) % RING_CAPACITY as u64
            == self.tail.load(Acquire) % RING_CAPACITY as u64
    }

    pub fn full(&self) -> bool {
        let current_tail = self.tail.load(Acquire);
        let current_head = self.head.load(Acquire);
        (current_tail + 1) % RING_CAPACITY as u64 == current_head % RING_CAPACITY as u64
    }

    /// Number of successful cursor transitions since initialization.
    pub fn version(&self) -> u64 {
        self.version.load(Relaxed)
    }
}

// Debug proxy implementation that calls the standalone debug function
impl<K: Copy, V: Copy> fmt::Debug for TaskRing<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_task_ring(self, f)
    }
}
