// Response table for returning results from server to clients

use std::cell::UnsafeCell;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use std::sync::atomic::{AtomicU32, AtomicU64};

// Response status codes
pub const RESPONSE_PENDING: u32 = 0;
pub const RESPONSE_SUCCESS: u32 = 1;
pub const RESPONSE_NOT_FOUND: u32 = 2;
pub const RESPONSE_FAILED: u32 = 3;

/// Number of response slots; tickets map to slots modulo this.
pub const RESPONSE_TABLE_SIZE: usize = 1024;

/// One response slot, owned by the ticket holder from `reset` until a
/// terminal status stamped with that ticket is observed.
///
/// Ticket space is much larger than the table, so two live tickets can
/// collide modulo the table size. The `ticket` echo closes the misread
/// hazard: the publisher stamps the ticket it is answering, and a waiter
/// only accepts a completion stamped with its own ticket. A late publish
/// for a stale colliding ticket is never read as someone else's answer;
/// the disadvantaged waiter times out instead.
#[repr(C, align(64))]
pub struct ResponseSlot<V> {
    /// PENDING until a worker publishes a terminal status. Terminal stores
    /// use Release so the fields below happen-before the transition.
    status: AtomicU32,

    /// The ticket this slot currently answers (publisher echo).
    ticket: AtomicU64,

    /// Meaningful iff status is SUCCESS for a GET.
    value: UnsafeCell<V>,
}

unsafe impl<V: Copy + Send> Send for ResponseSlot<V> {}
unsafe impl<V: Copy + Send> Sync for ResponseSlot<V> {}

impl<V: Copy> ResponseSlot<V> {
    /// Re-arm the slot for a new submission under `ticket`.
    pub fn reset(&self, ticket: u64) {
        self.ticket.store(ticket, Relaxed);
        self.status.store(RESPONSE_PENDING, Release);
    }

    /// Publish a terminal status for `ticket`: payload first, ticket echo,
    /// then the Release store that makes the completion visible.
    pub fn publish(&self, status: u32, ticket: u64, value: Option<V>) {
        if let Some(v) = value {
            unsafe { self.value.get().write(v) };
        }
        self.ticket.store(ticket, Relaxed);
        self.status.store(status, Release);
    }

    /// Whether a terminal status stamped with `ticket` has been published.
    pub fn is_completed(&self, ticket: u64) -> bool {
        self.status.load(Acquire) != RESPONSE_PENDING && self.ticket.load(Relaxed) == ticket
    }

    pub fn status(&self) -> u32 {
        self.status.load(Acquire)
    }

    /// Copy the payload out. Only meaningful once `is_completed` returned
    /// true for the caller's ticket with a SUCCESS status.
    pub fn value(&self) -> V {
        unsafe { *self.value.get() }
    }
}

/// Fixed-size response table in shared memory. Clients locate their slot
/// by `ticket % RESPONSE_TABLE_SIZE`; the protocol requires clearing the
/// slot before submitting and keeping outstanding tickets at or below the
/// table size.
#[repr(C)]
pub struct ResponseTable<V> {
    responses: [ResponseSlot<V>; RESPONSE_TABLE_SIZE],
}

impl<V: Copy> ResponseTable<V> {
    /// Get the response slot for a ticket.
    #[inline]
    pub fn slot_for(&self, ticket: u64) -> &ResponseSlot<V> {
        &self.responses[(ticket % RESPONSE_TABLE_SIZE as u64) as usize]
    }

    /// Clear a slot ahead of submitting the matching request.
    pub fn clear(&self, ticket: u64) {
        self.slot_for(ticket).reset(ticket);
    }

    /// Whether the request behind `ticket` has completed.
    pub fn is_complete(&self, ticket: u64) -> bool {
        self.slot_for(ticket).is_completed(ticket)
    }

    /// Get the table size.
    pub const fn capacity() -> usize {
        RESPONSE_TABLE_SIZE
    }
}
