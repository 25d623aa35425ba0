// Client-side handle submitting requests through the shared ring

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::Core::context::ContextView;
use crate::Core::SharedMemory::SharedMemoryBackend;
use crate::KVS::Response::{ResponseSlot, RESPONSE_SUCCESS};
use crate::KVS::Ring::MAX_RETRIES;
use crate::KVS::Structs::{Command, Task};

/// Poll interval while waiting on a response slot.
const RESPONSE_POLL_SLEEP: Duration = Duration::from_micros(100);

/// Default timeout for the synchronous operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle for submitting requests to a shared-memory KVS region.
///
/// Thread-safe: the ticket counter is atomic, and the ring and response
/// table tolerate concurrent submitters. Tickets issued by one client are
/// strictly increasing; submission order is preserved in the ring, but
/// workers dequeue concurrently, so execution order across two requests of
/// the same client is not.
///
/// The protocol requires keeping outstanding tickets at or below the
/// response table size; a timed-out caller must not assume it still owns
/// its slot.
#[derive(Debug)]
pub struct KvsClient<K, V>
where
    K: Copy,
    V: Copy + Default,
{
    ctx: ContextView<K, V>,
    client_pid: u32,
    next_ticket: AtomicU64,
    default_timeout: Duration,
    /// Keeps the mapping alive for clients built over a named region.
    _region: Option<Box<dyn SharedMemoryBackend>>,
}

impl<K, V> KvsClient<K, V>
where
    K: Copy,
    V: Copy + Default,
{
    /// Build a client over an already-mapped context. The caller keeps the
    /// mapping alive; the builder path stores the region in the client
    /// instead.
    pub fn new(ctx: ContextView<K, V>) -> Self {
        Self::with_region(ctx, DEFAULT_TIMEOUT, None)
    }

    pub(crate) fn with_region(
        ctx: ContextView<K, V>,
        default_timeout: Duration,
        region: Option<Box<dyn SharedMemoryBackend>>,
    ) -> Self {
        Self {
            ctx,
            client_pid: std::process::id(),
            next_ticket: AtomicU64::new(1),
            default_timeout,
            _region: region,
        }
    }

    /// Allocate a ticket, re-arm its response slot, and enqueue the request.
    ///
    /// The slot is cleared before the request can become visible to any
    /// worker, so the submitter never observes a stale completion.
    fn submit(&self, cmd: Command, key: K, value: Option<V>) -> io::Result<u64> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        let task = Task {
            cmd: cmd as u32,
            key,
            value: value.unwrap_or_default(),
            has_value: value.is_some(),
            client_pid: self.client_pid,
            ticket,
        };

        self.ctx.responses().clear(ticket);

        if !self.ctx.ring().try_enqueue(task, MAX_RETRIES) {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                format!(
                    "request ring full or contended ({} submitting {})",
                    self.client_pid,
                    cmd.as_str()
                ),
            ));
        }

        Ok(ticket)
    }

    /// Poll the slot for `ticket` until a completion stamped with that
    /// ticket appears or `timeout` elapses.
    fn wait_for_response(&self, ticket: u64, timeout: Duration) -> Option<&ResponseSlot<V>> {
        let slot = self.ctx.responses().slot_for(ticket);
        let start = Instant::now();

        while !slot.is_completed(ticket) {
            if start.elapsed() >= timeout {
                return None; // Timeout
            }

            // Brief sleep to avoid busy-waiting
            std::thread::sleep(RESPONSE_POLL_SLEEP);
        }

        Some(slot)
    }

    /// Submit a GET without waiting. Returns the ticket for `wait`.
    pub fn get_async(&self, key: K) -> io::Result<u64> {
        self.submit(Command::Get, key, None)
    }

    /// Submit a SET (upsert) without waiting.
    pub fn set_async(&self, key: K, value: V) -> io::Result<u64> {
        self.submit(Command::Set, key, Some(value))
    }

    /// Submit a POST (insert-if-absent) without waiting.
    pub fn post_async(&self, key: K, value: V) -> io::Result<u64> {
        self.submit(Command::Post, key, Some(value))
    }

    /// Submit a DELETE without waiting.
    pub fn del_async(&self, key: K) -> io::Result<u64> {
        self.submit(Command::Delete, key, None)
    }

    /// Wait for an async submission to complete; returns the terminal
    /// status code, or None on timeout.
    pub fn wait(&self, ticket: u64, timeout: Duration) -> Option<u32> {
        self.wait_for_response(ticket, timeout).map(|slot| slot.status())
    }

    /// GET with the default timeout. None covers not-found, timeout, and
    /// submission failure alike.
    pub fn get(&self, key: K) -> Option<V> {
        self.get_timeout(key, self.default_timeout)
    }

    pub fn get_timeout(&self, key: K, timeout: Duration) -> Option<V> {
        let ticket = self.get_async(key).ok()?;
        let slot = self.wait_for_response(ticket, timeout)?;

        if slot.status() == RESPONSE_SUCCESS {
            Some(slot.value())
        } else {
            None // Not found
        }
    }

    /// SET with the default timeout. True on SUCCESS.
    pub fn set(&self, key: K, value: V) -> bool {
        self.set_timeout(key, value, self.default_timeout)
    }

    pub fn set_timeout(&self, key: K, value: V, timeout: Duration) -> bool {
        let ticket = match self.set_async(key, value) {
            Ok(ticket) => ticket,
            Err(_) => return false, // Failed to submit
        };

        self.wait_for_response(ticket, timeout)
            .map(|slot| slot.status() == RESPONSE_SUCCESS)
            .unwrap_or(false)
    }

    /// POST with the default timeout. True iff the key was absent and is
    /// now inserted.
    pub fn post(&self, key: K, value: V) -> bool {
        self.post_timeout(key, value, self.default_timeout)
    }

    pub fn post_timeout(&self, key: K, value: V, timeout: Duration) -> bool {
        let ticket = match self.post_async(key, value) {
            Ok(ticket) => ticket,
            Err(_) => return false,
        };

        self.wait_for_response(ticket, timeout)
            .map(|slot| slot.status() == RESPONSE_SUCCESS)
            .unwrap_or(false)
    }

    /// DELETE with the default timeout. True iff the key was removed.
    pub fn del(&self, key: K) -> bool {
        self.del_timeout(key, self.default_timeout)
    }

    pub fn del_timeout(&self, key: K, timeout: Duration) -> bool {
        let ticket = match self.del_async(key) {
            Ok(ticket) => ticket,
            Err(_) => return false,
        };

        self.wait_for_response(ticket, timeout)
            .map(|slot| slot.status() == RESPONSE_SUCCESS)
            .unwrap_or(false)
    }

    /// Approximate number of requests pending in the ring.
    pub fn queue_size(&self) -> usize {
        self.ctx.ring().size()
    }

    /// Whether the ring currently cannot accept more requests.
    pub fn is_queue_full(&self) -> bool {
        self.ctx.ring().full()
    }

    pub fn client_pid(&self) -> u32 {
        self.client_pid
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
