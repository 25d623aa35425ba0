// Server-side worker pool draining the shared ring into the striped store

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::Core::context::ContextView;
use crate::Core::SharedMemory::SharedMemoryBackend;
use crate::KVS::Response::{RESPONSE_FAILED, RESPONSE_NOT_FOUND, RESPONSE_SUCCESS};
use crate::KVS::Store::ConcurrentMap;
use crate::KVS::Structs::{Command, Task};

/// Retry budget a worker grants each dequeue attempt before sleeping.
const WORKER_DEQUEUE_RETRIES: usize = 100;

/// Idle sleep between dequeue attempts while the ring is empty.
const WORKER_IDLE_SLEEP: Duration = Duration::from_micros(100);

/// Worker pool executing requests from a shared region against an
/// in-process striped store.
///
/// The pool is constructed over a `ContextView` (non-null by type) and is
/// inert until `start`; `stop` joins every worker and is also run on drop,
/// so workers never outlive the mapping their view points into. Requests
/// still queued when the pool stops are abandoned; their submitters time
/// out.
pub struct KvsServer<K, V>
where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    storage: Arc<ConcurrentMap<K, V>>,
    ctx: ContextView<K, V>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    /// Keeps the mapping alive for servers built over a named region.
    _region: Option<Box<dyn SharedMemoryBackend>>,
}

impl<K, V> KvsServer<K, V>
where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    /// Build a server over an already-mapped context. The caller keeps the
    /// mapping alive; the builder path stores the region in the server
    /// instead.
    pub fn new(ctx: ContextView<K, V>, stripe_count: usize) -> Self {
        Self::with_region(ctx, stripe_count, None)
    }

    pub(crate) fn with_region(
        ctx: ContextView<K, V>,
        stripe_count: usize,
        region: Option<Box<dyn SharedMemoryBackend>>,
    ) -> Self {
        Self {
            storage: Arc::new(ConcurrentMap::new(stripe_count)),
            ctx,
            workers: Mutex::new(Vec::new()),
            running: Arc::new(AtomicBool::new(false)),
            _region: region,
        }
    }

    /// Start `num_threads` worker threads and return immediately.
    /// Returns false when the pool is already running.
    pub fn start(&self, num_threads: usize) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("KvsServer already running");
            return false;
        }

        log::info!("starting KvsServer with {num_threads} worker threads");

        let mut workers = self.workers.lock();
        workers.reserve(num_threads);
        for worker_id in 0..num_threads {
            let ctx = self.ctx;
            let storage = Arc::clone(&self.storage);
            let running = Arc::clone(&self.running);
            workers.push(std::thread::spawn(move || {
                worker_loop(worker_id, ctx, storage, running);
            }));
        }

        true
    }

    /// Stop the pool and join every worker. Idempotent; in-flight requests
    /// run to completion, queued-but-undequeued requests are abandoned.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return; // already stopped
        }

        log::info!("stopping KvsServer");

        let mut workers = self.workers.lock();
        for worker in workers.drain(..) {
            let _ = worker.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of live worker threads (zero once stopped).
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Exact number of key-value pairs currently stored.
    pub fn storage_size(&self) -> usize {
        self.storage.size()
    }

    pub fn stripe_count(&self) -> usize {
        self.storage.stripe_count()
    }
}

impl<K, V> Drop for KvsServer<K, V>
where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<K, V>(
    worker_id: usize,
    ctx: ContextView<K, V>,
    storage: Arc<ConcurrentMap<K, V>>,
    running: Arc<AtomicBool>,
) where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    log::debug!("worker {worker_id} started");

    while running.load(Ordering::Acquire) {
        match ctx.ring().try_dequeue(WORKER_DEQUEUE_RETRIES) {
            Some(task) => process_task(worker_id, &ctx, &storage, &task),
            // Ring is empty; sleep briefly to avoid busy-waiting.
            None => std::thread::sleep(WORKER_IDLE_SLEEP),
        }
    }

    log::debug!("worker {worker_id} stopped");
}

/// Execute one request against the store and publish its response. The
/// payload is stored before the terminal status (Release) so a client that
/// observes completion also observes the value.
fn process_task<K, V>(
    worker_id: usize,
    ctx: &ContextView<K, V>,
    storage: &ConcurrentMap<K, V>,
    task: &Task<K, V>,
) where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    let slot = ctx.responses().slot_for(task.ticket);

    match Command::from_raw(task.cmd) {
        Some(cmd @ Command::Get) => {
            let found = storage.find(&task.key);
            log::debug!(
                "[worker {worker_id}] {} (client_pid={}, ticket={}) -> {}",
                cmd.as_str(),
                task.client_pid,
                task.ticket,
                if found.is_some() { "SUCCESS" } else { "NOT_FOUND" }
            );
            match found {
                Some(value) => slot.publish(RESPONSE_SUCCESS, task.ticket, Some(value)),
                None => slot.publish(RESPONSE_NOT_FOUND, task.ticket, None),
            }
        }

        Some(cmd @ Command::Set) => {
            storage.insert_or_assign(task.key, task.value);
            log::debug!(
                "[worker {worker_id}] {} (client_pid={}, ticket={}) -> SUCCESS",
                cmd.as_str(),
                task.client_pid,
                task.ticket
            );
            slot.publish(RESPONSE_SUCCESS, task.ticket, None);
        }

        Some(cmd @ Command::Post) => {
            let inserted = storage.insert(task.key, task.value);
            log::debug!(
                "[worker {worker_id}] {} (client_pid={}, ticket={}) -> {}",
                cmd.as_str(),
                task.client_pid,
                task.ticket,
                if inserted { "SUCCESS" } else { "FAILED (already exists)" }
            );
            let status = if inserted { RESPONSE_SUCCESS } else { RESPONSE_FAILED };
            slot.publish(status, task.ticket, None);
        }

        Some(cmd @ Command::Delete) => {
            let deleted = storage.erase(&task.key);
            log::debug!(
                "[worker {worker_id}] {} (client_pid={}, ticket={}) -> {}",
                cmd.as_str(),
                task.client_pid,
                task.ticket,
                if deleted { "SUCCESS" } else { "NOT_FOUND" }
            );
            let status = if deleted { RESPONSE_SUCCESS } else { RESPONSE_NOT_FOUND };
            slot.publish(status, task.ticket, None);
        }

        None => {
            // Malformed or future command code; answer FAILED so the
            // submitter does not wait out its full timeout.
            log::warn!(
                "[worker {worker_id}] unknown command {} (client_pid={}, ticket={})",
                task.cmd,
                task.client_pid,
                task.ticket
            );
            slot.publish(RESPONSE_FAILED, task.ticket, None);
        }
    }
}

// Debug proxy implementation that calls the standalone debug function
impl<K, V> fmt::Debug for KvsServer<K, V>
where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_kvs_server(self, f)
    }
}
