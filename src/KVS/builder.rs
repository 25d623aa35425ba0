use std::hash::Hash;
use std::io;
use std::time::Duration;

use super::client::DEFAULT_TIMEOUT;
use super::{KvsClient, KvsServer};
use crate::Core::context::SharedContext;
use crate::Core::SharedMemory::{attach_shared_memory, create_shared_memory};

/// Default POSIX object name shared by server and clients.
const DEFAULT_SHM_NAME: &str = "/shmkv_region";

/// Builder wiring a named shared memory region to a server or client.
///
/// `build_server` creates and initializes the region (exactly once, by the
/// creator); `build_client` attaches to a region some server already
/// initialized. Both return handles that own their mapping.
pub struct KvsBuilder {
    shm_name: String,
    stripe_count: usize,
    worker_threads: usize,
    timeout: Duration,
}

impl Default for KvsBuilder {
    fn default() -> Self {
        Self {
            shm_name: DEFAULT_SHM_NAME.to_string(),
            stripe_count: hardware_parallelism(),
            worker_threads: 0, // caller starts the pool explicitly
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn hardware_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl KvsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the POSIX shared memory object to create or attach.
    pub fn with_shm_name(mut self, name: &str) -> Self {
        self.shm_name = name.to_string();
        self
    }

    /// Lock stripes for the server-side store (defaults to hardware
    /// parallelism).
    pub fn with_stripe_count(mut self, stripe_count: usize) -> Self {
        self.stripe_count = stripe_count;
        self
    }

    /// Worker threads to start in `build_server`; zero leaves the pool
    /// stopped for the caller to `start` explicitly.
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Default timeout for the client's synchronous operations.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create the named region, initialize the context in place, and
    /// return a server owning the mapping.
    pub fn build_server<K, V>(self) -> io::Result<KvsServer<K, V>>
    where
        K: Copy + Eq + Hash + Send + Sync + 'static,
        V: Copy + Default + Send + Sync + 'static,
    {
        let size = SharedContext::<K, V>::required_size();
        let region = create_shared_memory(&self.shm_name, size)?;

        // The region was created with O_EXCL above, so this process is the
        // sole initializer.
        let ctx = unsafe { SharedContext::<K, V>::initialize_in_place(region.as_ptr(), region.size())? };

        let server = KvsServer::with_region(ctx, self.stripe_count, Some(region));
        if self.worker_threads > 0 {
            server.start(self.worker_threads);
        }
        Ok(server)
    }

    /// Attach to an existing named region and return a client owning the
    /// mapping.
    pub fn build_client<K, V>(self) -> io::Result<KvsClient<K, V>>
    where
        K: Copy,
        V: Copy + Default,
    {
        let size = SharedContext::<K, V>::required_size();
        let region = attach_shared_memory(&self.shm_name, size)?;

        let ctx = unsafe { SharedContext::<K, V>::attach(region.as_ptr(), region.size())? };

        Ok(KvsClient::with_region(ctx, self.timeout, Some(region)))
    }
}
