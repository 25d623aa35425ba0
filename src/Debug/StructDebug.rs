use std::fmt;
use std::hash::Hash;

use crate::Core::context::ContextView;
use crate::KVS::Ring::TaskRing;
use crate::KVS::KvsServer;

/// Debug function for ContextView
///
/// Provides a safe debug representation that shows:
/// - Context address in this process's mapping
/// - Live ring occupancy
/// Payload bytes are never copied out of the shared region.
pub fn debug_context_view<K: Copy, V: Copy>(
    view: &ContextView<K, V>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("ContextView")
        .field("context", &format_args!("{:p}", view.as_ptr()))
        .field("queued", &view.ring().size())
        .finish()
}

/// Debug function for TaskRing
///
/// Shows the live counters without dereferencing any slot.
pub fn debug_task_ring<K: Copy, V: Copy>(
    ring: &TaskRing<K, V>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.debug_struct("TaskRing")
        .field("size", &ring.size())
        .field("version", &ring.version())
        .finish_non_exhaustive()
}

/// Debug function for KvsServer
pub fn debug_kvs_server<K, V>(server: &KvsServer<K, V>, f: &mut fmt::Formatter<'_>) -> fmt::Result
where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
{
    f.debug_struct("KvsServer")
        .field("running", &server.is_running())
        .field("workers", &server.worker_count())
        .field("storage_size", &server.storage_size())
        .finish()
}
