// Shared region layout: one request ring followed by one response table,
// constructed in place exactly once by the region's creator

use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::KVS::Response::ResponseTable;
use crate::KVS::Ring::TaskRing;

/// The contractual contents of the shared region: the request ring at
/// offset 0 and the response table immediately after it. Total region size
/// is `size_of::<SharedContext<K, V>>()` for the chosen key/value types.
///
/// The all-zero byte pattern is the valid initial state (cursors at zero,
/// every response slot PENDING with ticket 0), which is exactly what
/// `initialize_in_place` establishes.
#[repr(C)]
pub struct SharedContext<K, V> {
    pub task_ring: TaskRing<K, V>,
    pub response_table: ResponseTable<V>,
}

impl<K: Copy, V: Copy> SharedContext<K, V> {
    /// Bytes a region must provide to hold one context for these types.
    pub const fn required_size() -> usize {
        std::mem::size_of::<SharedContext<K, V>>()
    }

    fn validate(ptr: *mut u8, len: usize, caller: &str) -> io::Result<()> {
        if ptr.is_null() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("SharedContext::{caller}(): region pointer is null"),
            ));
        }

        let align = std::mem::align_of::<SharedContext<K, V>>();
        if (ptr as usize) % align != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("SharedContext::{caller}(): region pointer {ptr:p} not aligned to {align} bytes"),
            ));
        }

        let required = Self::required_size();
        if len < required {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "SharedContext::{caller}(): region too small.\n\
                     ├─ Region length: {len} bytes\n\
                     ╰─ Required:      {required} bytes"
                ),
            ));
        }

        Ok(())
    }

    /// Construct the context in place over a freshly created region.
    ///
    /// Must run exactly once per region, by the process that created it,
    /// before any other participant attaches. Distinct from `attach` so a
    /// client can never re-initialize a live region.
    ///
    /// # Safety
    /// `ptr..ptr + len` must be a writable mapping no other participant is
    /// accessing yet, and it must stay mapped for as long as any returned
    /// view (or copy of it) is in use.
    pub unsafe fn initialize_in_place(ptr: *mut u8, len: usize) -> io::Result<ContextView<K, V>> {
        Self::validate(ptr, len, "initialize_in_place")?;

        std::ptr::write_bytes(ptr, 0, Self::required_size());

        Ok(ContextView {
            ctx: NonNull::new_unchecked(ptr as *mut SharedContext<K, V>),
            _marker: PhantomData,
        })
    }

    /// View an already-initialized context without writing to it.
    ///
    /// # Safety
    /// The region must have been initialized via `initialize_in_place` with
    /// the same `K`, `V` instantiation (in this or another process), and it
    /// must stay mapped for as long as any returned view (or copy of it)
    /// is in use.
    pub unsafe fn attach(ptr: *mut u8, len: usize) -> io::Result<ContextView<K, V>> {
        Self::validate(ptr, len, "attach")?;

        Ok(ContextView {
            ctx: NonNull::new_unchecked(ptr as *mut SharedContext<K, V>),
            _marker: PhantomData,
        })
    }
}

/// Non-owning, copyable view of a `SharedContext` living in some mapping.
///
/// Whoever hands out a view is responsible for keeping the mapping alive;
/// the builder does this by storing the region backend next to the view,
/// and the worker pool joins its threads before its region can drop.
pub struct ContextView<K, V> {
    ctx: NonNull<SharedContext<K, V>>,
    _marker: PhantomData<*mut SharedContext<K, V>>,
}

impl<K, V> Clone for ContextView<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for ContextView<K, V> {}

unsafe impl<K: Copy + Send, V: Copy + Send> Send for ContextView<K, V> {}
unsafe impl<K: Copy + Send, V: Copy + Send> Sync for ContextView<K, V> {}

impl<K: Copy, V: Copy> ContextView<K, V> {
    /// The request ring inside the region.
    pub fn ring(&self) -> &TaskRing<K, V> {
        unsafe { &(*self.ctx.as_ptr()).task_ring }
    }

    /// The response table inside the region.
    pub fn responses(&self) -> &ResponseTable<V> {
        unsafe { &(*self.ctx.as_ptr()).response_table }
    }

    pub(crate) fn as_ptr(&self) -> *const SharedContext<K, V> {
        self.ctx.as_ptr()
    }
}

// Debug proxy implementation that calls the standalone debug function
impl<K: Copy, V: Copy> fmt::Debug for ContextView<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_context_view(self, f)
    }
}
