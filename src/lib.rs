// Module naming follows project convention (KVS = concurrent key-value store core)
#[allow(non_snake_case)]
pub mod KVS;

// Debug implementations for various types
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

#[allow(non_snake_case)]
pub mod Core {
    pub mod SharedMemory;
    pub use SharedMemory::{SharedMemoryBackend, RawHandle, create_shared_memory, attach_shared_memory};
    pub mod context;
}
