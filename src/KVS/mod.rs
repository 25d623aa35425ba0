mod builder;
mod client;
mod server;

pub use builder::KvsBuilder;
pub use client::{KvsClient, DEFAULT_TIMEOUT};
pub use server::KvsServer;

pub mod Ring {
    pub mod Ring;
    pub mod Ring_impl;
    pub use Ring::{TaskRing, MAX_RETRIES, RING_CAPACITY}; // re-export for stable path
}

pub mod Structs {
    pub mod Task_Structs;
    pub use Task_Structs::{Command, Task}; // re-export for stable path
}

pub mod Response {
    pub mod Response;
    pub use Response::{
        ResponseSlot, ResponseTable, RESPONSE_FAILED, RESPONSE_NOT_FOUND, RESPONSE_PENDING,
        RESPONSE_SUCCESS, RESPONSE_TABLE_SIZE,
    };
}

pub mod Store {
    #[path = "ConcurrentMap.rs"]
    mod concurrent_map_impl;
    pub use concurrent_map_impl::ConcurrentMap;
}
