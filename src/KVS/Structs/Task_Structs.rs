// Wire-level request records copied between address spaces

// no atomics in Task; keep as plain integral/Copy types for ABI

/// Command codes understood by the worker pool.
///
/// On the wire (`Task::cmd`) a command travels as a raw `u32` so that a
/// corrupt or future code stays representable; `from_raw` is the only way
/// back into the enum and returns `None` for anything unknown.
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Get = 1,
    Set = 2,
    Post = 3,
    Delete = 4,
}

impl Command {
    pub fn from_raw(raw: u32) -> Option<Command> {
        match raw {
            1 => Some(Command::Get),
            2 => Some(Command::Set),
            3 => Some(Command::Post),
            4 => Some(Command::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Get => "GET",
            Command::Set => "SET",
            Command::Post => "POST",
            Command::Delete => "DELETE",
        }
    }
}

/// One request record as it travels through the shared ring.
///
/// It is marked `#[repr(C)]` to ensure a defined and stable memory layout,
/// which is critical for shared memory and inter-process communication.
/// Key and value types must be fixed-size, bit-copyable values with no
/// indirection into the submitting process's heap.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct Task<K, V> {
    /// Raw command code; decode with `Command::from_raw`.
    pub cmd: u32,

    /// The key this request operates on.
    pub key: K,

    /// Meaningful iff `has_value` (SET/POST carry one, GET/DELETE do not).
    pub value: V,

    /// Whether `value` carries a payload.
    pub has_value: bool,

    /// Submitting process id, diagnostic only.
    pub client_pid: u32,

    /// Per-client monotone ticket, starting at 1. Selects the response slot
    /// via `ticket % RESPONSE_TABLE_SIZE`.
    pub ticket: u64,
}
