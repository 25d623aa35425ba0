use shmkv::Core::context::SharedContext;
use shmkv::KVS::Response::RESPONSE_PENDING;
use shmkv::KVS::Ring::MAX_RETRIES;
use shmkv::KVS::Structs::{Command, Task};
use std::alloc::{alloc, dealloc, Layout};

type Ctx = SharedContext<i32, i32>;

fn context_layout() -> Layout {
    Layout::from_size_align(Ctx::required_size(), std::mem::align_of::<Ctx>()).unwrap()
}

struct Backing {
    ptr: *mut u8,
    layout: Layout,
}

impl Backing {
    fn new() -> Self {
        let layout = context_layout();
        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            panic!("Failed to allocate context backing");
        }
        Self { ptr, layout }
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr, self.layout) }
    }
}

#[test]
fn required_size_covers_ring_and_table() {
    assert!(Ctx::required_size() > 0);
    assert_eq!(Ctx::required_size(), std::mem::size_of::<Ctx>());
}

#[test]
fn initialize_rejects_null_pointer() {
    let err = unsafe { Ctx::initialize_in_place(std::ptr::null_mut(), Ctx::required_size()) }
        .expect_err("null pointer must be rejected");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn initialize_rejects_short_region() {
    let backing = Backing::new();
    let err = unsafe { Ctx::initialize_in_place(backing.ptr, Ctx::required_size() - 1) }
        .expect_err("short region must be rejected");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn initialize_rejects_misaligned_pointer() {
    let backing = Backing::new();
    let misaligned = unsafe { backing.ptr.add(8) };
    let err = unsafe { Ctx::initialize_in_place(misaligned, Ctx::required_size()) }
        .expect_err("misaligned pointer must be rejected");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn attach_validates_like_initialize() {
    let backing = Backing::new();

    let err = unsafe { Ctx::attach(std::ptr::null_mut(), Ctx::required_size()) }
        .expect_err("null pointer must be rejected");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);

    let err = unsafe { Ctx::attach(backing.ptr, 16) }.expect_err("short region must be rejected");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn initialized_context_starts_empty_and_pending() {
    let backing = Backing::new();
    let view = unsafe { Ctx::initialize_in_place(backing.ptr, backing.layout.size()) }.unwrap();

    assert!(view.ring().empty());
    assert_eq!(view.ring().size(), 0);
    assert_eq!(view.ring().version(), 0);

    for ticket in [0u64, 1, 500, 1023, 1024] {
        assert_eq!(view.responses().slot_for(ticket).status(), RESPONSE_PENDING);
        assert!(!view.responses().is_complete(ticket));
    }
}

#[test]
fn attach_sees_what_initialize_wrote() {
    let backing = Backing::new();
    let writer = unsafe { Ctx::initialize_in_place(backing.ptr, backing.layout.size()) }.unwrap();
    let reader = unsafe { Ctx::attach(backing.ptr, backing.layout.size()) }.unwrap();

    let task = Task {
        cmd: Command::Set as u32,
        key: 11,
        value: 1100,
        has_value: true,
        client_pid: 42,
        ticket: 1,
    };
    assert!(writer.ring().try_enqueue(task, MAX_RETRIES));

    // The second view observes the same ring state
    assert_eq!(reader.ring().size(), 1);
    let got = reader.ring().try_dequeue(MAX_RETRIES).expect("task visible through second view");
    assert_eq!(got.key, 11);
    assert_eq!(got.value, 1100);
    assert_eq!(got.ticket, 1);
    assert!(writer.ring().empty());
}
