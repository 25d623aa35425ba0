// End-to-end tests running server and client over one heap-backed context

use shmkv::Core::context::SharedContext;
use shmkv::KVS::Response::{RESPONSE_FAILED, RESPONSE_SUCCESS};
use shmkv::KVS::Ring::MAX_RETRIES;
use shmkv::KVS::Structs::Task;
use shmkv::KVS::{KvsClient, KvsServer};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::time::{Duration, Instant};

type Ctx = SharedContext<i32, i32>;

struct Backing {
    ptr: *mut u8,
    layout: Layout,
}

impl Backing {
    fn new() -> Self {
        let layout =
            Layout::from_size_align(Ctx::required_size(), std::mem::align_of::<Ctx>()).unwrap();
        let ptr = unsafe { alloc_zeroed(layout) };
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

// Field order matters: the server joins its workers before the backing drops.
struct TestKvs {
    server: KvsServer<i32, i32>,
    client: KvsClient<i32, i32>,
    _backing: Backing,
}

fn start_kvs(workers: usize) -> TestKvs {
    let backing = Backing::new();
    let ctx = unsafe { Ctx::initialize_in_place(backing.ptr, backing.layout.size()) }.unwrap();

    let server = KvsServer::new(ctx, 4);
    assert!(server.start(workers), "fresh server must start");

    let client = KvsClient::new(ctx);

    TestKvs {
        server,
        client,
        _backing: backing,
    }
}

#[test]
fn set_get_round_trip() {
    let kvs = start_kvs(2);

    assert!(kvs.client.set(7, 700));
    assert_eq!(kvs.client.get(7), Some(700));
}

#[test]
fn get_missing_key_is_not_found() {
    let kvs = start_kvs(2);

    assert_eq!(kvs.client.get(999), None);
}

#[test]
fn post_conflicts_with_existing_key() {
    let kvs = start_kvs(2);

    assert!(kvs.client.set(1, 10));
    assert!(!kvs.client.post(1, 20), "POST on an existing key must fail");
    assert_eq!(kvs.client.get(1), Some(10), "the original value must survive");
}

#[test]
fn delete_semantics() {
    let kvs = start_kvs(2);

    assert!(kvs.client.set(3, 30));
    assert!(kvs.client.del(3), "first DELETE removes the key");
    assert_eq!(kvs.client.get(3), None);
    assert!(!kvs.client.del(3), "second DELETE finds nothing");
}

#[test]
fn mixed_operations_composite() {
    let kvs = start_kvs(2);

    // SET keys 0..4
    for k in 0..5 {
        assert!(kvs.client.set(k, k * 100));
    }

    // GET them back
    for k in 0..5 {
        assert_eq!(kvs.client.get(k), Some(k * 100));
    }

    // POST on existing keys must all fail
    for k in 0..3 {
        assert!(!kvs.client.post(k, 999), "POST key={k} should fail");
    }

    // POST on fresh keys must all succeed
    for k in 10..13 {
        assert!(kvs.client.post(k, k * 50), "POST key={k} should succeed");
    }

    // DELETE keys 0..2
    for k in 0..3 {
        assert!(kvs.client.del(k), "DELETE key={k} should succeed");
    }
    for k in 0..3 {
        assert_eq!(kvs.client.get(k), None, "deleted key={k} must be gone");
    }

    // Keys 3, 4, 10, 11, 12 remain
    assert_eq!(kvs.server.storage_size(), 5);
}

#[test]
fn async_submission_and_wait() {
    let kvs = start_kvs(2);

    let t1 = kvs.client.set_async(21, 2100).expect("submission must succeed");
    let t2 = kvs.client.get_async(21).expect("submission must succeed");
    assert!(t2 > t1, "tickets from one client are strictly increasing");

    assert_eq!(kvs.client.wait(t1, Duration::from_secs(5)), Some(RESPONSE_SUCCESS));

    // The GET raced the SET through independent workers; any terminal
    // status is acceptable, but one must arrive.
    assert!(kvs.client.wait(t2, Duration::from_secs(5)).is_some());
}

#[test]
fn completion_is_terminal_and_stable() {
    let kvs = start_kvs(2);

    let ticket = kvs.client.set_async(5, 50).unwrap();
    let status = kvs.client.wait(ticket, Duration::from_secs(5)).expect("must complete");
    assert_eq!(status, RESPONSE_SUCCESS);

    // A published status does not revert
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(kvs.client.wait(ticket, Duration::from_millis(1)), Some(status));
}

#[test]
fn unknown_command_gets_failed_response() {
    let backing = Backing::new();
    let ctx = unsafe { Ctx::initialize_in_place(backing.ptr, backing.layout.size()) }.unwrap();
    let server = KvsServer::new(ctx, 2);
    assert!(server.start(1));

    let ticket = 7777u64;
    ctx.responses().clear(ticket);

    let bogus = Task {
        cmd: 99,
        key: 1,
        value: 0,
        has_value: false,
        client_pid: 1,
        ticket,
    };
    assert!(ctx.ring().try_enqueue(bogus, MAX_RETRIES));

    // The worker must answer FAILED rather than leaving the slot pending
    let start = Instant::now();
    while !ctx.responses().is_complete(ticket) {
        assert!(start.elapsed() < Duration::from_secs(5), "no response to unknown command");
        std::thread::sleep(Duration::from_micros(100));
    }
    assert_eq!(ctx.responses().slot_for(ticket).status(), RESPONSE_FAILED);

    server.stop();
}

#[test]
fn timeout_without_workers() {
    let backing = Backing::new();
    let ctx = unsafe { Ctx::initialize_in_place(backing.ptr, backing.layout.size()) }.unwrap();
    let client: KvsClient<i32, i32> = KvsClient::new(ctx);

    // Nobody is draining the ring: the wait must give up at the deadline
    let start = Instant::now();
    assert!(!client.set_timeout(1, 10, Duration::from_millis(50)));
    assert!(start.elapsed() >= Duration::from_millis(50));

    assert_eq!(client.get_timeout(1, Duration::from_millis(50)), None);
}

#[test]
fn server_lifecycle() {
    let kvs = start_kvs(3);

    assert!(kvs.server.is_running());
    assert_eq!(kvs.server.worker_count(), 3);

    // A running server refuses a second start
    assert!(!kvs.server.start(2));
    assert_eq!(kvs.server.worker_count(), 3);

    kvs.server.stop();
    assert!(!kvs.server.is_running());
    assert_eq!(kvs.server.worker_count(), 0, "all workers joined after stop");

    // stop is idempotent
    kvs.server.stop();
    assert!(!kvs.server.is_running());

    // The pool can be started again after a stop
    assert!(kvs.server.start(1));
    assert!(kvs.client.set(1, 2));
    kvs.server.stop();
}

#[test]
fn client_queue_introspection() {
    let kvs = start_kvs(2);

    assert!(!kvs.client.is_queue_full());
    assert!(kvs.client.set(1, 1));

    // Quiescent after the round trip
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(kvs.client.queue_size(), 0);
}
