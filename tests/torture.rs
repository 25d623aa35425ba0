// Randomized mixed workload: 8 submitter threads sharing one thread-safe
// client against one worker pool, followed by a quiescent consistency pass.
//
// One shared handle keeps tickets globally unique, which keeps live tickets
// from colliding modulo the response table; the submission protocol only
// tolerates colliding live tickets by caller convention.

use rand::Rng;
use shmkv::Core::context::SharedContext;
use shmkv::KVS::{KvsClient, KvsServer};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

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

const SUBMITTERS: usize = 8;
const OPS_PER_SUBMITTER: usize = 1000;
const KEY_SPACE: i32 = 64;
const WAIT: Duration = Duration::from_secs(10);

#[test]
fn concurrency_torture() {
    let backing = Backing::new();
    let ctx = unsafe { Ctx::initialize_in_place(backing.ptr, backing.layout.size()) }.unwrap();

    let server = KvsServer::new(ctx, 4);
    assert!(server.start(4));

    let client: Arc<KvsClient<i32, i32>> = Arc::new(KvsClient::new(ctx));

    let mut handles = vec![];
    for _ in 0..SUBMITTERS {
        let client = Arc::clone(&client);
        handles.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let mut last_ticket = 0u64;

            for _ in 0..OPS_PER_SUBMITTER {
                let key = rng.gen_range(0..KEY_SPACE);
                let submitted = match rng.gen_range(0..4) {
                    0 => client.get_async(key),
                    1 => client.set_async(key, key * 10),
                    2 => client.post_async(key, key * 10),
                    _ => client.del_async(key),
                };

                // The ring is far larger than the in-flight window of the
                // synchronous submitters, so submission must succeed.
                let ticket = submitted.expect("submission must not hit a full ring");
                assert!(ticket > last_ticket, "tickets seen by one thread must increase");
                last_ticket = ticket;

                // Every submission must reach a terminal status.
                let status = client.wait(ticket, WAIT);
                assert!(status.is_some(), "operation timed out under torture");
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    // Quiescent oracle: delete everything, counting what was present.
    let present_before = server.storage_size();
    let mut deleted = 0usize;
    for key in 0..KEY_SPACE {
        if client.del_timeout(key, WAIT) {
            deleted += 1;
        }
    }
    assert_eq!(deleted, present_before, "every stored key must be deletable exactly once");
    assert_eq!(server.storage_size(), 0);

    // Rebuild a known state and verify every read.
    for key in 0..KEY_SPACE {
        assert!(client.set_timeout(key, key * 7, WAIT));
    }
    for key in 0..KEY_SPACE {
        assert_eq!(client.get_timeout(key, WAIT), Some(key * 7));
    }
    assert_eq!(server.storage_size(), KEY_SPACE as usize);

    server.stop();
    assert!(!server.is_running());
}
