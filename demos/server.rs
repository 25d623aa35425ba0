// In demos/server.rs
use shmkv::KVS::KvsBuilder;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    // Parse worker count (default: hardware parallelism)
    let num_workers: usize = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });

    let shm_name = args
        .get(2)
        .map(String::as_str)
        .unwrap_or("/shmkv_demo")
        .to_string();

    println!("Server: Creating region {shm_name} with {num_workers} workers");

    let server = KvsBuilder::new()
        .with_shm_name(&shm_name)
        .build_server::<i32, i32>()?;

    if !server.start(num_workers) {
        eprintln!("Server: failed to start worker pool");
        std::process::exit(1);
    }

    println!("Server: Ready ({} workers, {} stripes)", server.worker_count(), server.stripe_count());
    println!("Press Ctrl+C to exit...");

    let keep_alive = Arc::new(AtomicBool::new(true));
    let keep_alive_for_handler = Arc::clone(&keep_alive);

    // Handle Ctrl+C to clean up
    ctrlc::set_handler(move || {
        keep_alive_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let mut last_size = usize::MAX;
    while keep_alive.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(500));

        let size = server.storage_size();
        if size != last_size {
            println!("Server: storage holds {size} entries");
            last_size = size;
        }
    }

    println!("Server: Shutting down");
    server.stop();
    println!("Server: Stopped (final storage size: {})", server.storage_size());

    Ok(())
}
