// In demos/client.rs
use shmkv::KVS::KvsBuilder;
use std::env;
use std::time::Instant;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <num_operations> [shm_name]", args[0]);
        eprintln!("  shm_name: optional, POSIX object name (default: /shmkv_demo)");
        std::process::exit(1);
    }

    let num_operations: usize = args[1].parse().expect("Invalid number of operations");
    let shm_name = args.get(2).map(String::as_str).unwrap_or("/shmkv_demo");

    println!("Client: Attaching to region {shm_name}");

    let client = KvsBuilder::new()
        .with_shm_name(shm_name)
        .build_client::<i32, i32>()?;

    println!("Client: Connected (pid {})", client.client_pid());

    // Scripted smoke workload first: every command once
    println!("\nClient: Scripted workload");
    println!("  SET 7 = 700        -> {}", client.set(7, 700));
    println!("  GET 7              -> {:?}", client.get(7));
    println!("  POST 7 = 999       -> {} (expected false, key exists)", client.post(7, 999));
    println!("  POST 8 = 800       -> {}", client.post(8, 800));
    println!("  DELETE 7           -> {}", client.del(7));
    println!("  GET 7              -> {:?} (expected None)", client.get(7));

    // Timed mixed loop over a small key space
    println!("\nClient: Running {num_operations} mixed operations...");

    let start = Instant::now();
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for i in 0..num_operations {
        let key = (i % 64) as i32;
        let ok = match i % 4 {
            0 => client.set(key, key * 100),
            1 => client.get(key).is_some(),
            2 => client.post(key + 1000, key),
            _ => client.del(key + 1000),
        };

        if ok {
            succeeded += 1;
        } else {
            failed += 1;
        }

        // Progress indicator
        if (i + 1) % 1000 == 0 {
            println!("  {} operations issued", i + 1);
        }
    }

    let elapsed = start.elapsed();

    // Print statistics
    println!("\n{}", "=".repeat(80));
    println!("CLIENT STATISTICS");
    println!("{}", "=".repeat(80));
    println!("Operations:       {num_operations}");
    println!("Succeeded:        {succeeded}");
    println!("Failed/absent:    {failed}");
    println!("Time taken:       {elapsed:.3?}");
    println!(
        "Throughput:       {:.2} ops/sec",
        num_operations as f64 / elapsed.as_secs_f64()
    );
    println!("Queue size now:   {}", client.queue_size());
    println!("{}", "=".repeat(80));

    Ok(())
}
