//! A queue of capacity one handing values between two threads.
//!
//! The second enqueue has to wait until the main thread dequeues the first value.

use clap::Parser;
use std::thread;
use std::time::Duration;
use yep_bcq::BCQueue;

/// Capacity-one handoff demonstration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// How long to leave the second producer blocked, in milliseconds
    #[arg(short = 'w', long, default_value = "250")]
    wait_ms: u64,

    /// Enable verbose logging
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        yep_bcq::trace::init_tracing();
    }

    let queue = BCQueue::new(1).expect("capacity one is valid");

    queue.enqueue(5);
    println!("enqueue(5) returned, size = {}", queue.size());

    thread::scope(|s| {
        let producer = s.spawn(|| {
            println!("producer: enqueue(7) ...");
            queue.enqueue(7);
            println!("producer: enqueue(7) returned");
        });

        thread::sleep(Duration::from_millis(args.wait_ms));
        println!(
            "after {}ms the producer is {}",
            args.wait_ms,
            if producer.is_finished() { "done" } else { "still blocked" }
        );

        let first = queue.dequeue();
        println!("dequeue() = {first}");

        producer.join().expect("producer thread panicked");
    });

    let second = queue.dequeue();
    println!("dequeue() = {second}");
    assert_eq!((queue.size(), queue.sum()), (0, 0));
}
