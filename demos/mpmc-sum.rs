//! Producers enqueue a fixed value, consumers dequeue and sum, and the totals are checked at the
//! end.
//!
//! With the defaults this is three producers and three consumers moving 3000 ones through a
//! queue of ten, which forces plenty of blocking on both sides.

use clap::Parser;
use std::process::ExitCode;
use std::thread;
use test_support::utils::split_evenly;
use yep_bcq::{BCQueue, BCQueueValue};

/// Multi-producer, multi-consumer sum check over a BCQueue
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Queue capacity (small values force producers and consumers to block)
    #[arg(short = 'd', long, default_value = "10")]
    queue_depth: usize,

    /// Number of producer threads
    #[arg(short = 'p', long, default_value = "3")]
    producer_threads: u32,

    /// Number of consumer threads
    #[arg(short = 'c', long, default_value = "3")]
    consumer_threads: u32,

    /// Values enqueued by each producer
    #[arg(short = 'n', long, default_value = "1000")]
    items_per_producer: u32,

    /// The value every producer enqueues
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    value: BCQueueValue,

    /// Enable verbose logging
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        yep_bcq::trace::init_tracing();
    }

    if args.producer_threads == 0 || args.consumer_threads == 0 {
        panic!("At least one producer and one consumer thread is required");
    }

    let queue = match BCQueue::new(args.queue_depth) {
        Ok(queue) => queue,
        Err(e) => panic!("queue_depth {} rejected: {e}", args.queue_depth),
    };

    let total_items = args.producer_threads * args.items_per_producer;
    let consumer_shares = split_evenly(total_items, args.consumer_threads);

    println!("--- Starting mpmc sum check ---");
    println!("  Queue depth: {}", args.queue_depth);
    println!("  Producer threads: {}", args.producer_threads);
    println!("  Consumer threads: {}", args.consumer_threads);
    println!("  Items per producer: {}", args.items_per_producer);

    let start_time = std::time::Instant::now();

    let total_consumed: BCQueueValue = thread::scope(|s| {
        let consumers: Vec<_> = consumer_shares
            .iter()
            .copied()
            .enumerate()
            .map(|(id, share)| {
                let queue = &queue;
                s.spawn(move || {
                    let mut local_sum: BCQueueValue = 0;
                    for _ in 0..share {
                        local_sum = local_sum.wrapping_add(queue.dequeue());
                    }
                    println!("Consumer {id} finished. Local sum: {local_sum}");
                    local_sum
                })
            })
            .collect();

        for id in 0..args.producer_threads {
            let queue = &queue;
            let value = args.value;
            let items = args.items_per_producer;
            s.spawn(move || {
                for _ in 0..items {
                    queue.enqueue(value);
                }
                println!("Producer {id} finished.");
            });
        }

        consumers
            .into_iter()
            .map(|consumer| consumer.join().expect("consumer thread panicked"))
            .fold(0, BCQueueValue::wrapping_add)
    });

    let elapsed = start_time.elapsed();
    let final_size = queue.size();
    let expected_total = args.value.wrapping_mul(total_items as BCQueueValue);

    println!("\n--- Results ---");
    println!("Elapsed: {elapsed:?}");
    println!("Final queue size: {final_size} (expected: 0)");
    println!("Total consumed: {total_consumed} (expected: {expected_total})");

    if final_size == 0 && total_consumed == expected_total {
        println!("SUCCESS: every value produced was consumed exactly once");
        ExitCode::SUCCESS
    } else {
        println!("FAILURE: data loss or race condition detected");
        ExitCode::FAILURE
    }
}
