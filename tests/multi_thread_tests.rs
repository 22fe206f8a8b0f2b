#[cfg(test)]
mod multi_thread_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use yep_bcq::{BCQueue, BCQueueError, BCQueueValue};

    use test_support::utils::{assert_blocked, join_within, split_evenly, wait_for};

    const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    /**
     * Three producers each enqueue 1 a thousand times into a queue of ten; three consumers each
     * dequeue a thousand times. Everything produced must be consumed and the queue left empty.
     */
    fn three_by_three_sum_test() {
        let capacity: usize = 10;
        let num_producers = 3;
        let num_consumers = 3;
        let items_per_thread = 1000;

        let queue = BCQueue::new(capacity).unwrap();

        let total_consumed: BCQueueValue = std::thread::scope(|s| {
            let mut consumers = Vec::with_capacity(num_consumers);
            for i in 0..num_consumers {
                let builder = std::thread::Builder::new().name(format!("consumer_{i}"));
                let queue = &queue;
                consumers.push(
                    builder
                        .spawn_scoped(s, move || {
                            let mut local_sum: BCQueueValue = 0;
                            for _ in 0..items_per_thread {
                                local_sum += queue.dequeue();
                                assert!(queue.size() <= capacity);
                            }
                            local_sum
                        })
                        .unwrap(),
                );
            }

            for i in 0..num_producers {
                let builder = std::thread::Builder::new().name(format!("producer_{i}"));
                let queue = &queue;
                builder
                    .spawn_scoped(s, move || {
                        for _ in 0..items_per_thread {
                            queue.enqueue(1);
                        }
                    })
                    .unwrap();
            }

            consumers
                .into_iter()
                .map(|consumer| consumer.join().expect("consumer panicked"))
                .sum()
        });

        assert_eq!(queue.size(), 0);
        assert_eq!(queue.sum(), 0);
        assert_eq!(total_consumed, (num_producers * items_per_thread) as BCQueueValue);
    }

    #[test]
    /**
     * Producers send distinct ids; consumers drain with uneven shares. The multiset received
     * must equal the multiset sent, and each producer's ids must arrive in the order it sent
     * them as seen by any single consumer.
     */
    fn no_lost_or_duplicated_values_test() {
        let capacity: usize = 7;
        let num_producers: u32 = 4;
        let num_consumers: u32 = 3;
        let per_producer: u32 = 2500;
        let total = num_producers * per_producer;

        let queue = BCQueue::new(capacity).unwrap();
        let shares = split_evenly(total, num_consumers);

        let received: Vec<Vec<BCQueueValue>> = std::thread::scope(|s| {
            let consumers: Vec<_> = shares
                .iter()
                .map(|&share| {
                    let queue = &queue;
                    s.spawn(move || (0..share).map(|_| queue.dequeue()).collect::<Vec<_>>())
                })
                .collect();

            for producer in 0..num_producers {
                let queue = &queue;
                s.spawn(move || {
                    for seq in 0..per_producer {
                        // producer id in the high bits, sequence number in the low bits
                        queue.enqueue(((producer as BCQueueValue) << 32) | seq as BCQueueValue);
                    }
                });
            }

            consumers.into_iter().map(|c| c.join().unwrap()).collect()
        });

        let mut counts: HashMap<BCQueueValue, u32> = HashMap::new();
        for values in &received {
            // FIFO: per consumer, each producer's sequence numbers only go up
            let mut last_seq: HashMap<BCQueueValue, BCQueueValue> = HashMap::new();
            for &value in values {
                let (producer, seq) = (value >> 32, value & 0xFFFF_FFFF);
                if let Some(prev) = last_seq.insert(producer, seq) {
                    assert!(prev < seq, "producer {producer} reordered: {prev} then {seq}");
                }
                *counts.entry(value).or_default() += 1;
            }
        }

        assert_eq!(counts.len(), total as usize, "missing values");
        assert!(counts.values().all(|&n| n == 1), "duplicated values");
        assert_eq!(queue.size(), 0);
    }

    #[test]
    /**
     * With a single consumer, values from one producer come out in exactly the order enqueued
     * even while other producers interleave with it.
     */
    fn fifo_with_single_consumer_test() {
        let queue = BCQueue::new(3).unwrap();
        let num_producers = 3;
        let per_producer: BCQueueValue = 1000;

        let drained: Vec<BCQueueValue> = std::thread::scope(|s| {
            for producer in 0..num_producers {
                let queue = &queue;
                s.spawn(move || {
                    for seq in 0..per_producer {
                        queue.enqueue(producer * per_producer + seq);
                    }
                });
            }

            (0..num_producers * per_producer)
                .map(|_| queue.dequeue())
                .collect()
        });

        for producer in 0..num_producers {
            let from_producer: Vec<_> = drained
                .iter()
                .copied()
                .filter(|v| v / per_producer == producer)
                .collect();
            let expected: Vec<_> = (0..per_producer)
                .map(|seq| producer * per_producer + seq)
                .collect();
            assert_eq!(from_producer, expected);
        }
    }

    #[test]
    /**
     * Capacity one: enqueue(5) succeeds at once, a second enqueue(7) blocks until dequeue()
     * hands back 5, after which 7 is next out.
     */
    fn capacity_one_handoff_test() {
        let queue = Arc::new(BCQueue::new(1).unwrap());
        queue.enqueue(5);

        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.enqueue(7))
        };

        assert_blocked(&producer, "enqueue(7) on a full queue");
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.sum(), 5);

        assert_eq!(queue.dequeue(), 5);
        join_within(producer, JOIN_TIMEOUT, "enqueue(7) after dequeue");

        assert_eq!(queue.dequeue(), 7);
        assert!(queue.is_empty());
    }

    #[test]
    fn blocked_dequeue_released_by_enqueue_test() {
        let queue = Arc::new(BCQueue::new(4).unwrap());

        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.dequeue())
        };

        assert_blocked(&consumer, "dequeue() on an empty queue");
        queue.enqueue(42);

        assert_eq!(join_within(consumer, JOIN_TIMEOUT, "dequeue() after enqueue"), 42);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    /**
     * Several producers blocked on a full queue all get through once a consumer frees slots one
     * at a time, since every dequeue signals one producer.
     */
    fn many_blocked_producers_released_test() {
        let queue = Arc::new(BCQueue::new(2).unwrap());
        queue.enqueue(0);
        queue.enqueue(0);

        let producers: Vec<_> = (1..=4)
            .map(|value| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || queue.enqueue(value))
            })
            .collect();

        for producer in &producers {
            assert_blocked(producer, "producer on a full queue");
        }

        let mut drained = Vec::new();
        for _ in 0..6 {
            drained.push(queue.dequeue());
        }
        for producer in producers {
            join_within(producer, JOIN_TIMEOUT, "released producer");
        }

        drained.sort_unstable();
        assert_eq!(drained, vec![0, 0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn timed_waits_released_before_deadline_test() {
        let queue = Arc::new(BCQueue::new(1).unwrap());

        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.dequeue_timeout(JOIN_TIMEOUT))
        };
        assert_blocked(&consumer, "dequeue_timeout() on an empty queue");
        queue.enqueue(11);
        assert_eq!(join_within(consumer, JOIN_TIMEOUT, "timed dequeue"), Ok(11));

        queue.enqueue(12);
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.enqueue_timeout(13, JOIN_TIMEOUT))
        };
        assert_blocked(&producer, "enqueue_timeout() on a full queue");
        assert_eq!(queue.dequeue(), 12);
        assert_eq!(join_within(producer, JOIN_TIMEOUT, "timed enqueue"), Ok(()));
        assert_eq!(queue.dequeue(), 13);
    }

    #[test]
    fn timed_wait_gives_up_test() {
        let queue = BCQueue::new(1).unwrap();
        queue.enqueue(1);

        let start = std::time::Instant::now();
        assert_eq!(
            queue.enqueue_timeout(2, Duration::from_millis(50)),
            Err(BCQueueError::Timeout)
        );
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(queue.sum(), 1);
    }

    #[test]
    /**
     * Sum never observes a half-linked or half-removed node: with only 1s flowing through, every
     * snapshot lies between 0 and capacity, and once everyone stops the snapshot equals what
     * draining actually yields.
     */
    fn sum_consistency_test() {
        let capacity: usize = 16;
        let queue = BCQueue::new(capacity).unwrap();
        let residual = 10;
        let producers_done = AtomicBool::new(false);

        std::thread::scope(|s| {
            let producers: Vec<_> = (0..3)
                .map(|_| {
                    let queue = &queue;
                    s.spawn(move || {
                        for _ in 0..1000 {
                            queue.enqueue(1);
                        }
                    })
                })
                .collect();

            let consumer = s.spawn(|| {
                for _ in 0..3000 - residual {
                    assert_eq!(queue.dequeue(), 1);
                }
            });

            let observer = s.spawn(|| {
                while !producers_done.load(Ordering::Acquire) {
                    let sum = queue.sum();
                    assert!((0..=capacity as BCQueueValue).contains(&sum), "bad sum {sum}");
                }
            });

            for producer in producers {
                producer.join().unwrap();
            }
            consumer.join().unwrap();
            producers_done.store(true, Ordering::Release);
            observer.join().unwrap();
        });

        let snapshot = queue.sum();
        assert_eq!(snapshot, residual as BCQueueValue);
        assert_eq!(queue.size(), residual);

        let mut drained: BCQueueValue = 0;
        while let Ok(value) = queue.try_dequeue() {
            drained += value;
        }
        assert_eq!(drained, snapshot);
        assert!(queue.is_empty());
    }

    #[test]
    fn independent_instances_test() {
        let first = BCQueue::new(2).unwrap();
        let second = BCQueue::new(2).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| (0..500).for_each(|_| first.enqueue(1)));
            s.spawn(|| (0..500).for_each(|_| second.enqueue(2)));
            s.spawn(|| {
                for _ in 0..500 {
                    assert_eq!(first.dequeue(), 1);
                }
            });
            s.spawn(|| {
                for _ in 0..500 {
                    assert_eq!(second.dequeue(), 2);
                }
            });
        });

        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn size_is_eventually_observed_test() {
        let queue = Arc::new(BCQueue::new(8).unwrap());
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || (0..8).for_each(|v| queue.enqueue(v)))
        };

        assert!(wait_for(JOIN_TIMEOUT, || queue.is_full()));
        join_within(producer, JOIN_TIMEOUT, "producer");
        assert_eq!(queue.sum(), (0..8).sum::<BCQueueValue>());
    }
}
