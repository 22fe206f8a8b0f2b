//! A bounded, blocking FIFO queue of integers for sharing work between threads.
//!
//! [`BCQueue`] keeps its values in a linked chain behind one mutex, with a condition variable
//! for "space available" and another for "item available". Producers block while the queue is
//! full and consumers block while it is empty.
//!
//! ```
//! use yep_bcq::BCQueue;
//!
//! let queue = BCQueue::new(10).unwrap();
//!
//! let consumed: i64 = std::thread::scope(|s| {
//!     let consumers: Vec<_> = (0..3)
//!         .map(|_| s.spawn(|| (0..100).map(|_| queue.dequeue()).sum::<i64>()))
//!         .collect();
//!     for _ in 0..3 {
//!         s.spawn(|| (0..100).for_each(|_| queue.enqueue(1)));
//!     }
//!     consumers.into_iter().map(|c| c.join().unwrap()).sum()
//! });
//!
//! assert_eq!(consumed, 300);
//! assert_eq!(queue.size(), 0);
//! ```

/// the bounded queue
pub mod queue;
pub use queue::BCQueue;
pub use queue::BCQueueValue;

/// the linked chain behind the queue's lock
mod queue_list;

/// the errors
pub mod error;
pub use error::BCQueueError;

/// Tracing hooks (optional feature)
pub mod trace;
