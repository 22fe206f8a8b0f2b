use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::BCQueueError;
use crate::queue_list::BCQueueList;
use crate::trace::{debug, trace};

/// The element type carried by [`BCQueue`].
pub type BCQueueValue = i64;

/// Bounded FIFO queue of [`BCQueueValue`]s shared between any number of producer and consumer
/// threads.
///
/// A single mutex guards the node chain and its element count. Two condition variables sit next
/// to it: producers wait on `not_full` while the queue holds `capacity` elements, and consumers
/// wait on `not_empty` while it holds none. Every successful insertion wakes at most one waiting
/// consumer and every successful removal wakes at most one waiting producer. Waiters always
/// re-check their predicate after waking, so spurious wakeups and competing waiters are harmless.
///
/// Wakeups are not fair. Which of several blocked producers (or consumers) is released by a
/// signal is left to the platform's condition variable, not the order in which they started
/// waiting.
///
/// Values come out in the order they were linked into the chain. Two producers racing each other
/// may be linked in either order, but once linked, removal is strictly oldest first.
///
/// Share an instance between threads by reference (e.g. with [`std::thread::scope`]) or through
/// an [`std::sync::Arc`]. Dropping the queue releases any values still inside it.
pub struct BCQueue {
    list: Mutex<BCQueueList>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl BCQueue {
    /// Create an empty queue that holds at most `capacity` values.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of values the queue holds before producers block.
    ///
    /// # Returns
    /// An empty queue, ready to be shared between threads.
    ///
    /// # Errors
    /// Returns `BCQueueError::InvalidArgs` when `capacity` is zero, since every producer of such a
    /// queue would block forever.
    ///
    /// # Examples
    /// ```
    /// use yep_bcq::{BCQueue, BCQueueError};
    ///
    /// let queue = BCQueue::new(4).unwrap();
    /// assert_eq!(queue.capacity(), 4);
    /// assert_eq!(queue.size(), 0);
    ///
    /// assert_eq!(BCQueue::new(0).unwrap_err(), BCQueueError::InvalidArgs);
    /// ```
    pub fn new(capacity: usize) -> Result<BCQueue, BCQueueError> {
        if capacity == 0 {
            return Err(BCQueueError::InvalidArgs);
        }

        debug!(capacity, "created bounded queue");

        Ok(BCQueue {
            list: Mutex::new(BCQueueList::new()),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        })
    }

    /// Maximum number of values the queue holds. Fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `value`, blocking while the queue is full.
    ///
    /// The call returns once the value is linked at the tail. There is no timeout: if no consumer
    /// ever frees a slot, the caller waits forever. See [`enqueue_timeout`](Self::enqueue_timeout)
    /// for a bounded wait.
    ///
    /// # Examples
    /// ```
    /// use yep_bcq::BCQueue;
    ///
    /// let queue = BCQueue::new(2).unwrap();
    /// queue.enqueue(5);
    /// queue.enqueue(7);
    /// assert_eq!(queue.size(), 2);
    /// assert_eq!(queue.sum(), 12);
    /// ```
    pub fn enqueue(&self, value: BCQueueValue) {
        let mut list = self.lock();
        while list.len() >= self.capacity {
            trace!(value, "queue full, producer waiting");
            list = self.not_full.wait(list).unwrap_or_else(PoisonError::into_inner);
        }

        self.link(&mut list, value);
    }

    /// Remove and return the oldest value, blocking while the queue is empty.
    ///
    /// There is no timeout: if no producer ever adds a value, the caller waits forever. See
    /// [`dequeue_timeout`](Self::dequeue_timeout) for a bounded wait.
    ///
    /// # Examples
    /// ```
    /// use yep_bcq::BCQueue;
    ///
    /// let queue = BCQueue::new(2).unwrap();
    /// queue.enqueue(5);
    /// queue.enqueue(7);
    /// assert_eq!(queue.dequeue(), 5);
    /// assert_eq!(queue.dequeue(), 7);
    /// ```
    pub fn dequeue(&self) -> BCQueueValue {
        let mut list = self.lock();
        loop {
            if let Some(value) = self.unlink(&mut list) {
                return value;
            }

            trace!("queue empty, consumer waiting");
            list = self.not_empty.wait(list).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Append `value` without blocking.
    ///
    /// # Errors
    /// Returns `BCQueueError::OutOfSpace` when the queue already holds `capacity` values.
    ///
    /// # Examples
    /// ```
    /// use yep_bcq::{BCQueue, BCQueueError};
    ///
    /// let queue = BCQueue::new(1).unwrap();
    /// queue.try_enqueue(1).unwrap();
    /// assert_eq!(queue.try_enqueue(2).unwrap_err(), BCQueueError::OutOfSpace);
    /// ```
    pub fn try_enqueue(&self, value: BCQueueValue) -> Result<(), BCQueueError> {
        let mut list = self.lock();
        if list.len() >= self.capacity {
            return Err(BCQueueError::OutOfSpace);
        }

        self.link(&mut list, value);
        Ok(())
    }

    /// Remove and return the oldest value without blocking.
    ///
    /// # Errors
    /// Returns `BCQueueError::EmptyQueue` when there is nothing to remove.
    pub fn try_dequeue(&self) -> Result<BCQueueValue, BCQueueError> {
        let mut list = self.lock();
        self.unlink(&mut list).ok_or(BCQueueError::EmptyQueue)
    }

    /// Append `value`, blocking for at most `timeout` while the queue is full.
    ///
    /// The full condition is re-checked after every wake and once more before giving up, so a
    /// producer that is signalled right as its deadline passes still takes the freed slot.
    ///
    /// # Arguments
    /// * `value` - Value to link at the tail.
    /// * `timeout` - Maximum time to wait for space before returning `BCQueueError::Timeout`.
    ///
    /// # Errors
    /// Returns `BCQueueError::Timeout` if the queue stayed full for the whole of `timeout`. The
    /// value is not enqueued in that case.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use yep_bcq::{BCQueue, BCQueueError};
    ///
    /// let queue = BCQueue::new(1).unwrap();
    /// let timeout = Duration::from_millis(1);
    ///
    /// queue.enqueue_timeout(1, timeout).unwrap();
    /// assert_eq!(queue.enqueue_timeout(2, timeout).unwrap_err(), BCQueueError::Timeout);
    /// assert_eq!(queue.size(), 1);
    /// ```
    pub fn enqueue_timeout(
        &self,
        value: BCQueueValue,
        timeout: Duration,
    ) -> Result<(), BCQueueError> {
        let start_time = Instant::now();
        let mut list = self.lock();
        while list.len() >= self.capacity {
            // Recalculate remaining timeout before each wait
            let remaining_timeout = match timeout.checked_sub(start_time.elapsed()) {
                Some(t) if !t.is_zero() => t,
                _ => {
                    debug!(value, ?timeout, "enqueue timed out on full queue");
                    return Err(BCQueueError::Timeout);
                }
            };

            trace!(value, ?remaining_timeout, "queue full, producer waiting");
            let (new_list, _) = self
                .not_full
                .wait_timeout(list, remaining_timeout)
                .unwrap_or_else(PoisonError::into_inner);
            list = new_list;
        }

        self.link(&mut list, value);
        Ok(())
    }

    /// Remove and return the oldest value, blocking for at most `timeout` while the queue is
    /// empty.
    ///
    /// # Errors
    /// Returns `BCQueueError::Timeout` if the queue stayed empty for the whole of `timeout`.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use yep_bcq::{BCQueue, BCQueueError};
    ///
    /// let queue = BCQueue::new(4).unwrap();
    /// let timeout = Duration::from_millis(1);
    ///
    /// assert_eq!(queue.dequeue_timeout(timeout).unwrap_err(), BCQueueError::Timeout);
    /// queue.enqueue(9);
    /// assert_eq!(queue.dequeue_timeout(timeout), Ok(9));
    /// ```
    pub fn dequeue_timeout(&self, timeout: Duration) -> Result<BCQueueValue, BCQueueError> {
        let start_time = Instant::now();
        let mut list = self.lock();
        loop {
            if let Some(value) = self.unlink(&mut list) {
                return Ok(value);
            }

            let remaining_timeout = match timeout.checked_sub(start_time.elapsed()) {
                Some(t) if !t.is_zero() => t,
                _ => {
                    debug!(?timeout, "dequeue timed out on empty queue");
                    return Err(BCQueueError::Timeout);
                }
            };

            trace!(?remaining_timeout, "queue empty, consumer waiting");
            let (new_list, _) = self
                .not_empty
                .wait_timeout(list, remaining_timeout)
                .unwrap_or_else(PoisonError::into_inner);
            list = new_list;
        }
    }

    /// Number of values currently in the queue.
    ///
    /// This is a snapshot taken under the lock; concurrent producers and consumers may change it
    /// before the caller looks at it.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Total of every value currently in the queue.
    ///
    /// The whole chain is walked under the lock, so the result matches a single instant and
    /// concurrent enqueues and dequeues wait for the walk to finish. Addition wraps on overflow.
    ///
    /// # Examples
    /// ```
    /// use yep_bcq::BCQueue;
    ///
    /// let queue = BCQueue::new(8).unwrap();
    /// for value in [1, 2, 3, -4] {
    ///     queue.enqueue(value);
    /// }
    /// assert_eq!(queue.sum(), 2);
    /// ```
    pub fn sum(&self) -> BCQueueValue {
        self.lock().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    /// Tear the queue down, releasing any values still inside it.
    ///
    /// Taking `self` by value means no other thread can still be using the queue. Dropping the
    /// queue has the same effect; this only additionally reports how many values were discarded.
    ///
    /// # Returns
    /// The number of values that were still queued.
    ///
    /// # Examples
    /// ```
    /// use yep_bcq::BCQueue;
    ///
    /// let queue = BCQueue::new(4).unwrap();
    /// queue.enqueue(1);
    /// queue.enqueue(2);
    /// assert_eq!(queue.destroy(), 2);
    /// ```
    pub fn destroy(self) -> usize {
        let mut list = self.list.into_inner().unwrap_or_else(PoisonError::into_inner);
        let released = list.clear();
        debug!(released, "destroyed bounded queue");

        released
    }

    /// The list is only ever mutated by code that can't panic partway through, so a poisoned
    /// lock still guards a consistent chain.
    fn lock(&self) -> MutexGuard<'_, BCQueueList> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Link `value` and wake one waiting consumer. The caller has checked for space.
    fn link(&self, list: &mut BCQueueList, value: BCQueueValue) {
        debug_assert!(list.len() < self.capacity);
        list.push_back(value);
        self.not_empty.notify_one();
    }

    /// Unlink the head and wake one waiting producer, if there was anything to unlink.
    fn unlink(&self, list: &mut BCQueueList) -> Option<BCQueueValue> {
        let value = list.pop_front()?;
        self.not_full.notify_one();
        Some(value)
    }
}

impl fmt::Debug for BCQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BCQueue")
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .finish()
    }
}
