use thiserror::Error;

/// Recoverable failures reported by [`crate::BCQueue`].
///
/// Allocation failure is not represented here: it aborts the process through the global
/// allocator, which never leaves the queue's lock held by a live thread.
#[derive(Error, Eq, PartialEq, Clone, Copy, Debug)]
pub enum BCQueueError {
    /// The queue was constructed with a capacity of zero.
    #[error("invalid arguments")]
    InvalidArgs,
    /// A non-blocking enqueue found the queue at capacity.
    #[error("queue full")]
    OutOfSpace,
    /// A non-blocking dequeue found the queue empty.
    #[error("queue empty")]
    EmptyQueue,
    /// A timed enqueue or dequeue gave up before the queue changed state.
    #[error("timed out waiting on queue")]
    Timeout,
}
