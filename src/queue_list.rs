use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::BCQueueValue;
use crate::trace::debug;

/// a single element of the chain. allocated on push, freed on pop or when the list drops.
struct BCQueueNode {
    value: BCQueueValue,
    next: Option<NonNull<BCQueueNode>>,
}

/// Singly linked FIFO chain guarded by the queue's mutex.
///
/// The list owns every node reachable from `head`. `tail` is a non-owning pointer to the last of
/// those nodes, so appending is O(1). `count` always equals the number of reachable nodes, and
/// `head` is `None` exactly when `tail` is `None`.
pub(crate) struct BCQueueList {
    head: Option<NonNull<BCQueueNode>>,
    tail: Option<NonNull<BCQueueNode>>,
    count: usize,
}

// SAFETY: the list exclusively owns its nodes; moving it to another thread moves the whole chain.
unsafe impl Send for BCQueueList {}

impl BCQueueList {
    pub(crate) const fn new() -> BCQueueList {
        BCQueueList {
            head: None,
            tail: None,
            count: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Link a freshly allocated node holding `value` after the current tail.
    pub(crate) fn push_back(&mut self, value: BCQueueValue) {
        let node = NonNull::from(Box::leak(Box::new(BCQueueNode { value, next: None })));

        match self.tail {
            // SAFETY: `tail` points at the last live node of this list and `&mut self` rules out
            // any other access to it.
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }

        self.tail = Some(node);
        self.count += 1;
    }

    /// Unlink and free the head node, returning its value.
    pub(crate) fn pop_front(&mut self) -> Option<BCQueueValue> {
        self.head.map(|head| {
            // SAFETY: every node was leaked from a `Box` in `push_back`, and the head is unlinked
            // here exactly once before being reclaimed.
            let node = unsafe { Box::from_raw(head.as_ptr()) };

            self.head = node.next;
            if self.head.is_none() {
                self.tail = None;
            }
            self.count -= 1;

            node.value
        })
    }

    /// Total of every linked value. Wraps on overflow instead of panicking.
    pub(crate) fn sum(&self) -> BCQueueValue {
        self.iter().fold(0, |total, value| total.wrapping_add(value))
    }

    /// Free every node, returning how many were released.
    pub(crate) fn clear(&mut self) -> usize {
        let mut released = 0;
        while self.pop_front().is_some() {
            released += 1;
        }

        released
    }

    pub(crate) fn iter(&self) -> BCQueueListIter<'_> {
        BCQueueListIter {
            next: self.head,
            _list: PhantomData,
        }
    }
}

impl Drop for BCQueueList {
    fn drop(&mut self) {
        // iterative, so a long chain can't overflow the stack with recursive drops
        let released = self.clear();
        if released > 0 {
            debug!(released, "released residual queue nodes");
        }
    }
}

/// Head-to-tail iterator over the values of a [`BCQueueList`].
pub(crate) struct BCQueueListIter<'a> {
    next: Option<NonNull<BCQueueNode>>,
    _list: PhantomData<&'a BCQueueList>,
}

impl Iterator for BCQueueListIter<'_> {
    type Item = BCQueueValue;

    fn next(&mut self) -> Option<BCQueueValue> {
        self.next.map(|node| {
            // SAFETY: the shared borrow of the list held by this iterator keeps every node alive
            // and unmodified.
            let node = unsafe { node.as_ref() };
            self.next = node.next;
            node.value
        })
    }
}
