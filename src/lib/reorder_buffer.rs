//! Reordering buffer for out-of-order record completion.
//!
//! Sequence numbers are reserved in increasing order when records are dispatched;
//! the finished items are provided in any order and released strictly in sequence
//! order, without gaps or repeats.
//!
//! # Example
//!
//! ```
//! use multifold_lib::reorder_buffer::ReorderBuffer;
//!
//! let mut buffer: ReorderBuffer<String> = ReorderBuffer::new();
//! for seq in 0..3 {
//!     buffer.reserve(seq).unwrap();
//! }
//!
//! // Provide items out of order
//! buffer.provide(2, "third".to_string()).unwrap();
//! buffer.provide(0, "first".to_string()).unwrap();
//! assert_eq!(buffer.try_pop_next(), Some("first".to_string()));
//! assert_eq!(buffer.try_pop_next(), None);
//!
//! buffer.provide(1, "second".to_string()).unwrap();
//! let rest: Vec<_> = buffer.drain_ready().collect();
//! assert_eq!(rest, vec!["second".to_string(), "third".to_string()]);
//! let (stranded, closed) = buffer.close();
//! assert!(stranded.is_empty());
//! assert!(closed.is_ok());
//! ```

use std::collections::VecDeque;

use crate::errors::{MultifoldError, Result};

/// State of a reserved sequence number.
#[derive(Debug)]
enum Slot<T> {
    /// Reserved at dispatch, not yet provided.
    Reserved,
    /// Provided and waiting for all earlier numbers.
    Ready(T),
}

/// A buffer that releases items in sequential order.
///
/// Items can be provided with any reserved sequence number, but they are only
/// released when all prior sequence numbers have been released.
///
/// Uses a `VecDeque` of slots indexed by `seq - next_seq` for O(1) reserve,
/// provide and pop.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    /// `slots[k]` holds sequence number `next_seq + k`.
    slots: VecDeque<Slot<T>>,
    /// Next sequence number to release.
    next_seq: u64,
    /// Number of provided items currently stored.
    ready: usize,
    /// Whether the next sequential item is ready to pop. Updated on provide/pop.
    can_pop: bool,
}

impl<T> ReorderBuffer<T> {
    /// Create a new reorder buffer starting at sequence number 0.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a reorder buffer whose first sequence number is `first`.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self { slots: VecDeque::new(), next_seq: first, ready: 0, can_pop: false }
    }

    /// The next sequence number [`reserve`](Self::reserve) will accept.
    #[must_use]
    pub fn next_reservation(&self) -> u64 {
        self.next_seq + self.slots.len() as u64
    }

    /// Announces that `seq` will eventually be provided.
    ///
    /// # Errors
    ///
    /// Returns [`MultifoldError::OrderingViolation`] unless `seq` is exactly the next
    /// unreserved sequence number.
    pub fn reserve(&mut self, seq: u64) -> Result<()> {
        let expected = self.next_reservation();
        if seq != expected {
            return Err(MultifoldError::OrderingViolation {
                seq,
                reason: format!("reserved out of order (expected {expected})"),
            });
        }
        self.slots.push_back(Slot::Reserved);
        Ok(())
    }

    /// Provides the item for a reserved sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`MultifoldError::OrderingViolation`] if `seq` was already released,
    /// never reserved, or already provided.
    pub fn provide(&mut self, seq: u64, item: T) -> Result<()> {
        if seq < self.next_seq {
            return Err(MultifoldError::OrderingViolation {
                seq,
                reason: "was already flushed".to_string(),
            });
        }
        let index = (seq - self.next_seq) as usize;
        let Some(slot) = self.slots.get_mut(index) else {
            return Err(MultifoldError::OrderingViolation {
                seq,
                reason: "was never reserved".to_string(),
            });
        };
        if matches!(slot, Slot::Ready(_)) {
            return Err(MultifoldError::OrderingViolation {
                seq,
                reason: "was provided twice".to_string(),
            });
        }
        *slot = Slot::Ready(item);
        self.ready += 1;

        if index == 0 {
            self.can_pop = true;
        }
        Ok(())
    }

    /// Pop the next sequential item if available.
    ///
    /// This advances the internal sequence counter, so subsequent calls
    /// will return the next item in sequence.
    #[must_use]
    pub fn try_pop_next(&mut self) -> Option<T> {
        if !self.can_pop {
            return None;
        }
        let Some(Slot::Ready(item)) = self.slots.pop_front() else {
            // can_pop is only set when the front slot is ready
            self.can_pop = false;
            return None;
        };
        self.next_seq += 1;
        self.ready -= 1;
        self.can_pop = matches!(self.slots.front(), Some(Slot::Ready(_)));
        Some(item)
    }

    /// Drain all consecutive ready items starting from the current sequence.
    ///
    /// Returns an iterator that yields items in sequence order, stopping
    /// when it reaches a number that has not been provided yet.
    pub fn drain_ready(&mut self) -> DrainReady<'_, T> {
        DrainReady { buffer: self }
    }

    /// Releases the buffer.
    ///
    /// Items provided behind a gap are handed back in sequence order, together with
    /// [`MultifoldError::IncompleteOutput`] if any reserved sequence number was never
    /// provided.
    pub fn close(self) -> (Vec<T>, Result<()>) {
        let first = self.next_seq;
        let mut missing = 0_u64;
        let mut stranded = Vec::with_capacity(self.ready);
        for slot in self.slots {
            match slot {
                Slot::Reserved => missing += 1,
                Slot::Ready(item) => stranded.push(item),
            }
        }
        let result = if missing > 0 {
            Err(MultifoldError::IncompleteOutput { missing, first })
        } else {
            Ok(())
        };
        (stranded, result)
    }

    /// Check if no provided item is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready == 0
    }

    /// Number of provided items waiting for earlier sequence numbers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ready
    }

    /// Number of reserved sequence numbers not yet provided.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.slots.len() - self.ready
    }

    /// Get the next sequence number to release.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Check if the next sequential item is ready to pop.
    #[must_use]
    pub fn can_pop(&self) -> bool {
        self.can_pop
    }
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator that drains consecutive ready items from a `ReorderBuffer`.
pub struct DrainReady<'a, T> {
    buffer: &'a mut ReorderBuffer<T>,
}

impl<T> Iterator for DrainReady<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.try_pop_next()
    }
}
