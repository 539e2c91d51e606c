//! Fixed-capacity message queue.
//!
//! The queue is a ring of `capacity` slots with a read index and a write
//! index. It is empty when the indices are equal and full when advancing the
//! write index would make it equal to the read index, so one slot always
//! stays unused and a queue of capacity N holds at most N - 1 messages.
//!
//! # Producers and the consumer
//!
//! Any number of producer contexts may call [`MessageQueue::post`] at any
//! time, including while the application loop is draining. A producer takes
//! the queue's [`WidgetMutex`] with a single compare-and-swap and gives up
//! immediately if it is held; the message is then dropped and
//! [`QueueError::Busy`] returned. A full queue likewise drops the message and
//! returns [`QueueError::Full`]. Neither case is retried.
//!
//! Only the [`WidgetContext`](crate::WidgetContext) that owns the queue
//! removes messages. It takes the same mutex while copying a message out and
//! advancing the read index, so a producer rewriting a coalesced pointer-move
//! can never race the read. A producer that interrupts the drain inside that
//! window finds the mutex held and gets [`QueueError::Busy`] like any other
//! clash; outside it, posting during a drain succeeds.
//!
//! # Pointer-move coalescing
//!
//! A pointer-move posted while the newest queued message is also a
//! pointer-move overwrites that message's coordinates instead of taking a new
//! slot. A stream of touch samples therefore occupies one slot no matter how
//! far the consumer falls behind.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crate::error::{QueueError, Result, WidgetError};
use crate::logging::targets;
use crate::message::{Delivery, Message, MessageKind};
use crate::mutex::WidgetMutex;
use crate::widget::WidgetId;

/// Default number of queue slots.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// A message waiting in the queue together with where and how to deliver it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Root of the subtree the message is sent to.
    pub target: WidgetId,
    /// The message itself.
    pub message: Message,
    /// Traversal order and stop-on-success flag.
    pub delivery: Delivery,
}

/// Snapshot of the queue's diagnostic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    /// Messages dropped because the queue was full.
    pub overflows: u32,
    /// Of those, messages other than pointer-move.
    pub non_pointer_overflows: u32,
    /// The most recent non-pointer-move message dropped for lack of space.
    pub last_lost: Option<MessageKind>,
    /// Posts rejected because the mutex was held.
    pub mutex_clashes: u32,
    /// Pointer-moves folded into an already queued pointer-move.
    pub coalesced_moves: u32,
}

#[derive(Debug, Default)]
struct StatCounters {
    overflows: AtomicU32,
    non_pointer_overflows: AtomicU32,
    last_lost: AtomicU32,
    mutex_clashes: AtomicU32,
    coalesced_moves: AtomicU32,
}

/// A bounded ring of pending widget messages.
pub struct MessageQueue {
    slots: Box<[UnsafeCell<Option<QueuedMessage>>]>,
    read: AtomicUsize,
    write: AtomicUsize,
    mutex: WidgetMutex,
    stats: StatCounters,
}

// SAFETY: slot contents are only read or written while `mutex` is held, and
// the indices are atomics that are only advanced under the same mutex.
unsafe impl Sync for MessageQueue {}

static_assertions::assert_impl_all!(MessageQueue: Send, Sync);

impl MessageQueue {
    /// Create a queue with `capacity` slots, one of which stays reserved.
    ///
    /// Fails with [`WidgetError::InvalidQueueCapacity`] for capacities below 2.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 2 {
            return Err(WidgetError::InvalidQueueCapacity(capacity));
        }
        Ok(Self::with_slots(capacity))
    }

    fn with_slots(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| UnsafeCell::new(None)).collect(),
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
            mutex: WidgetMutex::new(),
            stats: StatCounters::default(),
        }
    }

    /// Number of slots, including the reserved one.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of messages currently waiting.
    pub fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        (write + self.capacity() - read) % self.capacity()
    }

    /// Check if no messages are waiting.
    pub fn is_empty(&self) -> bool {
        self.read.load(Ordering::Acquire) == self.write.load(Ordering::Acquire)
    }

    /// Check if the next non-coalesced post would be dropped.
    pub fn is_full(&self) -> bool {
        self.len() + 1 == self.capacity()
    }

    /// Add a message for later delivery to the subtree rooted at `target`.
    ///
    /// Never blocks. Returns [`QueueError::Busy`] if another context holds the
    /// queue mutex and [`QueueError::Full`] if no slot is free; in both cases
    /// the message is dropped.
    pub fn post(
        &self,
        target: WidgetId,
        message: Message,
        delivery: Delivery,
    ) -> std::result::Result<(), QueueError> {
        let Some(_guard) = self.mutex.try_lock() else {
            self.stats.mutex_clashes.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                target: targets::QUEUE,
                kind = %message.kind,
                "queue mutex held, message dropped"
            );
            return Err(QueueError::Busy);
        };

        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Relaxed);
        let next = (write + 1) % self.capacity();

        if message.kind == MessageKind::PointerMove && read != write {
            let newest = (write + self.capacity() - 1) % self.capacity();
            // SAFETY: the mutex is held, and `newest` lies between the read
            // and write indices, so the consumer is not looking at it.
            let slot = unsafe { &mut *self.slots[newest].get() };
            if let Some(queued) = slot
                .as_mut()
                .filter(|queued| queued.message.kind == MessageKind::PointerMove)
            {
                queued.message.param1 = message.param1;
                queued.message.param2 = message.param2;
                self.stats.coalesced_moves.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(target: targets::QUEUE, slot = newest, "coalesced pointer move");
                return Ok(());
            }
        }

        if next == read {
            self.stats.overflows.fetch_add(1, Ordering::Relaxed);
            if message.kind != MessageKind::PointerMove {
                self.stats.non_pointer_overflows.fetch_add(1, Ordering::Relaxed);
                self.stats.last_lost.store(message.kind.as_raw(), Ordering::Relaxed);
            }
            tracing::debug!(
                target: targets::QUEUE,
                kind = %message.kind,
                "queue full, message dropped"
            );
            return Err(QueueError::Full);
        }

        // SAFETY: the mutex is held and `write` is outside the occupied range.
        unsafe {
            *self.slots[write].get() = Some(QueuedMessage {
                target,
                message,
                delivery,
            });
        }
        self.write.store(next, Ordering::Release);

        tracing::trace!(
            target: targets::QUEUE,
            slot = write,
            kind = %message.kind,
            ?target,
            "queued message"
        );
        Ok(())
    }

    /// Remove the oldest message.
    ///
    /// Must only be called from the single draining context.
    pub(crate) fn pop(&self) -> Option<QueuedMessage> {
        let _guard = self.mutex.lock_spinning();

        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: the mutex is held and `read` is the oldest occupied slot.
        let queued = unsafe { (*self.slots[read].get()).take() };
        self.read.store((read + 1) % self.capacity(), Ordering::Release);
        queued
    }

    /// Read the diagnostic counters.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            overflows: self.stats.overflows.load(Ordering::Relaxed),
            non_pointer_overflows: self.stats.non_pointer_overflows.load(Ordering::Relaxed),
            last_lost: MessageKind::from_raw(self.stats.last_lost.load(Ordering::Relaxed)),
            mutex_clashes: self.stats.mutex_clashes.load(Ordering::Relaxed),
            coalesced_moves: self.stats.coalesced_moves.load(Ordering::Relaxed),
        }
    }

    /// Zero the diagnostic counters.
    pub fn reset_stats(&self) {
        self.stats.overflows.store(0, Ordering::Relaxed);
        self.stats.non_pointer_overflows.store(0, Ordering::Relaxed);
        self.stats.last_lost.store(0, Ordering::Relaxed);
        self.stats.mutex_clashes.store(0, Ordering::Relaxed);
        self.stats.coalesced_moves.store(0, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn mutex(&self) -> &WidgetMutex {
        &self.mutex
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::with_slots(DEFAULT_QUEUE_CAPACITY)
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    fn target() -> WidgetId {
        let mut ids: SlotMap<WidgetId, ()> = SlotMap::with_key();
        ids.insert(())
    }

    fn key(param: u32) -> Message {
        Message::key(MessageKind::KeyDown, param)
    }

    fn moved(x: i32, y: i32) -> Message {
        Message::pointer(MessageKind::PointerMove, x, y)
    }

    #[test]
    fn test_capacity_must_leave_room() {
        assert_eq!(MessageQueue::new(1).unwrap_err(), WidgetError::InvalidQueueCapacity(1));
        assert!(MessageQueue::new(2).is_ok());
    }

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new(8).unwrap();
        let id = target();
        for param in 0..5 {
            queue.post(id, key(param), Delivery::PAINT).unwrap();
        }
        assert_eq!(queue.len(), 5);

        let params = std::iter::from_fn(|| queue.pop())
            .map(|queued| queued.message.param1)
            .collect::<Vec<_>>();
        assert_eq!(params, [0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_one_slot_reserved() {
        let queue = MessageQueue::new(4).unwrap();
        let id = target();
        for param in 0..3 {
            queue.post(id, key(param), Delivery::PAINT).unwrap();
        }
        assert!(queue.is_full());
        assert_eq!(queue.post(id, key(3), Delivery::PAINT), Err(QueueError::Full));

        let stats = queue.stats();
        assert_eq!(stats.overflows, 1);
        assert_eq!(stats.non_pointer_overflows, 1);
        assert_eq!(stats.last_lost, Some(MessageKind::KeyDown));

        assert!(queue.pop().is_some());
        assert!(queue.post(id, key(4), Delivery::PAINT).is_ok());
    }

    #[test]
    fn test_indices_wrap() {
        let queue = MessageQueue::new(3).unwrap();
        let id = target();
        for param in 0..10 {
            queue.post(id, key(param), Delivery::PAINT).unwrap();
            assert_eq!(queue.pop().map(|queued| queued.message.param1), Some(param));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pointer_moves_coalesce() {
        let queue = MessageQueue::new(8).unwrap();
        let id = target();
        queue.post(id, moved(1, 2), Delivery::POINTER).unwrap();
        queue.post(id, moved(3, 4), Delivery::POINTER).unwrap();
        queue.post(id, moved(5, 6), Delivery::POINTER).unwrap();

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stats().coalesced_moves, 2);
        let queued = queue.pop().unwrap();
        assert_eq!(queued.message.pointer_position(), (5, 6));
    }

    #[test]
    fn test_move_after_other_message_takes_new_slot() {
        let queue = MessageQueue::new(8).unwrap();
        let id = target();
        queue.post(id, moved(1, 1), Delivery::POINTER).unwrap();
        queue.post(id, Message::pointer(MessageKind::PointerUp, 1, 1), Delivery::POINTER).unwrap();
        queue.post(id, moved(2, 2), Delivery::POINTER).unwrap();
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_move_into_full_queue_coalesces() {
        let queue = MessageQueue::new(3).unwrap();
        let id = target();
        queue.post(id, key(0), Delivery::PAINT).unwrap();
        queue.post(id, moved(1, 1), Delivery::POINTER).unwrap();
        assert!(queue.is_full());

        assert!(queue.post(id, moved(9, 9), Delivery::POINTER).is_ok());
        assert_eq!(queue.stats().overflows, 0);
    }

    #[test]
    fn test_busy_when_mutex_held() {
        let queue = MessageQueue::new(4).unwrap();
        let id = target();
        {
            let _held = queue.mutex().try_lock().unwrap();
            assert_eq!(queue.post(id, key(0), Delivery::PAINT), Err(QueueError::Busy));
        }
        assert_eq!(queue.stats().mutex_clashes, 1);
        assert!(queue.is_empty());
        assert!(queue.post(id, key(0), Delivery::PAINT).is_ok());
    }

    #[test]
    fn test_reset_stats() {
        let queue = MessageQueue::new(2).unwrap();
        let id = target();
        queue.post(id, key(0), Delivery::PAINT).unwrap();
        let _ = queue.post(id, key(1), Delivery::PAINT);
        assert_eq!(queue.stats().overflows, 1);

        queue.reset_stats();
        assert_eq!(queue.stats(), QueueStats::default());
    }
}
