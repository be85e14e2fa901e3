use circular_buffer::CircularBuffer;
use thiserror::Error as ThisError;

/// Discrete events consumed by the UI state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The encoder moved one detent clockwise.
    EncoderCw,
    /// The encoder moved one detent counter-clockwise.
    EncoderCcw,
    /// The encoder push button was pressed.
    EncoderPush,
    /// The secondary button was pressed.
    SecondaryPush,
    /// Coarse clock tick, roughly once per second.
    Tick,
    /// The key in the given slot was plugged, removed or re-read.
    KeyChange(u8),
}

impl Event {
    /// Whether the event stems from the operator (as opposed to the clock or the key slots).
    #[inline]
    #[must_use]
    pub fn is_user_input(self) -> bool {
        !matches!(self, Self::Tick | Self::KeyChange(_))
    }
}

/// Bounded FIFO of [`Event`]s.
///
/// Written from the tick interrupt and drained by the UI poll loop. When full, the newest event
/// is dropped so that older, not yet processed events keep their order.
#[derive(Debug)]
pub struct EventQueue {
    events: CircularBuffer<{ Self::CAPACITY }, Event>,
}

impl EventQueue {
    pub const CAPACITY: usize = 8;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: CircularBuffer::new(),
        }
    }

    /// Appends an event to the back of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueFull`] and leaves the queue untouched if it already holds
    /// [`EventQueue::CAPACITY`] events.
    #[inline]
    pub fn push(&mut self, event: Event) -> Result<(), QueueFull> {
        if self.events.is_full() {
            return Err(QueueFull(event));
        }

        self.events.push_back(event);
        Ok(())
    }

    /// Takes the oldest event out of the queue.
    #[inline]
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// The event could not be queued and was dropped.
#[derive(Clone, Copy, Debug, ThisError)]
#[cfg_attr(test, derive(PartialEq))]
#[error("event queue full, dropped {0:?}")]
pub struct QueueFull(pub Event);
