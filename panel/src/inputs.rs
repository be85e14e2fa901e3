use crate::event::{Event, EventQueue};

/// Raw level snapshot of the panel input lines, taken once per tick.
///
/// A set bit means the line is high. All lines idle high (pull-ups), so pressing a button or
/// leaving an encoder detent produces a falling edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputSample(u8);

impl InputSample {
    pub const ROT_A: u8 = 1 << 0;
    pub const ROT_B: u8 = 1 << 1;
    pub const PUSH: u8 = 1 << 2;
    pub const SECONDARY: u8 = 1 << 3;

    const MASK: u8 = Self::ROT_A | Self::ROT_B | Self::PUSH | Self::SECONDARY;

    /// All lines at rest.
    pub const IDLE: Self = Self(Self::MASK);

    #[must_use]
    pub const fn new(rot_a: bool, rot_b: bool, push: bool, secondary: bool) -> Self {
        Self(
            (rot_a as u8) * Self::ROT_A
                | (rot_b as u8) * Self::ROT_B
                | (push as u8) * Self::PUSH
                | (secondary as u8) * Self::SECONDARY,
        )
    }

    /// Builds a sample from raw bits, ignoring bits that do not belong to an input line.
    #[inline]
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns a copy with the given line(s) forced to `level`.
    #[inline]
    #[must_use]
    pub const fn with(self, lines: u8, level: bool) -> Self {
        if level {
            Self::from_bits_truncate(self.0 | lines)
        } else {
            Self::from_bits_truncate(self.0 & !lines)
        }
    }
}

/// Two-sample debouncer and quadrature decoder.
///
/// A line has to read the same level on two consecutive ticks before its debounced level follows,
/// in either direction. Events are derived from the debounced levels only.
#[derive(Debug, Default)]
pub struct Debouncer {
    raw_prev: u8,
    settled: u8,
    settled_prev: u8,
}

impl Debouncer {
    /// All lines start out low, so the first settled samples produce rising edges only.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw_prev: 0,
            settled: 0,
            settled_prev: 0,
        }
    }

    /// Currently accepted input levels.
    #[inline]
    #[must_use]
    pub fn settled(&self) -> InputSample {
        InputSample(self.settled)
    }

    /// Feeds one raw sample. Meant to be ran exactly once per tick.
    ///
    /// Events that do not fit in the queue are dropped.
    pub fn poll(&mut self, raw: InputSample, events: &mut EventQueue) {
        let raw = raw.bits();

        self.settled |= raw & self.raw_prev;
        self.settled &= raw | self.raw_prev;
        self.raw_prev = raw;

        // The detents make the two halves of a quadrature cycle very asymmetric in time, so the
        // direction is taken from which line falls first rather than sampling B on A's edge.
        if self.fell(InputSample::ROT_A) && self.was_high(InputSample::ROT_B) {
            events.push(Event::EncoderCw).ok();
        } else if self.fell(InputSample::ROT_B) && self.was_high(InputSample::ROT_A) {
            events.push(Event::EncoderCcw).ok();
        }

        if self.fell(InputSample::PUSH) {
            events.push(Event::EncoderPush).ok();
        }

        if self.fell(InputSample::SECONDARY) {
            events.push(Event::SecondaryPush).ok();
        }

        self.settled_prev = self.settled;
    }

    #[inline]
    fn was_high(&self, line: u8) -> bool {
        self.settled_prev & line != 0
    }

    #[inline]
    fn fell(&self, line: u8) -> bool {
        self.was_high(line) && self.settled & line == 0
    }
}
