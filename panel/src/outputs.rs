/// State of everything hanging off the shift register chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OutputRecord {
    pub beeper: bool,
    pub rotating_light: bool,
    /// One bit per key slot, bit 0 being the leftmost slot.
    pub leds: u8,
}

impl OutputRecord {
    /// Number of bytes clocked into the chain per update.
    pub const LEN: usize = 2;

    const BEEPER: u8 = 1 << 0;
    const ROTATING_LIGHT: u8 = 1 << 1;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            beeper: false,
            rotating_light: false,
            leds: 0,
        }
    }

    /// Wire representation, in shifting order. The first byte ends up in the last register of
    /// the chain.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::LEN] {
        let mut status = 0;
        if self.beeper {
            status |= Self::BEEPER;
        }
        if self.rotating_light {
            status |= Self::ROTATING_LIGHT;
        }

        [status, self.leds]
    }
}

/// Hardware side of the shift register chain.
pub trait ShiftRegisterBus {
    /// Enables the serial interface and its transfer complete interrupt.
    fn enable(&mut self);

    /// Starts clocking out a byte. Completion is reported through
    /// [`ShiftRegisters::on_byte_sent`].
    fn write(&mut self, byte: u8);

    /// Clocks out a byte and waits for it to leave. Only used with interrupts masked.
    fn write_blocking(&mut self, byte: u8);

    /// Pulses the latch so the shifted bits appear on the outputs all at once.
    fn latch(&mut self);

    /// Turns the serial interface off until the next update.
    fn disable(&mut self);
}

/// Multiplexes the [`OutputRecord`] onto the shift register chain.
///
/// An update snapshots the record, so a record changing mid-transfer never shows up half
/// written. Updates requested while a transfer is in flight are coalesced: only the latest
/// record gets sent once the current one is latched.
#[derive(Debug)]
pub struct ShiftRegisters<B> {
    bus: B,
    /// Most recently requested record.
    latest: OutputRecord,
    /// Bytes of the transfer in flight.
    in_flight: [u8; OutputRecord::LEN],
    /// Index of the byte currently being clocked out, `None` when idle.
    index: Option<usize>,
    /// Whether `latest` changed after the transfer in flight was started.
    pending: bool,
}

impl<B> ShiftRegisters<B>
where
    B: ShiftRegisterBus,
{
    #[inline]
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            latest: OutputRecord::new(),
            in_flight: [0; OutputRecord::LEN],
            index: None,
            pending: false,
        }
    }

    /// Blocking reset of the chain to all outputs off. Meant for start-up, before interrupts are
    /// enabled.
    pub fn reset(&mut self) {
        self.latest = OutputRecord::new();
        self.pending = false;
        self.index = None;
        self.bus.enable();
        for byte in self.latest.to_bytes() {
            self.bus.write_blocking(byte);
        }
        self.bus.latch();
        self.bus.disable();
    }

    /// Schedules `record` to be mirrored onto the outputs. Never blocks.
    pub fn request_update(&mut self, record: OutputRecord) {
        self.latest = record;

        if self.index.is_some() {
            self.pending = true;
        } else {
            self.start();
        }
    }

    /// Transfer complete callback, called from the serial interface interrupt.
    pub fn on_byte_sent(&mut self) {
        let Some(index) = self.index else {
            return;
        };

        let next = index + 1;
        if next < OutputRecord::LEN {
            self.index = Some(next);
            self.bus.write(self.in_flight[next]);
            return;
        }

        self.bus.latch();

        if self.pending {
            self.pending = false;
            self.start();
        } else {
            self.index = None;
            self.bus.disable();
        }
    }

    /// Whether a transfer is in flight.
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.index.is_some()
    }

    #[inline]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn start(&mut self) {
        self.in_flight = self.latest.to_bytes();
        self.index = Some(0);
        self.bus.enable();
        self.bus.write(self.in_flight[0]);
    }
}
