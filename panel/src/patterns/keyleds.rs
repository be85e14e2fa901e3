/// What the key slot LEDs show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyLedMode {
    /// Steady light on one slot.
    On(u8),
    /// One slot blinking at half a second per phase.
    Blink(u8),
    Off,
}

/// Key slot LED state, one bit per slot.
#[derive(Debug, Default)]
pub struct KeyLeds {
    leds: u8,
    blink_mask: u8,
}

impl KeyLeds {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            leds: 0,
            blink_mask: 0,
        }
    }

    /// Applies a mode, returning the LED bits to write if they change right away.
    ///
    /// Blinking starts dark and lights up on the next blink phase.
    pub fn set(&mut self, mode: KeyLedMode) -> Option<u8> {
        let (leds, blink_mask) = match mode {
            KeyLedMode::On(slot) => (Self::bit(slot), 0),
            KeyLedMode::Blink(slot) => (0, Self::bit(slot)),
            KeyLedMode::Off => (0, 0),
        };
        self.blink_mask = blink_mask;
        self.leds_changed(leds)
    }

    /// Blink phase step, once per half second.
    pub fn toggle(&mut self) -> Option<u8> {
        (self.blink_mask != 0).then(|| {
            self.leds ^= self.blink_mask;
            self.leds
        })
    }

    fn leds_changed(&mut self, leds: u8) -> Option<u8> {
        (leds != self.leds).then(|| {
            self.leds = leds;
            leds
        })
    }

    fn bit(slot: u8) -> u8 {
        1u8.checked_shl(u32::from(slot)).unwrap_or(0)
    }
}
