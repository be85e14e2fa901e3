/// Perceptual brightness curve, indexed by linear brightness 0..64.
pub const GAMMA: [u8; 64] = [
    0, 0, 0, 0, 1, 1, 1, 2, 3, 4, 4, 5, 7, 8, 9, 11, 13, 14, 16, 18, 20, 23, 25, 28, 31, 33, 36,
    40, 43, 46, 50, 54, 57, 61, 66, 70, 74, 79, 84, 89, 94, 99, 105, 110, 116, 122, 128, 134, 140,
    147, 153, 160, 167, 174, 182, 189, 197, 205, 213, 221, 229, 238, 246, 255,
];

/// What the indicator LED on the secondary button does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndicatorMode {
    #[default]
    Off,
    /// Smooth breathing, the oscillator advances by the given amount every PWM step.
    Pulse(u16),
    /// Hard on/off at the same rate as [`IndicatorMode::Pulse`].
    Blink(u16),
    /// Mirrors the beeper.
    SyncToBeeper,
}

/// Indicator oscillator.
///
/// The oscillator is a wrapping 16 bit phase. Bit 11 selects the half period, bits 5..11 the
/// position on the gamma curve.
#[derive(Debug, Default)]
pub struct Indicator {
    mode: IndicatorMode,
    osc: u16,
}

impl Indicator {
    const HALF_PERIOD: u16 = 2048;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: IndicatorMode::Off,
            osc: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> IndicatorMode {
        self.mode
    }

    /// Switches mode, returning the brightness to write right away if the new mode fixes it.
    ///
    /// Re-selecting the running oscillating mode only changes its rate, the phase keeps going.
    pub fn set_mode(&mut self, mode: IndicatorMode, beeper: bool) -> Option<u8> {
        let same_kind = matches!(
            (self.mode, mode),
            (IndicatorMode::Pulse(_), IndicatorMode::Pulse(_))
                | (IndicatorMode::Blink(_), IndicatorMode::Blink(_))
        );
        if !same_kind {
            self.osc = 0;
        }
        self.mode = mode;

        match mode {
            IndicatorMode::Off => Some(0),
            IndicatorMode::SyncToBeeper => Some(Self::beeper_level(beeper)),
            IndicatorMode::Pulse(_) | IndicatorMode::Blink(_) => None,
        }
    }

    /// Brightness for the current beeper level while synced, `None` otherwise.
    #[must_use]
    pub fn beeper_changed(&self, beeper: bool) -> Option<u8> {
        (self.mode == IndicatorMode::SyncToBeeper).then(|| Self::beeper_level(beeper))
    }

    /// Advances the oscillator by one PWM step, returning the brightness for oscillating modes.
    pub fn update(&mut self) -> Option<u8> {
        match self.mode {
            IndicatorMode::Off | IndicatorMode::SyncToBeeper => None,
            IndicatorMode::Blink(freq) => {
                self.osc = self.osc.wrapping_add(freq);
                Some(if self.osc & Self::HALF_PERIOD != 0 { 0 } else { 255 })
            }
            IndicatorMode::Pulse(freq) => {
                self.osc = self.osc.wrapping_add(freq);
                let b = usize::from((self.osc >> 5) & 63);
                Some(if self.osc & Self::HALF_PERIOD != 0 {
                    GAMMA[63 - b]
                } else {
                    GAMMA[b]
                })
            }
        }
    }

    fn beeper_level(beeper: bool) -> u8 {
        if beeper { 255 } else { 0 }
    }
}
