/// Rotating warning light duty cycle: a short burst, then a long rest so the motor survives.
#[derive(Debug, Default)]
pub struct RotatingLight {
    active: bool,
    on: bool,
    secs: u16,
}

impl RotatingLight {
    pub const ON_SECS: u16 = 30;
    pub const OFF_SECS: u16 = 15 * 60;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: false,
            on: false,
            secs: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Starts or stops the cycle, returning the light level to write if it changes.
    pub fn set_active(&mut self, active: bool) -> Option<bool> {
        if active == self.active {
            return None;
        }
        self.active = active;
        self.secs = 0;
        self.switch(active)
    }

    /// Starts the cycle from the beginning, whatever phase it is in.
    pub fn restart(&mut self) -> Option<bool> {
        self.active = true;
        self.secs = 0;
        self.switch(true)
    }

    /// Advances the cycle by one second.
    pub fn second(&mut self) -> Option<bool> {
        if !self.active {
            return None;
        }
        self.secs += 1;
        let limit = if self.on { Self::ON_SECS } else { Self::OFF_SECS };
        if self.secs < limit {
            return None;
        }
        self.secs = 0;
        self.switch(!self.on)
    }

    fn switch(&mut self, on: bool) -> Option<bool> {
        (on != self.on).then(|| {
            self.on = on;
            on
        })
    }
}
