use crate::LCD_BACKLIGHT_TIMEOUT_SECS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Brighten,
    Darken,
}

/// LCD backlight that fades up on activity and back down to a dim glow once idle.
#[derive(Debug)]
pub struct Backlight {
    level: u8,
    phase: Phase,
    hold_secs: u8,
}

impl Backlight {
    pub const DIM: u8 = 13;
    pub const ON: u8 = 255;
    const FADE_UP: u8 = 42;
    const FADE_DOWN: u8 = 3;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            level: Self::DIM,
            phase: Phase::Idle,
            hold_secs: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Turns the backlight on, or keeps it on for another full timeout.
    pub fn enable(&mut self) {
        if self.hold_secs == 0 {
            self.phase = Phase::Brighten;
        }
        self.hold_secs = LCD_BACKLIGHT_TIMEOUT_SECS;
    }

    /// One fade step, returning the new level while fading.
    pub fn update(&mut self) -> Option<u8> {
        match self.phase {
            Phase::Idle => return None,
            Phase::Brighten => {
                self.level = self.level.saturating_add(Self::FADE_UP);
                if self.level == Self::ON {
                    self.phase = Phase::Idle;
                }
            }
            Phase::Darken => {
                self.level = self.level.saturating_sub(Self::FADE_DOWN).max(Self::DIM);
                if self.level == Self::DIM {
                    self.phase = Phase::Idle;
                }
            }
        }
        Some(self.level)
    }

    /// Counts the hold time down, starting the fade out when it runs out.
    pub fn second(&mut self) {
        if self.hold_secs == 0 {
            return;
        }
        self.hold_secs -= 1;
        if self.hold_secs == 0 {
            self.phase = Phase::Darken;
        }
    }
}

impl Default for Backlight {
    fn default() -> Self {
        Self::new()
    }
}
