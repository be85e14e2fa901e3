/// Beeper cadences.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(test, derive(strum::EnumIter))]
pub enum BeepPattern {
    /// Silent, accepts new patterns.
    #[default]
    Off,
    /// Silent, ignores new patterns until re-enabled.
    Disabled,
    /// One short beep.
    Single,
    /// Slow endless on/off, for a key that is missing past its timeout.
    KeyMissing,
    /// Escalating reminder of pizza timer 1.
    Pizza1,
    /// Escalating reminder of pizza timer 2.
    Pizza2,
    /// Escalating reminder of pizza timer 3.
    Pizza3,
    /// Bursts of short beeps, for key errors.
    Error,
}

impl BeepPattern {
    /// Pattern reminding of the given pizza timer, `None` if there is no such timer.
    #[must_use]
    pub fn pizza(timer: u8) -> Option<Self> {
        match timer {
            0 => Some(Self::Pizza1),
            1 => Some(Self::Pizza2),
            2 => Some(Self::Pizza3),
            _ => None,
        }
    }
}

/// Beeper pattern engine.
///
/// Steps once every [`Beeper::STEP_TICKS`] ticks. The pattern decides the level from the step
/// count.
#[derive(Debug)]
pub struct Beeper {
    pattern: BeepPattern,
    countdown: u8,
    step: u8,
}

impl Beeper {
    /// Ticks per pattern step.
    pub const STEP_TICKS: u8 = 30;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            pattern: BeepPattern::Off,
            countdown: Self::STEP_TICKS,
            step: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn pattern(&self) -> BeepPattern {
        self.pattern
    }

    /// Starts a pattern from its beginning.
    ///
    /// Returns the beeper level to write, `None` when nothing changes: the beeper is disabled or
    /// asked to stop while already stopped.
    pub fn start(&mut self, pattern: BeepPattern) -> Option<bool> {
        match (self.pattern, pattern) {
            (_, BeepPattern::Disabled) => return self.enable(false),
            (BeepPattern::Disabled, _) | (BeepPattern::Off, BeepPattern::Off) => return None,
            _ => (),
        }

        self.pattern = pattern;
        self.countdown = Self::STEP_TICKS;
        self.step = 0;

        Some(pattern != BeepPattern::Off)
    }

    #[inline]
    pub fn stop(&mut self) -> Option<bool> {
        self.start(BeepPattern::Off)
    }

    /// Disabling silences the beeper and makes it ignore [`Beeper::start`] until enabled again.
    pub fn enable(&mut self, enable: bool) -> Option<bool> {
        if enable {
            if self.pattern == BeepPattern::Disabled {
                self.pattern = BeepPattern::Off;
            }
            None
        } else {
            let level = self.stop();
            self.pattern = BeepPattern::Disabled;
            level
        }
    }

    /// Advances the pattern by one tick, returning the level to write if the pattern wants one.
    pub fn update(&mut self) -> Option<bool> {
        self.countdown -= 1;
        if self.countdown != 0 {
            return None;
        }

        self.countdown = Self::STEP_TICKS;
        self.step = self.step.wrapping_add(1);
        let step = self.step;

        match self.pattern {
            BeepPattern::Off | BeepPattern::Disabled => None,
            BeepPattern::Single => (step == 5).then(|| {
                self.pattern = BeepPattern::Off;
                false
            }),
            BeepPattern::KeyMissing => (step & 15 == 0).then_some(step & 16 == 0),
            BeepPattern::Pizza1 | BeepPattern::Pizza2 | BeepPattern::Pizza3 => {
                let n = self.pattern as u8 - BeepPattern::Pizza1 as u8 + 1;
                Self::pizza_level(&mut self.step, n)
            }
            BeepPattern::Error => (step & 48 == 0 && step & 1 == 0).then_some(step & 2 == 0),
        }
    }

    /// Fast beeps, then `n` slower rounds, then a pause growing with `n` before starting over.
    fn pizza_level(step: &mut u8, n: u8) -> Option<bool> {
        const FAST_STEPS: u8 = 12;
        const SLOW_ROUND_STEPS: u8 = 16;
        const PAUSE_STEPS: u8 = 68;

        let s = *step;
        if s < FAST_STEPS {
            (s & 1 == 0).then_some(s & 2 == 0)
        } else if s < FAST_STEPS + n * SLOW_ROUND_STEPS {
            let s = s - FAST_STEPS;
            (s & 7 == 0).then_some(s & 8 == 0)
        } else if s == FAST_STEPS + PAUSE_STEPS + n * SLOW_ROUND_STEPS {
            *step = 0;
            Some(true)
        } else {
            None
        }
    }
}

impl Default for Beeper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::{BeepPattern, Beeper};

    /// Runs `steps` pattern steps and collects `(step, level)` for every write.
    fn run(beeper: &mut Beeper, steps: usize) -> Vec<(usize, bool)> {
        let mut writes = Vec::new();
        for step in 1..=steps {
            for _ in 0..Beeper::STEP_TICKS {
                if let Some(level) = beeper.update() {
                    writes.push((step, level));
                }
            }
        }
        writes
    }

    #[test]
    fn test_stop_when_stopped_is_a_no_op() {
        let mut beeper = Beeper::new();
        assert_eq!(beeper.start(BeepPattern::Off), None);
        assert_eq!(beeper.stop(), None);

        assert_eq!(beeper.start(BeepPattern::Single), Some(true));
        assert_eq!(beeper.stop(), Some(false));
        assert_eq!(beeper.stop(), None);
    }

    #[test]
    fn test_single_beep() {
        let mut beeper = Beeper::new();
        assert_eq!(beeper.start(BeepPattern::Single), Some(true));
        assert_eq!(run(&mut beeper, 10), [(5, false)]);
        assert_eq!(beeper.pattern(), BeepPattern::Off);
    }

    #[test]
    fn test_disabled_ignores_start() {
        let mut beeper = Beeper::new();
        beeper.start(BeepPattern::KeyMissing);
        assert_eq!(beeper.enable(false), Some(false));

        for pattern in BeepPattern::iter() {
            assert_eq!(beeper.start(pattern), None);
            assert_eq!(beeper.pattern(), BeepPattern::Disabled);
        }
        assert!(run(&mut beeper, 100).is_empty());

        assert_eq!(beeper.enable(true), None);
        assert_eq!(beeper.pattern(), BeepPattern::Off);
        assert_eq!(beeper.start(BeepPattern::Error), Some(true));
    }

    #[test]
    fn test_key_missing_duty_cycle() {
        let mut beeper = Beeper::new();
        beeper.start(BeepPattern::KeyMissing);
        assert_eq!(
            run(&mut beeper, 64),
            [(16, false), (32, true), (48, false), (64, true)]
        );
    }

    #[test]
    fn test_error_bursts() {
        let mut beeper = Beeper::new();
        beeper.start(BeepPattern::Error);
        let writes = run(&mut beeper, 64);

        // A burst of toggles within the first 16 steps, then silence until step 64.
        assert!(writes.iter().all(|(step, _)| *step < 16 || *step == 64));
        assert_eq!(writes[0], (2, false));
        assert_eq!(writes[1], (4, true));
        assert_eq!(writes.last(), Some(&(64, true)));
    }

    #[test]
    fn test_pizza_patterns_repeat_with_growing_period() {
        for (n, pattern) in [BeepPattern::Pizza1, BeepPattern::Pizza2, BeepPattern::Pizza3]
            .into_iter()
            .enumerate()
        {
            let n = n + 1;
            let period = 80 + n * 16;

            let mut beeper = Beeper::new();
            assert_eq!(beeper.start(pattern), Some(true));
            let writes = run(&mut beeper, period * 2);

            let restarts: Vec<usize> = writes
                .iter()
                .filter(|(step, level)| *level && step % period == 0)
                .map(|(step, _)| *step)
                .collect();
            assert_eq!(restarts, [period, period * 2]);

            // The fast phase toggles every 2 steps, the slow one every 8.
            assert_eq!(writes[0], (2, false));
            assert_eq!(writes[1], (4, true));
            assert!(writes.contains(&(12, true)));
            assert!(writes.contains(&(20, false)));
            // Nothing gets written during the pause.
            let pause_start = 12 + n * 16;
            assert!(
                !writes
                    .iter()
                    .any(|(step, _)| *step > pause_start && *step < period)
            );
        }
    }

    #[test]
    fn test_pizza_lookup() {
        assert_eq!(BeepPattern::pizza(0), Some(BeepPattern::Pizza1));
        assert_eq!(BeepPattern::pizza(2), Some(BeepPattern::Pizza3));
        assert_eq!(BeepPattern::pizza(3), None);
    }
}
