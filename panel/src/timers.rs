use crate::{KeyFlags, MAX_KEYS, NUM_PIZZA_TIMERS, NUM_TIMERS, Notification, Notifications};

/// Countdowns for missing keys and pizza timers.
///
/// Timers `0..MAX_KEYS` belong to the expected keys, the pizza timers follow.
pub trait KeyTimers {
    /// Seconds left, negative when the timer is not counting.
    fn read_timer(&self, timer: u8) -> i16;

    /// Starts a countdown in minutes, 0 stops the timer. Returns whether the timer had expired.
    fn set_timeout(&mut self, timer: u8, minutes: u8) -> bool;

    /// What the timer does once it expires.
    fn set_flags(&mut self, timer: u8, flags: KeyFlags);

    /// Stops a timer. Returns whether it had expired.
    fn cancel(&mut self, timer: u8) -> bool;

    /// Counts all timers down by one second.
    fn tick(&mut self) -> Notifications;

    fn first_expired(&self) -> Option<(u8, KeyFlags)>;

    /// Silences expired timers: pizza timers stop, key timers start over. Returns whether any
    /// timer was expired.
    fn acknowledge(&mut self) -> bool;

    /// The notification describing the expiry state after an expired timer went away.
    fn expiry_changed(&self) -> Notification {
        match self.first_expired() {
            Some((timer, flags)) => Notification::TimerExpired { timer, flags },
            None => Notification::TimerCleared,
        }
    }

    fn pizza_running(&self, pizza: u8) -> bool {
        self.read_timer(MAX_KEYS + pizza) >= 0
    }

    /// Minimum of the running timers in `timers`.
    fn minimum(&self, timers: core::ops::Range<u8>) -> Option<i16> {
        timers.map(|t| self.read_timer(t)).filter(|&s| s >= 0).min()
    }
}

/// Reference [`KeyTimers`] implementation counting whole seconds.
#[derive(Debug)]
pub struct KeyTimerBank {
    secs: [i16; NUM_TIMERS],
    minutes: [u8; NUM_TIMERS],
    flags: [KeyFlags; NUM_TIMERS],
    expired: u16,
}

impl KeyTimerBank {
    #[must_use]
    pub const fn new() -> Self {
        let mut flags = [KeyFlags::NONE; NUM_TIMERS];
        let mut pizza = 0;
        while pizza < NUM_PIZZA_TIMERS as usize {
            flags[MAX_KEYS as usize + pizza] = KeyFlags::BEEP;
            pizza += 1;
        }

        Self {
            secs: [-1; NUM_TIMERS],
            minutes: [0; NUM_TIMERS],
            flags,
            expired: 0,
        }
    }

    fn is_expired(&self, timer: usize) -> bool {
        self.expired & (1 << timer) != 0
    }

    fn take_expired(&mut self, timer: usize) -> bool {
        let was = self.is_expired(timer);
        self.expired &= !(1 << timer);
        was
    }
}

impl Default for KeyTimerBank {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyTimers for KeyTimerBank {
    fn read_timer(&self, timer: u8) -> i16 {
        self.secs.get(usize::from(timer)).copied().unwrap_or(-1)
    }

    fn set_timeout(&mut self, timer: u8, minutes: u8) -> bool {
        let timer = usize::from(timer);
        if timer >= NUM_TIMERS {
            return false;
        }
        self.minutes[timer] = minutes;
        self.secs[timer] = if minutes == 0 { -1 } else { i16::from(minutes) * 60 };
        self.take_expired(timer)
    }

    fn set_flags(&mut self, timer: u8, flags: KeyFlags) {
        if let Some(f) = self.flags.get_mut(usize::from(timer)) {
            *f = flags;
        }
    }

    fn cancel(&mut self, timer: u8) -> bool {
        let timer = usize::from(timer);
        if timer >= NUM_TIMERS {
            return false;
        }
        self.secs[timer] = -1;
        self.take_expired(timer)
    }

    fn tick(&mut self) -> Notifications {
        let mut notes = Notifications::new();
        for (timer, secs) in (0..).zip(self.secs.iter_mut()) {
            if *secs <= 0 {
                continue;
            }
            *secs -= 1;
            if *secs == 0 {
                *secs = -1;
                self.expired |= 1 << timer;
                let flags = self.flags[usize::from(timer)];
                notes.push(Notification::TimerExpired { timer, flags }).ok();
            }
        }
        notes
    }

    fn first_expired(&self) -> Option<(u8, KeyFlags)> {
        (0..NUM_TIMERS as u8)
            .find(|&t| self.is_expired(usize::from(t)))
            .map(|t| (t, self.flags[usize::from(t)]))
    }

    fn acknowledge(&mut self) -> bool {
        if self.expired == 0 {
            return false;
        }
        for timer in 0..NUM_TIMERS {
            if self.take_expired(timer) && timer < usize::from(MAX_KEYS) {
                self.secs[timer] = i16::from(self.minutes[timer]) * 60;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyTimerBank, KeyTimers};
    use crate::{KeyFlags, MAX_KEYS, Notification};

    fn run(bank: &mut KeyTimerBank, secs: u16) -> Vec<Notification> {
        (0..secs).flat_map(|_| bank.tick()).collect()
    }

    #[test]
    fn test_countdown_and_expiry() {
        let mut bank = KeyTimerBank::new();
        assert!(!bank.set_timeout(MAX_KEYS + 1, 1));
        assert_eq!(bank.read_timer(MAX_KEYS + 1), 60);
        assert!(bank.pizza_running(1));

        assert!(run(&mut bank, 59).is_empty());
        assert_eq!(bank.read_timer(MAX_KEYS + 1), 1);
        assert_eq!(
            run(&mut bank, 1),
            [Notification::TimerExpired { timer: MAX_KEYS + 1, flags: KeyFlags::BEEP }]
        );
        assert_eq!(bank.read_timer(MAX_KEYS + 1), -1);
        assert!(!bank.pizza_running(1));
        assert!(run(&mut bank, 100).is_empty());
    }

    #[test]
    fn test_zero_minutes_disables() {
        let mut bank = KeyTimerBank::new();
        bank.set_timeout(0, 3);
        bank.set_timeout(0, 0);
        assert_eq!(bank.read_timer(0), -1);
        assert!(run(&mut bank, 200).is_empty());
    }

    #[test]
    fn test_cancel_and_rearm_report_expiry() {
        let mut bank = KeyTimerBank::new();
        bank.set_flags(2, KeyFlags::ROTLIGHT);
        bank.set_timeout(2, 1);
        bank.set_timeout(MAX_KEYS, 1);
        run(&mut bank, 60);

        assert_eq!(bank.first_expired(), Some((2, KeyFlags::ROTLIGHT)));
        assert!(bank.cancel(2));
        assert!(!bank.cancel(2));
        assert_eq!(
            bank.expiry_changed(),
            Notification::TimerExpired { timer: MAX_KEYS, flags: KeyFlags::BEEP }
        );

        assert!(bank.set_timeout(MAX_KEYS, 2));
        assert_eq!(bank.expiry_changed(), Notification::TimerCleared);
    }

    #[test]
    fn test_acknowledge() {
        let mut bank = KeyTimerBank::new();
        assert!(!bank.acknowledge());

        bank.set_timeout(1, 2);
        bank.set_timeout(MAX_KEYS + 2, 1);
        run(&mut bank, 120);
        assert!(bank.acknowledge());

        assert_eq!(bank.first_expired(), None);
        assert_eq!(bank.read_timer(1), 120);
        assert_eq!(bank.read_timer(MAX_KEYS + 2), -1);
    }

    #[test]
    fn test_minimum() {
        let mut bank = KeyTimerBank::new();
        assert_eq!(bank.minimum(0..MAX_KEYS), None);
        bank.set_timeout(3, 4);
        bank.set_timeout(5, 2);
        bank.set_timeout(MAX_KEYS, 1);
        assert_eq!(bank.minimum(0..MAX_KEYS), Some(120));
        assert_eq!(bank.minimum(0..MAX_KEYS + 3), Some(60));
    }
}
