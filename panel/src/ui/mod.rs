//! Menu state machine.
//!
//! [`Ui`] never touches hardware. Each transition function returns the [`Effects`] the caller
//! has to apply, in order, to the panel and to the key collaborators.

mod effect;
mod state;
mod text;

pub use effect::{Effect, Effects};
pub use state::{Direction, KeyErrorKind, MenuEntry, UiState};
pub use text::{Message, Text, TextDisplay};

use crate::{
    BeepPattern, IndicatorMode, KeyFlags, KeyLedMode, KeyTimers, MAX_KEYS, MENU_TIMEOUT_SECONDS,
    MENU_TIMEOUT_SELECT_SECONDS, NUM_TIMERS, Notification, PIZZA_TIMER_DEFAULT_TIME,
    PIZZA_TIMER_MAX_TIME, UI_MESSAGE_TIMEOUT_SECONDS,
};

/// Indicator pulse frequencies for the soonest countdown, one entry every
/// [`PULSE_INTERP_STEP`] seconds, from 0 seconds left upwards.
const PULSE_FREQUENCIES: [u8; 18] = [
    200, 144, 106, 79, 60, 46, 36, 29, 23, 19, 16, 13, 11, 10, 9, 8, 7, 7,
];
const PULSE_INTERP_LOG: u8 = 3;
const PULSE_INTERP_STEP: i16 = 1 << PULSE_INTERP_LOG;
/// Pulse frequency for countdowns past the end of the table.
const PULSE_SLOWEST: u16 = 6;
const EXPIRED_BLINK: u16 = 220;

/// UI state and the auxiliary data of the states.
#[derive(Debug, Default)]
pub struct Ui {
    state: UiState,
    selected_key: u8,
    selected_time: u8,
    max_selectable_time: u8,
    ui_timer: u8,
    expired: Option<(u8, KeyFlags)>,
    key_error: Option<(KeyErrorKind, u8)>,
}

impl Ui {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: UiState::Idle,
            selected_key: 0,
            selected_time: 0,
            max_selectable_time: 0,
            ui_timer: 0,
            expired: None,
            key_error: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> UiState {
        self.state
    }

    /// Slot shown while locating keys, timer being set while selecting a time.
    #[inline]
    #[must_use]
    pub fn selected_key(&self) -> u8 {
        self.selected_key
    }

    #[inline]
    #[must_use]
    pub fn selected_time(&self) -> u8 {
        self.selected_time
    }

    /// Seconds until the current state falls back, 0 when it does not.
    #[inline]
    #[must_use]
    pub fn ui_timer(&self) -> u8 {
        self.ui_timer
    }

    #[inline]
    #[must_use]
    pub fn expired_timer(&self) -> Option<u8> {
        self.expired.map(|(timer, _)| timer)
    }

    #[inline]
    #[must_use]
    pub fn key_error(&self) -> Option<(KeyErrorKind, u8)> {
        self.key_error
    }

    pub fn on_rotate(&mut self, direction: Direction) -> Effects {
        match self.state {
            UiState::Menu(entry) => self.state = UiState::Menu(entry.rotate(direction)),
            UiState::SelectTime => {
                self.selected_time = match direction {
                    Direction::Forward => self
                        .selected_time
                        .saturating_add(1)
                        .min(self.max_selectable_time),
                    Direction::Back => self.selected_time.saturating_sub(1).max(1),
                };
            }
            UiState::FindKey => {
                self.selected_key = match direction {
                    Direction::Forward => (self.selected_key + 1) % MAX_KEYS,
                    Direction::Back => self.selected_key.checked_sub(1).unwrap_or(MAX_KEYS - 1),
                };
            }
            UiState::Idle | UiState::MessageTimeout | UiState::KeyError => (),
        }
        Effects::new()
    }

    pub fn on_push<T: KeyTimers>(&mut self, timers: &T) -> Effects {
        let mut fx = Effects::new();
        match self.state {
            UiState::Idle | UiState::MessageTimeout => {
                self.state = UiState::Menu(MenuEntry::FindKey);
                self.reset_timer();
                fx.push(Effect::Print(1, Text::Blank));
            }
            UiState::Menu(MenuEntry::FindKey) => {
                self.state = UiState::FindKey;
                self.selected_key = 0;
            }
            UiState::Menu(MenuEntry::Bootloader) => fx.push(Effect::EnterBootloader),
            UiState::Menu(entry) => {
                if let Some(pizza) = entry.pizza() {
                    if timers.pizza_running(pizza) {
                        fx.push(Effect::ClearPizza(pizza));
                        self.default_state(&mut fx);
                    } else {
                        self.enter_select_time(
                            MAX_KEYS + pizza,
                            PIZZA_TIMER_DEFAULT_TIME,
                            PIZZA_TIMER_MAX_TIME,
                            &mut fx,
                        );
                    }
                }
            }
            UiState::SelectTime => self.apply_time(&mut fx),
            UiState::FindKey => self.default_state(&mut fx),
            UiState::KeyError => (),
        }
        fx
    }

    pub fn on_secondary(&mut self) -> Effects {
        let mut fx = Effects::new();
        match self.state {
            UiState::Idle => fx.push(Effect::SecondaryAction),
            UiState::KeyError => (),
            _ => self.default_state(&mut fx),
        }
        fx
    }

    /// Once per second: counts the fall back timeout down and follows the soonest countdown
    /// with the indicator.
    pub fn on_tick<T: KeyTimers>(&mut self, timers: &T) -> Effects {
        let mut fx = Effects::new();

        if self.ui_timer > 0 {
            self.ui_timer -= 1;
            if self.ui_timer == 0 {
                if self.state == UiState::SelectTime {
                    self.apply_time(&mut fx);
                } else {
                    self.default_state(&mut fx);
                }
            }
        }

        if self.expired.is_none() && self.key_error.is_none() {
            let mode = timers
                .minimum(0..NUM_TIMERS as u8)
                .map_or(IndicatorMode::Off, |secs| IndicatorMode::Pulse(pulse_frequency(secs)));
            fx.push(Effect::Indicator(mode));
        }

        fx
    }

    /// Any user input keeps the backlight on and restarts the fall back timeout.
    pub fn on_activity(&mut self) -> Effects {
        let mut fx = Effects::new();
        fx.push(Effect::Backlight);
        self.reset_timer();
        fx
    }

    /// Redraws whatever the current state shows.
    pub fn repaint<T: KeyTimers>(&self, timers: &T) -> Effects {
        let mut fx = Effects::new();
        match self.state {
            UiState::Idle | UiState::MessageTimeout | UiState::KeyError => {
                fx.push(Effect::Print(1, Text::Timers));
            }
            UiState::Menu(MenuEntry::FindKey) => fx.push(Effect::Print(0, Text::LocateKey)),
            UiState::Menu(MenuEntry::Bootloader) => {
                fx.push(Effect::Print(0, Text::EnterBootloader));
            }
            UiState::Menu(entry) => {
                if let Some(pizza) = entry.pizza() {
                    let running = timers.pizza_running(pizza);
                    fx.push(Effect::Print(0, Text::PizzaMenu { pizza, running }));
                }
            }
            UiState::SelectTime => fx.push(Effect::Print(1, Text::Minutes(self.selected_time))),
            UiState::FindKey => {
                fx.push(Effect::Print(1, Text::Slot(self.selected_key)));
                fx.push(Effect::KeyLeds(KeyLedMode::On(self.selected_key)));
            }
        }
        fx
    }

    /// Dispatches a collaborator notification.
    pub fn notify(&mut self, notification: Notification) -> Effects {
        match notification {
            Notification::TimerExpired { timer, flags } => self.timer_expired(timer, flags),
            Notification::TimerCleared => self.timer_cleared(),
            Notification::KeyError { kind, slot } => self.set_key_error(kind, slot),
            Notification::KeyErrorCleared => self.key_error_cleared(),
            Notification::KeyRemoved {
                timer,
                default,
                max,
            } => self.select_time(timer, default, max),
        }
    }

    pub fn timer_expired(&mut self, timer: u8, flags: KeyFlags) -> Effects {
        let mut fx = Effects::new();
        if self.expired.is_some_and(|(t, _)| t == timer) {
            return fx;
        }
        self.expired = Some((timer, flags));
        self.default_state(&mut fx);
        if flags.contains(KeyFlags::ROTLIGHT) {
            fx.push(Effect::RestartRotatingLight);
        }
        fx
    }

    pub fn timer_cleared(&mut self) -> Effects {
        let mut fx = Effects::new();
        if self.expired.take().is_some() {
            self.default_state(&mut fx);
        }
        fx
    }

    pub fn set_key_error(&mut self, kind: KeyErrorKind, slot: u8) -> Effects {
        let mut fx = Effects::new();
        if self.key_error == Some((kind, slot)) {
            return fx;
        }
        self.key_error = Some((kind, slot));
        self.default_state(&mut fx);
        fx
    }

    pub fn key_error_cleared(&mut self) -> Effects {
        let mut fx = Effects::new();
        if self.key_error.take().is_some() {
            self.default_state(&mut fx);
        }
        fx
    }

    /// Shows command feedback until it times out.
    pub fn message(&mut self, message: Message) -> Effects {
        let mut fx = Effects::new();
        fx.push(Effect::Print(0, Text::Message(message)));
        self.leave_find_key(&mut fx);
        self.state = UiState::MessageTimeout;
        fx.push(Effect::Backlight);
        self.reset_timer();
        fx
    }

    /// Asks for the minutes of a timer, starting at `default` and limited to `1..=max`.
    /// Ignored while a key error holds the display.
    pub fn select_time(&mut self, timer: u8, default: u8, max: u8) -> Effects {
        let mut fx = Effects::new();
        if self.key_error.is_none() {
            self.enter_select_time(timer, default, max, &mut fx);
        }
        fx
    }

    fn enter_select_time(&mut self, timer: u8, default: u8, max: u8, fx: &mut Effects) {
        self.leave_find_key(fx);
        self.selected_time = default;
        self.max_selectable_time = max;
        self.selected_key = timer;
        self.state = UiState::SelectTime;
        fx.push(Effect::Backlight);
        self.reset_timer();
    }

    fn leave_find_key(&self, fx: &mut Effects) {
        if self.state == UiState::FindKey {
            fx.push(Effect::KeyLeds(KeyLedMode::Off));
        }
    }

    fn apply_time(&mut self, fx: &mut Effects) {
        fx.push(Effect::SetTimeout {
            timer: self.selected_key,
            minutes: self.selected_time,
        });
        self.default_state(fx);
    }

    fn reset_timer(&mut self) {
        self.ui_timer = match self.state {
            UiState::Menu(_) => MENU_TIMEOUT_SECONDS,
            UiState::SelectTime | UiState::FindKey => MENU_TIMEOUT_SELECT_SECONDS,
            UiState::MessageTimeout => UI_MESSAGE_TIMEOUT_SECONDS,
            UiState::Idle | UiState::KeyError => 0,
        };
    }

    /// Silences everything, then shows the most important condition: a key error, an expired
    /// timer or nothing at all.
    fn default_state(&mut self, fx: &mut Effects) {
        fx.push(Effect::KeyLeds(KeyLedMode::Off));
        fx.push(Effect::Beeper(BeepPattern::Off));
        fx.push(Effect::Indicator(IndicatorMode::Off));
        fx.push(Effect::Backlight);
        self.ui_timer = 0;

        if let Some((kind, slot)) = self.key_error {
            self.state = UiState::KeyError;
            fx.push(Effect::KeyLeds(KeyLedMode::Blink(slot)));
            fx.push(Effect::Beeper(BeepPattern::Error));
            fx.push(Effect::Print(0, Text::KeyError(kind, slot)));
        } else {
            self.state = UiState::Idle;
            match self.expired {
                None => fx.push(Effect::Print(0, Text::Blank)),
                Some((timer, flags)) => {
                    fx.push(Effect::Indicator(IndicatorMode::Blink(EXPIRED_BLINK)));
                    if timer < MAX_KEYS {
                        if flags.contains(KeyFlags::BEEP) {
                            fx.push(Effect::Beeper(BeepPattern::KeyMissing));
                        }
                        fx.push(Effect::Print(0, Text::KeyMissing(timer)));
                    } else {
                        let pizza = timer - MAX_KEYS;
                        if let Some(pattern) = BeepPattern::pizza(pizza) {
                            fx.push(Effect::Beeper(pattern));
                        }
                        fx.push(Effect::Print(0, Text::PizzaDone(pizza)));
                    }
                }
            }
        }

        let rotlight = self
            .expired
            .is_some_and(|(_, flags)| flags.contains(KeyFlags::ROTLIGHT));
        fx.push(Effect::RotatingLight(rotlight));
    }
}

/// Pulse frequency for the given seconds left, interpolated between the table entries.
fn pulse_frequency(secs: i16) -> u16 {
    let last = (PULSE_FREQUENCIES.len() as i16 - 1) * PULSE_INTERP_STEP;
    if secs >= last {
        return PULSE_SLOWEST;
    }

    let secs = secs.max(0) as u16;
    let idx = usize::from(secs >> PULSE_INTERP_LOG);
    let part1 = secs & (PULSE_INTERP_STEP as u16 - 1);
    let part0 = PULSE_INTERP_STEP as u16 - part1;
    (u16::from(PULSE_FREQUENCIES[idx]) * part0 + u16::from(PULSE_FREQUENCIES[idx + 1]) * part1)
        >> PULSE_INTERP_LOG
}
