use crate::{
    Direction, Effect, Effects, Event, KeyDirectory, KeyTimers, MAX_KEYS, Message, Notifications,
    Panel, PanelHardware, Ui,
};

/// Access to the panel shared with the tick interrupt.
///
/// The closure runs with the tick masked, so it must stay short.
pub trait PanelAccess {
    type Hardware: PanelHardware;

    fn with_panel<R>(&mut self, f: impl FnOnce(&mut Panel, &mut Self::Hardware) -> R) -> R;
}

/// What the main loop has to do after an event was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    EnterBootloader,
}

/// Runs the [`Ui`] against the panel and the key collaborators.
#[derive(Debug, Default)]
pub struct Controller {
    ui: Ui,
}

impl Controller {
    #[must_use]
    pub const fn new() -> Self {
        Self { ui: Ui::new() }
    }

    #[inline]
    #[must_use]
    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    /// Handles one event from the queue and repaints.
    pub fn handle<P, T, K>(
        &mut self,
        event: Event,
        panel: &mut P,
        timers: &mut T,
        keys: &mut K,
    ) -> Flow
    where
        P: PanelAccess,
        T: KeyTimers,
        K: KeyDirectory,
    {
        let mut flow = Flow::Continue;
        let mut notes = Notifications::new();

        let fx = match event {
            Event::EncoderCw => self.ui.on_rotate(Direction::Forward),
            Event::EncoderCcw => self.ui.on_rotate(Direction::Back),
            Event::EncoderPush => self.ui.on_push(timers),
            Event::SecondaryPush => self.ui.on_secondary(),
            Event::Tick => {
                notes = timers.tick();
                Effects::new()
            }
            Event::KeyChange(slot) => {
                notes = keys.key_change(slot, timers);
                Effects::new()
            }
        };
        self.apply(fx, &mut flow, panel, timers, keys);
        self.dispatch(notes, &mut flow, panel, timers, keys);

        if event == Event::Tick {
            let fx = self.ui.on_tick(timers);
            self.apply(fx, &mut flow, panel, timers, keys);
        }
        if event.is_user_input() {
            let fx = self.ui.on_activity();
            self.apply(fx, &mut flow, panel, timers, keys);
        }

        let fx = self.ui.repaint(timers);
        self.apply(fx, &mut flow, panel, timers, keys);
        flow
    }

    /// Shows command feedback on the LCD.
    pub fn message<P, T, K>(
        &mut self,
        message: Message,
        panel: &mut P,
        timers: &mut T,
        keys: &mut K,
    ) where
        P: PanelAccess,
        T: KeyTimers,
        K: KeyDirectory,
    {
        let mut flow = Flow::Continue;
        let fx = self.ui.message(message);
        self.apply(fx, &mut flow, panel, timers, keys);
        let fx = self.ui.repaint(timers);
        self.apply(fx, &mut flow, panel, timers, keys);
    }

    /// Hands notifications raised outside of an event to the UI, e.g. after the console
    /// dropped expected keys, and repaints.
    pub fn notify<P, T, K>(
        &mut self,
        notes: Notifications,
        panel: &mut P,
        timers: &mut T,
        keys: &mut K,
    ) -> Flow
    where
        P: PanelAccess,
        T: KeyTimers,
        K: KeyDirectory,
    {
        let mut flow = Flow::Continue;
        self.dispatch(notes, &mut flow, panel, timers, keys);
        let fx = self.ui.repaint(timers);
        self.apply(fx, &mut flow, panel, timers, keys);
        flow
    }

    fn dispatch<P, T, K>(
        &mut self,
        notes: Notifications,
        flow: &mut Flow,
        panel: &mut P,
        timers: &mut T,
        keys: &mut K,
    ) where
        P: PanelAccess,
        T: KeyTimers,
        K: KeyDirectory,
    {
        for note in notes {
            let fx = self.ui.notify(note);
            self.apply(fx, flow, panel, timers, keys);
        }
    }

    fn apply<P, T, K>(
        &mut self,
        fx: Effects,
        flow: &mut Flow,
        panel: &mut P,
        timers: &mut T,
        keys: &mut K,
    ) where
        P: PanelAccess,
        T: KeyTimers,
        K: KeyDirectory,
    {
        let mut notes = Notifications::new();

        for effect in fx {
            match effect {
                Effect::Beeper(pattern) => panel.with_panel(|p, hw| p.start_beeper(pattern, hw)),
                Effect::Indicator(mode) => panel.with_panel(|p, hw| p.set_indicator(mode, hw)),
                Effect::KeyLeds(mode) => panel.with_panel(|p, hw| p.set_key_leds(mode, hw)),
                Effect::Backlight => panel.with_panel(|p, _| p.enable_backlight()),
                Effect::RotatingLight(on) => {
                    panel.with_panel(|p, hw| p.set_rotating_light(on, hw));
                }
                Effect::RestartRotatingLight => {
                    panel.with_panel(|p, hw| p.restart_rotating_light(hw));
                }
                Effect::Print(row, text) => {
                    let text = text.display(&*keys, &*timers);
                    panel.with_panel(|p, _| {
                        p.lcd_mut().print(usize::from(row), format_args!("{text}"));
                    });
                }
                Effect::SetTimeout { timer, minutes } => {
                    if timers.set_timeout(timer, minutes) {
                        notes.push(timers.expiry_changed()).ok();
                    }
                }
                Effect::ClearPizza(pizza) => {
                    if timers.cancel(MAX_KEYS + pizza) {
                        notes.push(timers.expiry_changed()).ok();
                    }
                }
                Effect::SecondaryAction => {
                    if timers.acknowledge() {
                        notes.push(timers.expiry_changed()).ok();
                    }
                }
                Effect::EnterBootloader => *flow = Flow::EnterBootloader,
            }
        }

        self.dispatch(notes, flow, panel, timers, keys);
    }
}
