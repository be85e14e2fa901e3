use crate::{
    BeepPattern, Event, EventQueue, IndicatorMode, KeyLedMode, LcdText, OutputRecord,
    QUARTERS_PER_SECOND, TICKS_PER_QUARTER,
    patterns::{Backlight, Beeper, Indicator, KeyLeds, RotatingLight},
};

/// Ticks between two PWM fade steps.
const PWM_STEP_TICKS: u16 = 16;

/// Outputs driven by the panel.
pub trait PanelHardware {
    fn set_backlight(&mut self, level: u8);

    fn set_indicator(&mut self, level: u8);

    /// Mirrors the record onto the shift register chain.
    fn update_outputs(&mut self, record: OutputRecord);
}

/// Pattern engines, LCD text and the coarse clock, advanced by the millisecond tick.
///
/// Every engine change goes through here so the [`OutputRecord`] is only written, and only
/// sent to the hardware, when a level actually changes.
#[derive(Debug)]
pub struct Panel {
    outputs: OutputRecord,
    beeper: Beeper,
    indicator: Indicator,
    backlight: Backlight,
    rotlight: RotatingLight,
    keyleds: KeyLeds,
    lcd: LcdText,
    ms: u16,
    quarters: u8,
}

impl Panel {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outputs: OutputRecord::new(),
            beeper: Beeper::new(),
            indicator: Indicator::new(),
            backlight: Backlight::new(),
            rotlight: RotatingLight::new(),
            keyleds: KeyLeds::new(),
            lcd: LcdText::new(),
            ms: 0,
            quarters: 0,
        }
    }

    /// Puts the PWM outputs into their resting levels and clears the shift registers.
    pub fn init<H: PanelHardware>(&mut self, hw: &mut H) {
        hw.set_backlight(self.backlight.level());
        hw.set_indicator(0);
        hw.update_outputs(self.outputs);
    }

    #[inline]
    #[must_use]
    pub fn outputs(&self) -> OutputRecord {
        self.outputs
    }

    #[inline]
    #[must_use]
    pub fn lcd(&self) -> &LcdText {
        &self.lcd
    }

    #[inline]
    pub fn lcd_mut(&mut self) -> &mut LcdText {
        &mut self.lcd
    }

    #[inline]
    #[must_use]
    pub fn beep_pattern(&self) -> BeepPattern {
        self.beeper.pattern()
    }

    #[inline]
    #[must_use]
    pub fn indicator_mode(&self) -> IndicatorMode {
        self.indicator.mode()
    }

    #[inline]
    #[must_use]
    pub fn backlight_level(&self) -> u8 {
        self.backlight.level()
    }

    pub fn start_beeper<H: PanelHardware>(&mut self, pattern: BeepPattern, hw: &mut H) {
        if let Some(level) = self.beeper.start(pattern) {
            self.set_beeper(level, hw);
        }
    }

    pub fn enable_beeper<H: PanelHardware>(&mut self, enable: bool, hw: &mut H) {
        if let Some(level) = self.beeper.enable(enable) {
            self.set_beeper(level, hw);
        }
    }

    pub fn set_indicator<H: PanelHardware>(&mut self, mode: IndicatorMode, hw: &mut H) {
        if let Some(level) = self.indicator.set_mode(mode, self.outputs.beeper) {
            hw.set_indicator(level);
        }
    }

    pub fn enable_backlight(&mut self) {
        self.backlight.enable();
    }

    pub fn set_rotating_light<H: PanelHardware>(&mut self, active: bool, hw: &mut H) {
        if let Some(on) = self.rotlight.set_active(active) {
            self.outputs.rotating_light = on;
            hw.update_outputs(self.outputs);
        }
    }

    pub fn restart_rotating_light<H: PanelHardware>(&mut self, hw: &mut H) {
        if let Some(on) = self.rotlight.restart() {
            self.outputs.rotating_light = on;
            hw.update_outputs(self.outputs);
        }
    }

    pub fn set_key_leds<H: PanelHardware>(&mut self, mode: KeyLedMode, hw: &mut H) {
        if let Some(leds) = self.keyleds.set(mode) {
            self.set_leds(leds, hw);
        }
    }

    /// The whole millisecond tick.
    ///
    /// Interrupt handlers that want to keep the masked sections short run the steps one by one.
    pub fn tick<H: PanelHardware>(&mut self, events: &mut EventQueue, hw: &mut H) {
        self.beeper_step(hw);
        self.pwm_step(hw);
        if self.advance_clock() {
            self.quarter_step(events, hw);
        }
    }

    pub fn beeper_step<H: PanelHardware>(&mut self, hw: &mut H) {
        if let Some(level) = self.beeper.update() {
            self.set_beeper(level, hw);
        }
    }

    /// Backlight fade and indicator oscillator, every [`PWM_STEP_TICKS`] ticks.
    pub fn pwm_step<H: PanelHardware>(&mut self, hw: &mut H) {
        if self.ms % PWM_STEP_TICKS != 0 {
            return;
        }
        if let Some(level) = self.backlight.update() {
            hw.set_backlight(level);
        }
        if let Some(level) = self.indicator.update() {
            hw.set_indicator(level);
        }
    }

    /// Counts one millisecond, returns whether a quarter second is complete.
    pub fn advance_clock(&mut self) -> bool {
        self.ms += 1;
        if self.ms < TICKS_PER_QUARTER {
            return false;
        }
        self.ms = 0;
        self.quarters = (self.quarters + 1) % QUARTERS_PER_SECOND;
        true
    }

    /// Key LED blinking on odd quarters, LCD scrolling on even ones, and the once per second
    /// work: rotating light, backlight hold and the [`Event::Tick`].
    pub fn quarter_step<H: PanelHardware>(&mut self, events: &mut EventQueue, hw: &mut H) {
        if self.quarters % 2 == 1 {
            if let Some(leds) = self.keyleds.toggle() {
                self.set_leds(leds, hw);
            }
        } else {
            self.lcd.scroll();
        }

        if self.quarters == 0 {
            if let Some(on) = self.rotlight.second() {
                self.outputs.rotating_light = on;
                hw.update_outputs(self.outputs);
            }
            events.push(Event::Tick).ok();
            self.backlight.second();
        }
    }

    fn set_beeper<H: PanelHardware>(&mut self, level: bool, hw: &mut H) {
        if let Some(indicator) = self.indicator.beeper_changed(level) {
            hw.set_indicator(indicator);
        }
        if self.outputs.beeper != level {
            self.outputs.beeper = level;
            hw.update_outputs(self.outputs);
        }
    }

    fn set_leds<H: PanelHardware>(&mut self, leds: u8, hw: &mut H) {
        self.outputs.leds = leds;
        hw.update_outputs(self.outputs);
    }
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}
