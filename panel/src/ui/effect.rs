use heapless::Vec;

use super::Text;
use crate::{BeepPattern, IndicatorMode, KeyLedMode};

/// Side effect of a UI transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    Beeper(BeepPattern),
    Indicator(IndicatorMode),
    KeyLeds(KeyLedMode),
    /// Turn the backlight on, or keep it on.
    Backlight,
    RotatingLight(bool),
    /// Start the rotating light cycle over, light on.
    RestartRotatingLight,
    Print(u8, Text),
    SetTimeout { timer: u8, minutes: u8 },
    ClearPizza(u8),
    /// The secondary button was pressed while idle.
    SecondaryAction,
    EnterBootloader,
}

const CAPACITY: usize = 16;

/// Effects of one transition, in the order they must be applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effects(Vec<Effect, CAPACITY>);

impl Effects {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn push(&mut self, effect: Effect) {
        let pushed = self.0.push(effect);
        debug_assert!(pushed.is_ok(), "effect list overflow");
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Effect] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Effects {
    type Item = Effect;
    type IntoIter = <Vec<Effect, CAPACITY> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
