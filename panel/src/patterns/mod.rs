//! Tick driven output patterns.
//!
//! The engines only keep time and decide levels. They report the level to write (if it
//! changed) and leave the writing to [`crate::Panel`].

mod backlight;
mod beeper;
mod indicator;
mod keyleds;
mod rotlight;

pub use backlight::Backlight;
pub use beeper::{BeepPattern, Beeper};
pub use indicator::{Indicator, IndicatorMode};
pub use keyleds::{KeyLedMode, KeyLeds};
pub use rotlight::RotatingLight;
