//! Panel core of the key cabinet firmware.
//!
//! Everything in here is hardware agnostic so it can be exercised on the host:
//! - [`ShiftRegisters`] mirrors the [`OutputRecord`] onto the shift register chain.
//! - [`Debouncer`] turns raw input samples into [`Event`]s.
//! - [`Panel`] owns the pattern engines and the [`LcdText`] buffer and is advanced once per
//!   millisecond through [`Panel::tick`].
//! - [`Ui`] is the menu state machine. It consumes events and returns [`Effects`] which the
//!   [`Controller`] applies to the panel and to the key collaborators.

#![cfg_attr(not(test), no_std)]

mod command;
mod controller;
mod event;
mod inputs;
mod keys;
mod lcd;
mod outputs;
mod panel;
mod patterns;
mod timers;
mod ui;

pub use command::{Command, CommandError, Console, ConsoleRequest, ProgramStatus};
pub use controller::{Controller, Flow, PanelAccess};
pub use event::{Event, EventQueue, QueueFull};
pub use inputs::{Debouncer, InputSample};
pub use keys::{
    KeyDirectory, KeyFlags, KeyInfo, KeyName, KeyRecord, KeyTable, KeyTableError, KeyboardInfo,
    Notification, Notifications, SlotState,
};
pub use lcd::{CharDisplay, Frame, LcdText, TextLine, draw};
pub use outputs::{OutputRecord, ShiftRegisterBus, ShiftRegisters};
pub use panel::{Panel, PanelHardware};
pub use patterns::{BeepPattern, IndicatorMode, KeyLedMode};
pub use timers::{KeyTimerBank, KeyTimers};
pub use ui::{
    Direction, Effect, Effects, KeyErrorKind, MenuEntry, Message, Text, TextDisplay, Ui, UiState,
};

/// Number of physical key slots. Each slot has one LED on the shift register chain.
pub const MAX_KEYS: u8 = 8;
/// Number of pizza timers. Their countdowns follow the key timers in the timer bank.
pub const NUM_PIZZA_TIMERS: u8 = 3;
/// Total number of countdowns handled by a [`KeyTimers`] implementation.
pub const NUM_TIMERS: usize = (MAX_KEYS + NUM_PIZZA_TIMERS) as usize;
/// Maximum length of key and keyboard names.
pub const NAME_LENGTH: usize = 16;

/// Visible characters per LCD row.
pub const LCD_WIDTH: usize = 16;

/// Seconds without input before a menu entry falls back to idle.
pub const MENU_TIMEOUT_SECONDS: u8 = 10;
/// Seconds without input before the time selection or key locator falls back to idle.
pub const MENU_TIMEOUT_SELECT_SECONDS: u8 = 20;
/// Seconds a command feedback message stays on screen.
pub const UI_MESSAGE_TIMEOUT_SECONDS: u8 = 5;
/// Seconds the backlight stays bright after the last activity.
pub const LCD_BACKLIGHT_TIMEOUT_SECS: u8 = 30;

/// Preselected pizza timer duration in minutes.
pub const PIZZA_TIMER_DEFAULT_TIME: u8 = 10;
/// Longest selectable pizza timer duration in minutes.
pub const PIZZA_TIMER_MAX_TIME: u8 = 30;

/// Ticks (milliseconds) per quarter second of the coarse clock.
pub const TICKS_PER_QUARTER: u16 = 256;
/// Quarter seconds per coarse [`Event::Tick`].
pub const QUARTERS_PER_SECOND: u8 = 4;
