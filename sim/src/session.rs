use std::fmt::Write as _;

use panel::{
    BeepPattern, Console, ConsoleRequest, Controller, Debouncer, Direction, Event, EventQueue,
    Flow, IndicatorMode, InputSample, KeyErrorKind, KeyFlags, KeyInfo, KeyName, KeyRecord,
    KeyTable, KeyTimerBank, KeyboardInfo, Panel, PanelAccess, SlotState, Ui, UiState, draw,
};
use thiserror::Error as ThisError;
use tracing::{debug, info, instrument, trace};

use crate::{
    hardware::{SimDisplay, SimHardware},
    script::Action,
};

/// An `expect` action that did not hold.
#[derive(Debug, ThisError)]
#[error("LCD row {row} reads `{found}`, expected `{expected}`")]
pub struct Mismatch {
    pub row: usize,
    pub expected: String,
    pub found: String,
}

/// What the tick interrupt shares with the foreground on the real board.
#[derive(Debug)]
struct Board {
    panel: Panel,
    hw: SimHardware,
    events: EventQueue,
}

impl PanelAccess for Board {
    type Hardware = SimHardware;

    fn with_panel<R>(&mut self, f: impl FnOnce(&mut Panel, &mut SimHardware) -> R) -> R {
        f(&mut self.panel, &mut self.hw)
    }
}

/// Observable state used to log transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Snapshot {
    state: UiState,
    expired: Option<u8>,
    key_error: Option<(KeyErrorKind, u8)>,
    beeper: BeepPattern,
    indicator: IndicatorMode,
}

/// The panel core wired to simulated hardware, advanced one millisecond tick at a time.
#[derive(Debug)]
pub struct Session {
    board: Board,
    controller: Controller,
    console: Console,
    keys: KeyTable,
    timers: KeyTimerBank,
    debouncer: Debouncer,
    input: InputSample,
    display: SimDisplay,
    /// Console answers and printed frames not yet handed out.
    output: String,
    frames: bool,
    bootloader: bool,
    elapsed_ms: u64,
}

impl Session {
    /// Ticks per quadrature phase of an encoder detent.
    const ROTATE_PHASE_MS: u64 = 4;
    /// Ticks a button is held down, then released.
    const PRESS_MS: u64 = 30;

    /// A powered up panel with an empty key table. With `frames` every LCD redraw is added to
    /// the output.
    #[must_use]
    pub fn new(frames: bool) -> Self {
        let mut board = Board {
            panel: Panel::new(),
            hw: SimHardware::new(),
            events: EventQueue::new(),
        };
        board.with_panel(|panel, hw| panel.init(hw));

        let mut session = Self {
            board,
            controller: Controller::new(),
            console: Console::new(),
            keys: KeyTable::new(),
            timers: KeyTimerBank::new(),
            debouncer: Debouncer::new(),
            input: InputSample::IDLE,
            display: SimDisplay::new(),
            output: String::new(),
            frames,
            bootloader: false,
            elapsed_ms: 0,
        };

        // Let the debouncer settle on the idle levels.
        session.advance(2);
        session
    }

    /// Runs one script action.
    ///
    /// # Errors
    ///
    /// Returns [`Mismatch`] if an [`Action::Expect`] does not hold.
    pub fn run(&mut self, action: &Action) -> Result<(), Mismatch> {
        trace!(?action, at_ms = self.elapsed_ms, "action");
        match action {
            Action::Rotate { direction, steps } => {
                for _ in 0..*steps {
                    self.rotate(*direction);
                }
            }
            Action::Push => self.press(InputSample::PUSH),
            Action::Smaul => self.press(InputSample::SECONDARY),
            Action::Wait(ms) => self.advance(*ms),
            Action::Plug {
                slot,
                key,
                keyboard,
            } => {
                let record = self.key_record(*key, *keyboard);
                self.change_slot(*slot, SlotState::Valid(record));
            }
            Action::Garbled { slot } => self.change_slot(*slot, SlotState::ReadError),
            Action::Unplug { slot } => self.change_slot(*slot, SlotState::Empty),
            Action::Show => {
                let frame = self.frame_text();
                self.output.push_str(&frame);
            }
            Action::Expect { row, text } => self.expect(*row, text)?,
            Action::Console(line) => self.console(line),
        }
        Ok(())
    }

    /// Lets time pass without any input change.
    pub fn advance(&mut self, ms: u64) {
        for _ in 0..ms {
            self.tick();
        }
    }

    /// Hands out the console answers and frames collected so far.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// LCD row as last drawn, surrounding blanks removed.
    #[must_use]
    pub fn row(&self, row: usize) -> String {
        self.display.row(row).trim().to_owned()
    }

    #[inline]
    #[must_use]
    pub fn ui(&self) -> &Ui {
        self.controller.ui()
    }

    #[inline]
    #[must_use]
    pub fn hardware(&self) -> &SimHardware {
        &self.board.hw
    }

    #[inline]
    #[must_use]
    pub fn bootloader_requested(&self) -> bool {
        self.bootloader
    }

    fn tick(&mut self) {
        self.debouncer.poll(self.input, &mut self.board.events);
        self.board.panel.tick(&mut self.board.events, &mut self.board.hw);
        self.elapsed_ms += 1;

        while let Some(event) = self.board.events.pop() {
            self.handle(event);
        }
        self.render();
    }

    fn handle(&mut self, event: Event) {
        trace!(?event, at_ms = self.elapsed_ms, "event");
        let before = self.snapshot();
        let flow = self.controller.handle(
            event,
            &mut self.board,
            &mut self.timers,
            &mut self.keys,
        );
        self.log_changes(before);

        if flow == Flow::EnterBootloader {
            info!("bootloader requested");
            self.bootloader = true;
        }
    }

    #[instrument(skip(self))]
    fn console(&mut self, line: &str) {
        writeln!(self.output, "> {line}").ok();
        let request = self
            .console
            .handle_line(line, &mut self.keys, &mut self.timers, &mut self.output)
            .ok()
            .flatten();

        match request {
            Some(ConsoleRequest::Bootloader) => {
                info!("bootloader requested");
                self.bootloader = true;
            }
            Some(ConsoleRequest::Program { slot, record }) => {
                let status = self.keys.program(slot, record);
                info!(slot, ?status, "key programmed");

                let before = self.snapshot();
                if let Ok(message) = self.console.program_finished(status, &mut self.output) {
                    self.controller.message(
                        message,
                        &mut self.board,
                        &mut self.timers,
                        &mut self.keys,
                    );
                }
                self.log_changes(before);

                self.board.events.push(Event::KeyChange(slot)).ok();
                self.tick();
            }
            Some(ConsoleRequest::Beeper(on)) => {
                info!(on, "beeper enabled");
                self.board.with_panel(|panel, hw| panel.enable_beeper(on, hw));
            }
            Some(ConsoleRequest::Notify(notes)) => {
                let before = self.snapshot();
                self.controller.notify(
                    notes,
                    &mut self.board,
                    &mut self.timers,
                    &mut self.keys,
                );
                self.log_changes(before);
                self.render();
            }
            None => {}
        }
    }

    fn rotate(&mut self, direction: Direction) {
        const A: u8 = InputSample::ROT_A;
        const B: u8 = InputSample::ROT_B;
        let (first, second) = match direction {
            Direction::Forward => (A, B),
            Direction::Back => (B, A),
        };

        let idle = InputSample::IDLE;
        for sample in [
            idle.with(first, false),
            idle.with(A | B, false),
            idle.with(second, false),
            idle,
        ] {
            self.input = sample;
            self.advance(Self::ROTATE_PHASE_MS);
        }
    }

    fn press(&mut self, line: u8) {
        self.input = InputSample::IDLE.with(line, false);
        self.advance(Self::PRESS_MS);
        self.input = InputSample::IDLE;
        self.advance(Self::PRESS_MS);
    }

    fn change_slot(&mut self, slot: u8, state: SlotState) {
        info!(slot, ?state, "slot changed");
        self.keys.set_slot(slot, state);
        self.board.events.push(Event::KeyChange(slot)).ok();
        self.tick();
    }

    /// A key as it would be read from a slot. Keys of this keyboard carry their configured
    /// settings when they are expected.
    fn key_record(&self, id: u8, keyboard: Option<u8>) -> KeyRecord {
        let kb = match keyboard {
            Some(kb_id) if kb_id != self.keys.keyboard().id => KeyboardInfo {
                id: kb_id,
                name: key_name(&format!("Keyboard {kb_id}")),
            },
            _ => self.keys.keyboard().clone(),
        };

        let key = self
            .keys
            .expected()
            .find(|(_, key)| key.id == id)
            .map(|(_, key)| key.clone())
            .unwrap_or_else(|| KeyInfo {
                id,
                dfl_timeout: 0,
                max_timeout: 0,
                flags: KeyFlags::NONE,
                name: key_name(&format!("Key {id}")),
            });

        KeyRecord { key, kb }
    }

    fn expect(&self, row: usize, expected: &str) -> Result<(), Mismatch> {
        let found = self.row(row);
        if found == expected.trim() {
            return Ok(());
        }

        Err(Mismatch {
            row: row + 1,
            expected: expected.to_owned(),
            found,
        })
    }

    fn render(&mut self) {
        let Some(frame) = self.board.panel.lcd_mut().frame() else {
            return;
        };
        draw(&frame, &mut self.display);
        debug!(
            top = %self.display.row(0),
            bottom = %self.display.row(1),
            "lcd"
        );

        if self.frames {
            let frame = self.frame_text();
            writeln!(self.output, "{:>8} ms", self.elapsed_ms).ok();
            self.output.push_str(&frame);
        }
    }

    fn frame_text(&self) -> String {
        format!(
            "+----------------+\n|{:<16}|\n|{:<16}|\n+----------------+\n",
            self.display.row(0),
            self.display.row(1)
        )
    }

    fn snapshot(&self) -> Snapshot {
        let ui = self.controller.ui();
        Snapshot {
            state: ui.state(),
            expired: ui.expired_timer(),
            key_error: ui.key_error(),
            beeper: self.board.panel.beep_pattern(),
            indicator: self.board.panel.indicator_mode(),
        }
    }

    fn log_changes(&self, before: Snapshot) {
        let after = self.snapshot();
        if after.state != before.state {
            info!(from = ?before.state, to = ?after.state, "ui state");
        }
        if after.expired != before.expired {
            match after.expired {
                Some(timer) => info!(timer, "timer expired"),
                None => info!("expired timer cleared"),
            }
        }
        if after.key_error != before.key_error {
            match after.key_error {
                Some((kind, slot)) => info!(?kind, slot, "key error"),
                None => info!("key error cleared"),
            }
        }
        if after.beeper != before.beeper {
            debug!(pattern = ?after.beeper, "beeper");
        }
        if after.indicator != before.indicator {
            debug!(mode = ?after.indicator, "indicator");
        }
    }
}

/// Builds a key name, cutting it to the storable length.
fn key_name(name: &str) -> KeyName {
    let mut key_name = KeyName::new();
    for c in name.chars().filter(char::is_ascii) {
        if key_name.push(c).is_err() {
            break;
        }
    }
    key_name
}

#[cfg(test)]
mod tests {
    use panel::{BeepPattern, MAX_KEYS, UiState};

    use super::Session;
    use crate::script::parse;

    fn run(session: &mut Session, script: &str) {
        for (line, action) in parse(script).unwrap() {
            if let Err(e) = session.run(&action) {
                panic!("line {line}: {e}");
            }
        }
    }

    const SETUP: &str = "
        > set_keyboard 1 Lab
        > add_key 10 1 10 BR Door
    ";

    #[test]
    fn test_missing_key_raises_the_alarm() {
        let mut session = Session::new(false);
        run(&mut session, SETUP);
        run(
            &mut session,
            "
            plug 0 10
            unplug 0
            expect 2 01 minutes
            push
            wait 20s
            expect 1
            expect 2 --- --- --- 41s
            wait 42s
            expect 1 Key Door missing
            ",
        );

        assert_eq!(session.ui().expired_timer(), Some(0));
        assert!(session.hardware().latched().rotating_light);

        run(&mut session, "smaul\nexpect 1");
        assert_eq!(session.ui().expired_timer(), None);
        assert!(!session.hardware().latched().rotating_light);

        // The timer was re-armed; bringing the key back stops it.
        run(&mut session, "plug 0 10\nexpect 2 --- --- --- ---");
    }

    #[test]
    fn test_removed_key_timeout_stops_at_its_maximum() {
        let mut session = Session::new(false);
        run(&mut session, SETUP);
        run(
            &mut session,
            "
            plug 0 10
            unplug 0
            cw 15
            expect 2 10 minutes
            push
            expect 2 --- --- --- 10m
            ",
        );
        assert_eq!(session.ui().state(), UiState::Idle);
    }

    #[test]
    fn test_deleted_key_stays_quiet() {
        let mut session = Session::new(false);
        run(&mut session, SETUP);
        run(
            &mut session,
            "
            plug 0 10
            unplug 0
            push
            wait 70s
            expect 1 Key Door missing
            > del_key 10
            expect 1
            expect 2 --- --- --- ---
            wait 2m
            expect 1
            ",
        );
        assert_eq!(session.ui().expired_timer(), None);
        assert!(!session.hardware().latched().rotating_light);
    }

    #[test]
    fn test_disabled_beeper_stays_silent() {
        let mut session = Session::new(false);
        run(
            &mut session,
            "
            > beeper off
            push
            cw
            push
            ccw 9
            push
            wait 63s
            expect 1 Pizza 1 done
            ",
        );
        assert_eq!(session.board.panel.beep_pattern(), BeepPattern::Disabled);
        assert!(!session.hardware().latched().beeper);

        run(&mut session, "> beeper on
smaul");
        assert_eq!(session.board.panel.beep_pattern(), BeepPattern::Off);
    }

    #[test]
    fn test_pizza_timer_from_the_menu() {
        let mut session = Session::new(false);
        run(
            &mut session,
            "
            push
            expect 1 Locate key
            cw
            expect 1 Pizzatimer 1
            push
            expect 2 10 minutes
            ccw 9
            push
            expect 2 1m --- --- ---
            wait 63s
            expect 1 Pizza 1 done
            ",
        );
        assert_eq!(session.ui().state(), UiState::Idle);
        assert_eq!(session.ui().expired_timer(), Some(MAX_KEYS));

        run(&mut session, "smaul\nexpect 1\nexpect 2 --- --- --- ---");
        assert_eq!(session.board.panel.beep_pattern(), BeepPattern::Off);
    }

    #[test]
    fn test_foreign_key_is_reported() {
        let mut session = Session::new(false);
        run(&mut session, SETUP);
        run(&mut session, "plug 4 10 9");
        assert_eq!(session.ui().state(), UiState::KeyError);

        // Buttons do nothing until the key is gone.
        run(&mut session, "push\nunplug 4");
        assert_eq!(session.ui().state(), UiState::Idle);
        assert_eq!(session.ui().key_error(), None);
    }

    #[test]
    fn test_console_programming_feedback() {
        let mut session = Session::new(false);
        run(&mut session, SETUP);
        run(
            &mut session,
            "
            > program_key 2 10 1 10 BR Door
            expect 1 No key plugged
            ",
        );
        let output = session.take_output();
        assert!(output.contains("> program_key 2 10 1 10 BR Door\n"));
        assert!(output.contains("Could not program: No key plugged\n"));
        assert_eq!(session.ui().state(), UiState::MessageTimeout);

        run(&mut session, "wait 7s\nexpect 1");
        assert_eq!(session.ui().state(), UiState::Idle);

        run(&mut session, "> frobnicate");
        assert_eq!(session.take_output(), "> frobnicate\nWhat?\n");
    }

    #[test]
    fn test_bootloader_from_menu() {
        let mut session = Session::new(false);
        run(&mut session, "push\nccw\nexpect 1 Enter bootloader");
        assert!(!session.bootloader_requested());
        run(&mut session, "push");
        assert!(session.bootloader_requested());
    }

    #[test]
    fn test_frames_are_printed() {
        let mut session = Session::new(true);
        run(&mut session, "push");
        let output = session.take_output();
        assert!(output.contains("|Locate key      |"));
        assert!(session.display.redraws() > 0);
    }
}
