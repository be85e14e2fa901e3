//! Serial command line.

use core::fmt::{self, Write};

use thiserror::Error as ThisError;

use crate::{
    KeyDirectory, KeyFlags, KeyInfo, KeyName, KeyRecord, KeyTable, KeyTimers, KeyboardInfo,
    MAX_KEYS, Message, Notifications, SlotState,
};

const HELP: &str = "
          == H E L P ==

show_keys
   Show the keys currently plugged in
show_config
   Print the configuration (keyboard ID, expected keys) as commands that can
   be fed back into the command line
set_keyboard <ID> <Name...>
   Set keyboard ID and name. Set this up before programming keys!
add_key <ID> <dfl timeout> <max timeout> <flags> <Name...>
   Add a key to the list of expected keys, arguments as for program_key.
   A key with the same ID is replaced.
del_key <ID>
   Remove a key from the list of expected keys
clear_keys
   Clear the list of expected keys
capture_keys
   Replace the list of expected keys with the keys currently plugged in
program_key <position> <ID> <dfl timeout> <max timeout> <flags> <Name...>
   Program the key in position <position>, 0..7 from left to right.
   This does not add the key to the list of expected keys!
   dfl timeout - minutes until a removed key raises an alarm (1..255),
                 0 disables the timeout
   max timeout - longest timeout that can be set, in minutes (1..255)
   flags - any combination of the letters below, - for none
     B - a missing key makes the keyboard beep after the timeout
     R - a missing key turns the rotating light on now and then
beeper <on|off>
   Silence the beeper until it is switched on again
boot
   Jump into the bootloader for a firmware update

Common parameter types:
   ID   - decimal 1-255, zero is reserved
   Name - ASCII, at most 16 characters, may contain spaces.
          No quotes needed, takes the rest of the line
";

/// A parsed command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Boot,
    ShowKeys,
    ShowConfig,
    SetKeyboard(KeyboardInfo),
    AddKey(KeyInfo),
    DelKey(u8),
    ClearKeys,
    CaptureKeys,
    ProgramKey { slot: u8, key: KeyInfo },
    Beeper(bool),
}

#[derive(Clone, Copy, Debug, ThisError)]
#[cfg_attr(test, derive(PartialEq, strum::EnumIter))]
pub enum CommandError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("missing argument")]
    MissingArgument,
    #[error("not a number between 0 and 255")]
    InvalidNumber,
    #[error("Bad key data specified")]
    BadKeyData,
    #[error("no such key position")]
    InvalidSlot,
    #[error("expected on or off")]
    InvalidSwitch,
}

impl CommandError {
    /// Whether the line could not be understood at all, as opposed to carrying bad values.
    #[must_use]
    pub fn is_syntax(self) -> bool {
        matches!(
            self,
            Self::UnknownCommand | Self::MissingArgument | Self::InvalidNumber
        )
    }
}

/// Splits arguments at spaces, except the last one which takes the rest of the line.
struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn next(&mut self) -> Result<&'a str, CommandError> {
        let rest = self.rest.trim_start_matches(' ');
        let (arg, rest) = rest.split_once(' ').unwrap_or((rest, ""));
        self.rest = rest;
        if arg.is_empty() {
            Err(CommandError::MissingArgument)
        } else {
            Ok(arg)
        }
    }

    fn number(&mut self) -> Result<u8, CommandError> {
        self.next()?
            .parse()
            .map_err(|_| CommandError::InvalidNumber)
    }

    fn id(&mut self) -> Result<u8, CommandError> {
        match self.number()? {
            0 => Err(CommandError::BadKeyData),
            id => Ok(id),
        }
    }

    fn switch(&mut self) -> Result<bool, CommandError> {
        match self.next()? {
            "on" => Ok(true),
            "off" => Ok(false),
            _ => Err(CommandError::InvalidSwitch),
        }
    }

    fn name(&mut self) -> Result<KeyName, CommandError> {
        let rest = self.rest.trim();
        self.rest = "";
        if rest.is_empty() {
            return Err(CommandError::MissingArgument);
        }

        let mut name = KeyName::new();
        for c in rest.chars() {
            if name.push(c).is_err() {
                break;
            }
        }
        Ok(name)
    }

    fn key(&mut self) -> Result<KeyInfo, CommandError> {
        Ok(KeyInfo {
            id: self.id()?,
            dfl_timeout: self.number()?,
            max_timeout: self.number()?,
            flags: KeyFlags::from_letters(self.next()?),
            name: self.name()?,
        })
    }
}

impl Command {
    /// Parses a line, `None` for a line with nothing but blanks or a comment.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.split_once('#').map_or(line, |(line, _)| line);
        let mut args = Args { rest: line.trim() };
        let Ok(command) = args.next() else {
            return Ok(None);
        };

        let command = match command {
            "help" | "?" => Self::Help,
            "boot" => Self::Boot,
            "show_keys" => Self::ShowKeys,
            "show_config" => Self::ShowConfig,
            "set_keyboard" => Self::SetKeyboard(KeyboardInfo {
                id: args.number()?,
                name: args.name()?,
            }),
            "add_key" => Self::AddKey(args.key()?),
            "del_key" => Self::DelKey(args.id()?),
            "clear_keys" => Self::ClearKeys,
            "capture_keys" => Self::CaptureKeys,
            "beeper" => Self::Beeper(args.switch()?),
            "program_key" => {
                let slot = args.number()?;
                if slot >= MAX_KEYS {
                    return Err(CommandError::InvalidSlot);
                }
                Self::ProgramKey {
                    slot,
                    key: args.key()?,
                }
            }
            _ => return Err(CommandError::UnknownCommand),
        };
        Ok(Some(command))
    }
}

/// Result of writing a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(strum::EnumIter))]
pub enum ProgramStatus {
    Success,
    NoKey,
    ReadFailure,
}

impl From<ProgramStatus> for Message {
    fn from(status: ProgramStatus) -> Self {
        match status {
            ProgramStatus::Success => Self::ProgrammingOk,
            ProgramStatus::NoKey => Self::NoKeyPlugged,
            ProgramStatus::ReadFailure => Self::TransmissionFailed,
        }
    }
}

/// Work a command hands back to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleRequest {
    Bootloader,
    /// Write the record onto the key; report back through [`Console::program_finished`].
    Program { slot: u8, record: KeyRecord },
    /// Enable or disable the beeper.
    Beeper(bool),
    /// Expected keys were dropped; hand these to the UI.
    Notify(Notifications),
}

/// Runs command lines against the key table.
#[derive(Debug, Default)]
pub struct Console {
    busy: bool,
}

impl Console {
    #[must_use]
    pub const fn new() -> Self {
        Self { busy: false }
    }

    /// Whether a key programming request is outstanding.
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Executes one line, writing the answer to `out`. Dropping expected keys stops their
    /// timers.
    pub fn handle_line<T: KeyTimers, W: Write>(
        &mut self,
        line: &str,
        keys: &mut KeyTable,
        timers: &mut T,
        out: &mut W,
    ) -> Result<Option<ConsoleRequest>, fmt::Error> {
        if self.busy {
            writeln!(out, "Busy, try again.")?;
            return Ok(None);
        }

        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(None),
            Err(e) if e.is_syntax() => {
                writeln!(out, "What?")?;
                return Ok(None);
            }
            Err(e) => {
                writeln!(out, "{e}")?;
                return Ok(None);
            }
        };

        match command {
            Command::Help => out.write_str(HELP)?,
            Command::Boot => return Ok(Some(ConsoleRequest::Bootloader)),
            Command::ShowKeys => show_keys(keys, out)?,
            Command::ShowConfig => show_config(keys, out)?,
            Command::SetKeyboard(keyboard) => keys.set_keyboard(keyboard),
            Command::AddKey(key) => {
                if let Err(e) = keys.add_key(key) {
                    writeln!(out, "{e}")?;
                }
            }
            Command::DelKey(id) => match keys.del_key(id, timers) {
                Ok(notes) => return Ok(notify(notes)),
                Err(e) => writeln!(out, "{e}")?,
            },
            Command::ClearKeys => return Ok(notify(keys.clear_keys(timers))),
            Command::CaptureKeys => return Ok(notify(keys.capture_keys(timers))),
            Command::Beeper(on) => return Ok(Some(ConsoleRequest::Beeper(on))),
            Command::ProgramKey { slot, key } => {
                self.busy = true;
                let record = KeyRecord {
                    key,
                    kb: keys.keyboard().clone(),
                };
                return Ok(Some(ConsoleRequest::Program { slot, record }));
            }
        }

        Ok(None)
    }

    /// Completion of a [`ConsoleRequest::Program`]. Returns the message for the LCD.
    pub fn program_finished<W: Write>(
        &mut self,
        status: ProgramStatus,
        out: &mut W,
    ) -> Result<Message, fmt::Error> {
        self.busy = false;
        match status {
            ProgramStatus::Success => writeln!(out, "Programming successful")?,
            ProgramStatus::NoKey => writeln!(out, "Could not program: No key plugged")?,
            ProgramStatus::ReadFailure => writeln!(out, "Could not program: Transmission failed")?,
        }
        Ok(status.into())
    }
}

fn notify(notes: Notifications) -> Option<ConsoleRequest> {
    (!notes.is_empty()).then_some(ConsoleRequest::Notify(notes))
}

fn show_keys<W: Write>(keys: &KeyTable, out: &mut W) -> fmt::Result {
    for slot in 0..MAX_KEYS {
        write!(out, "Position {}: ", slot + 1)?;
        match keys.slot(slot) {
            SlotState::Empty => writeln!(out, "No key plugged")?,
            SlotState::ReadError => writeln!(out, "Read error")?,
            SlotState::BadChecksum => writeln!(out, "Bad checksum")?,
            SlotState::Valid(KeyRecord { key, .. }) => {
                write!(
                    out,
                    "ID {} ({}), timeout {} (max {})",
                    key.id, key.name, key.dfl_timeout, key.max_timeout
                )?;
                if key.flags.contains(KeyFlags::BEEP) {
                    out.write_str(", beep when gone")?;
                }
                if key.flags.contains(KeyFlags::ROTLIGHT) {
                    out.write_str(", rotate light when gone")?;
                }
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

fn show_config<W: Write>(keys: &KeyTable, out: &mut W) -> fmt::Result {
    let keyboard = keys.keyboard();
    writeln!(out, "# Keyboard config dump")?;
    writeln!(out, "set_keyboard {} {}", keyboard.id, keyboard.name)?;
    writeln!(out, "clear_keys")?;
    for (_, key) in keys.expected() {
        writeln!(
            out,
            "add_key {} {} {} {} {}",
            key.id, key.dfl_timeout, key.max_timeout, key.flags, key.name
        )?;
    }
    writeln!(out, "# END Keyboard config dump")
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::{Command, CommandError, Console, ConsoleRequest, ProgramStatus};
    use crate::{
        KeyDirectory, KeyFlags, KeyInfo, KeyRecord, KeyTable, KeyTimerBank, KeyTimers,
        KeyboardInfo, Message, Notification, SlotState,
    };

    fn run(
        console: &mut Console,
        keys: &mut KeyTable,
        line: &str,
    ) -> (String, Option<ConsoleRequest>) {
        run_timed(console, keys, &mut KeyTimerBank::new(), line)
    }

    fn run_timed(
        console: &mut Console,
        keys: &mut KeyTable,
        timers: &mut KeyTimerBank,
        line: &str,
    ) -> (String, Option<ConsoleRequest>) {
        let mut out = String::new();
        let request = console.handle_line(line, keys, timers, &mut out).unwrap();
        (out, request)
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("help"), Ok(Some(Command::Help)));
        assert_eq!(Command::parse("  ?  "), Ok(Some(Command::Help)));
        assert_eq!(Command::parse("boot # now"), Ok(Some(Command::Boot)));
        assert_eq!(Command::parse("clear_keys"), Ok(Some(Command::ClearKeys)));
        assert_eq!(Command::parse("del_key 12"), Ok(Some(Command::DelKey(12))));
        assert_eq!(Command::parse("beeper off"), Ok(Some(Command::Beeper(false))));
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("   # just a comment"), Ok(None));
    }

    #[test]
    fn test_last_argument_takes_the_rest() {
        let parsed = Command::parse("add_key 5 10 30 BR Back  door # spare").unwrap();
        assert_eq!(
            parsed,
            Some(Command::AddKey(KeyInfo {
                id: 5,
                dfl_timeout: 10,
                max_timeout: 30,
                flags: KeyFlags::BEEP | KeyFlags::ROTLIGHT,
                name: "Back  door".try_into().unwrap(),
            }))
        );

        let Ok(Some(Command::SetKeyboard(kb))) =
            Command::parse("set_keyboard 3 A name that is way too long")
        else {
            panic!("set_keyboard did not parse");
        };
        assert_eq!(kb.id, 3);
        assert_eq!(kb.name.as_str(), "A name that is w");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse("reboot"), Err(CommandError::UnknownCommand));
        assert_eq!(Command::parse("del_key"), Err(CommandError::MissingArgument));
        assert_eq!(Command::parse("del_key x"), Err(CommandError::InvalidNumber));
        assert_eq!(Command::parse("del_key 0"), Err(CommandError::BadKeyData));
        assert_eq!(Command::parse("set_keyboard 3"), Err(CommandError::MissingArgument));
        assert_eq!(Command::parse("beeper loud"), Err(CommandError::InvalidSwitch));
        assert_eq!(
            Command::parse("program_key 8 1 1 1 B Name"),
            Err(CommandError::InvalidSlot)
        );
        assert_eq!(
            Command::parse("program_key 1 1 300 1 B Name"),
            Err(CommandError::InvalidNumber)
        );

        let syntax: Vec<CommandError> = CommandError::iter().filter(|e| e.is_syntax()).collect();
        assert_eq!(syntax.len(), 3);
    }

    #[test]
    fn test_console_answers() {
        let mut console = Console::new();
        let mut keys = KeyTable::new();

        assert_eq!(run(&mut console, &mut keys, "frobnicate").0, "What?\n");
        assert_eq!(
            run(&mut console, &mut keys, "add_key 0 1 1 B Zero").0,
            "Bad key data specified\n"
        );
        assert_eq!(run(&mut console, &mut keys, "del_key 4").0, "No key with ID 4\n");
        assert!(run(&mut console, &mut keys, "help").0.contains("program_key <position>"));
        assert_eq!(
            run(&mut console, &mut keys, "boot").1,
            Some(ConsoleRequest::Bootloader)
        );
        assert_eq!(
            run(&mut console, &mut keys, "beeper on").1,
            Some(ConsoleRequest::Beeper(true))
        );
        assert_eq!(run(&mut console, &mut keys, "beeper").0, "What?\n");
        assert_eq!(run(&mut console, &mut keys, "beeper 1").0, "expected on or off\n");
    }

    #[test]
    fn test_del_key_stops_an_expired_timer() {
        let mut console = Console::new();
        let mut keys = KeyTable::new();
        let mut timers = KeyTimerBank::new();
        run(&mut console, &mut keys, "set_keyboard 1 Lab");
        run(&mut console, &mut keys, "add_key 10 1 10 B Door");

        let kb = keys.keyboard().clone();
        keys.set_slot(
            0,
            SlotState::Valid(KeyRecord {
                key: KeyInfo {
                    id: 10,
                    ..Default::default()
                },
                kb,
            }),
        );
        keys.key_change(0, &mut timers);
        keys.set_slot(0, SlotState::Empty);
        keys.key_change(0, &mut timers);
        for _ in 0..60 {
            timers.tick();
        }
        assert_eq!(timers.first_expired(), Some((0, KeyFlags::BEEP)));

        let (out, request) = run_timed(&mut console, &mut keys, &mut timers, "del_key 10");
        assert_eq!(out, "");
        let Some(ConsoleRequest::Notify(notes)) = request else {
            panic!("del_key did not report the cleared timer");
        };
        assert_eq!(notes.as_slice(), [Notification::TimerCleared]);
        assert_eq!(timers.read_timer(0), -1);

        // Nothing was running any more.
        assert_eq!(
            run_timed(&mut console, &mut keys, &mut timers, "clear_keys").1,
            None
        );
    }

    #[test]
    fn test_config_round_trip() {
        let mut console = Console::new();
        let mut keys = KeyTable::new();
        for line in [
            "set_keyboard 9 Hackspace",
            "add_key 1 15 60 B Workshop",
            "add_key 2 0 10 R Storage room",
            "add_key 3 5 5 - Attic",
        ] {
            assert_eq!(run(&mut console, &mut keys, line), (String::new(), None));
        }

        let (dump, _) = run(&mut console, &mut keys, "show_config");
        assert_eq!(
            dump,
            "# Keyboard config dump\n\
             set_keyboard 9 Hackspace\n\
             clear_keys\n\
             add_key 1 15 60 B Workshop\n\
             add_key 2 0 10 R Storage room\n\
             add_key 3 5 5 - Attic\n\
             # END Keyboard config dump\n"
        );

        let mut copy = KeyTable::new();
        for line in dump.lines() {
            run(&mut console, &mut copy, line);
        }
        let (again, _) = run(&mut console, &mut copy, "show_config");
        assert_eq!(again, dump);
    }

    #[test]
    fn test_show_keys() {
        let mut console = Console::new();
        let mut keys = KeyTable::new();
        keys.set_slot(1, SlotState::ReadError);
        keys.set_slot(2, SlotState::BadChecksum);
        keys.set_slot(
            3,
            SlotState::Valid(KeyRecord {
                key: KeyInfo {
                    id: 7,
                    dfl_timeout: 5,
                    max_timeout: 20,
                    flags: KeyFlags::BEEP | KeyFlags::ROTLIGHT,
                    name: "Office".try_into().unwrap(),
                },
                kb: KeyboardInfo::default(),
            }),
        );

        let (out, _) = run(&mut console, &mut keys, "show_keys");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "Position 1: No key plugged");
        assert_eq!(lines[1], "Position 2: Read error");
        assert_eq!(lines[2], "Position 3: Bad checksum");
        assert_eq!(
            lines[3],
            "Position 4: ID 7 (Office), timeout 5 (max 20), beep when gone, rotate light when gone"
        );
    }

    #[test]
    fn test_programming_keeps_console_busy() {
        let mut console = Console::new();
        let mut keys = KeyTable::new();
        run(&mut console, &mut keys, "set_keyboard 4 Lab");

        let (_, request) = run(&mut console, &mut keys, "program_key 2 11 5 10 B Cellar");
        let Some(ConsoleRequest::Program { slot, record }) = request else {
            panic!("program_key did not ask for programming");
        };
        assert_eq!(slot, 2);
        assert_eq!(record.kb.id, 4);
        assert_eq!(record.key.name.as_str(), "Cellar");
        assert!(console.is_busy());

        assert_eq!(
            run(&mut console, &mut keys, "show_keys"),
            ("Busy, try again.\n".to_owned(), None)
        );

        let mut out = String::new();
        let message = console
            .program_finished(ProgramStatus::NoKey, &mut out)
            .unwrap();
        assert_eq!(message, Message::NoKeyPlugged);
        assert_eq!(out, "Could not program: No key plugged\n");
        assert!(!console.is_busy());
    }

    #[test]
    fn test_status_messages() {
        for status in ProgramStatus::iter() {
            let mut out = String::new();
            let message = Console::new().program_finished(status, &mut out).unwrap();
            assert_eq!(message, Message::from(status));
            assert!(out.ends_with(&format!("{}\n", message.as_str())));
        }
    }
}
