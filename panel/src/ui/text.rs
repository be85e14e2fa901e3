use core::fmt;

use super::KeyErrorKind;
use crate::{KeyDirectory, KeyTimers, MAX_KEYS, NUM_PIZZA_TIMERS, SlotState};

/// Command feedback shown while the UI is in [`super::UiState::MessageTimeout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(strum::EnumIter))]
pub enum Message {
    ProgrammingOk,
    NoKeyPlugged,
    TransmissionFailed,
}

impl Message {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProgrammingOk => "Programming successful",
            Self::NoKeyPlugged => "No key plugged",
            Self::TransmissionFailed => "Transmission failed",
        }
    }
}

/// Contents of an LCD row.
///
/// Names and countdowns are looked up when the text gets printed, see [`Text::display`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Text {
    Blank,
    /// The expected key behind the timer is missing past its timeout.
    KeyMissing(u8),
    PizzaDone(u8),
    KeyError(KeyErrorKind, u8),
    PizzaMenu { pizza: u8, running: bool },
    LocateKey,
    EnterBootloader,
    Minutes(u8),
    /// What sits in a slot.
    Slot(u8),
    /// The pizza timers and the soonest key timer.
    Timers,
    Message(Message),
}

impl Text {
    #[must_use]
    pub fn display<'a, K, T>(self, keys: &'a K, timers: &'a T) -> TextDisplay<'a, K, T> {
        TextDisplay {
            text: self,
            keys,
            timers,
        }
    }
}

#[derive(Debug)]
pub struct TextDisplay<'a, K, T> {
    text: Text,
    keys: &'a K,
    timers: &'a T,
}

impl<K, T> TextDisplay<'_, K, T>
where
    K: KeyDirectory,
{
    fn key_error(&self, f: &mut fmt::Formatter<'_>, kind: KeyErrorKind, slot: u8) -> fmt::Result {
        let record = match self.keys.slot(slot) {
            SlotState::Valid(record) => Some(record),
            _ => None,
        };

        match (kind, record) {
            (KeyErrorKind::UnknownKey, Some(r)) => {
                write!(f, "Unknown key {} (\"{}\")", r.key.id, r.key.name)
            }
            (KeyErrorKind::WrongDevice, Some(r)) => {
                write!(f, "Invalid key; belongs to {}", r.kb.name)
            }
            _ => write!(f, "Read error in slot {}", slot + 1),
        }
    }
}

impl<K, T> fmt::Display for TextDisplay<'_, K, T>
where
    K: KeyDirectory,
    T: KeyTimers,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text {
            Text::Blank => Ok(()),
            Text::KeyMissing(timer) => write!(
                f,
                "Key {} missing",
                self.keys.expected_name(timer).unwrap_or("?")
            ),
            Text::PizzaDone(pizza) => write!(f, "Pizza {} done", pizza + 1),
            Text::KeyError(kind, slot) => self.key_error(f, kind, slot),
            Text::PizzaMenu { pizza, running } => {
                write!(f, "Pizzatimer {}", pizza + 1)?;
                if running {
                    f.write_str(" Off")?;
                }
                Ok(())
            }
            Text::LocateKey => f.write_str("Locate key"),
            Text::EnterBootloader => f.write_str("Enter bootloader"),
            Text::Minutes(minutes) => write!(f, "{minutes:02} minutes"),
            Text::Slot(slot) => match self.keys.slot(slot) {
                SlotState::Valid(record) => f.write_str(&record.key.name),
                SlotState::Empty => f.write_str("No key plugged"),
                SlotState::ReadError | SlotState::BadChecksum => f.write_str("Read error"),
            },
            Text::Timers => {
                for pizza in 0..NUM_PIZZA_TIMERS {
                    time_cell(f, self.timers.read_timer(MAX_KEYS + pizza))?;
                }
                time_cell(f, self.timers.minimum(0..MAX_KEYS).unwrap_or(-1))
            }
            Text::Message(message) => f.write_str(message.as_str()),
        }
    }
}

fn time_cell(f: &mut fmt::Formatter<'_>, secs: i16) -> fmt::Result {
    if secs < 0 {
        f.write_str("--- ")
    } else if secs < 60 {
        write!(f, "{secs:2}s ")
    } else {
        write!(f, "{:2}m ", secs / 60)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::{Message, Text};
    use crate::{
        KeyErrorKind, KeyFlags, KeyInfo, KeyRecord, KeyTable, KeyTimerBank, KeyTimers,
        KeyboardInfo, MAX_KEYS, SlotState,
    };

    fn keys() -> KeyTable {
        let mut keys = KeyTable::new();
        keys.add_key(KeyInfo {
            id: 4,
            name: "Workshop".try_into().unwrap(),
            ..Default::default()
        })
        .unwrap();
        keys.set_slot(
            1,
            SlotState::Valid(KeyRecord {
                key: KeyInfo {
                    id: 17,
                    dfl_timeout: 10,
                    max_timeout: 60,
                    flags: KeyFlags::BEEP,
                    name: "Garage".try_into().unwrap(),
                },
                kb: KeyboardInfo {
                    id: 3,
                    name: "Basement".try_into().unwrap(),
                },
            }),
        );
        keys.set_slot(2, SlotState::BadChecksum);
        keys
    }

    fn show(text: Text, timers: &KeyTimerBank) -> String {
        text.display(&keys(), timers).to_string()
    }

    #[test]
    fn test_static_texts() {
        let timers = KeyTimerBank::new();
        assert_eq!(show(Text::Blank, &timers), "");
        assert_eq!(show(Text::LocateKey, &timers), "Locate key");
        assert_eq!(show(Text::EnterBootloader, &timers), "Enter bootloader");
        assert_eq!(show(Text::Minutes(7), &timers), "07 minutes");
        assert_eq!(show(Text::PizzaDone(1), &timers), "Pizza 2 done");
        assert_eq!(
            show(Text::PizzaMenu { pizza: 0, running: false }, &timers),
            "Pizzatimer 1"
        );
        assert_eq!(
            show(Text::PizzaMenu { pizza: 2, running: true }, &timers),
            "Pizzatimer 3 Off"
        );
        for message in Message::iter() {
            assert_eq!(show(Text::Message(message), &timers), message.as_str());
        }
    }

    #[test]
    fn test_key_texts() {
        let timers = KeyTimerBank::new();
        assert_eq!(show(Text::KeyMissing(0), &timers), "Key Workshop missing");
        assert_eq!(show(Text::KeyMissing(5), &timers), "Key ? missing");
        assert_eq!(show(Text::Slot(0), &timers), "No key plugged");
        assert_eq!(show(Text::Slot(1), &timers), "Garage");
        assert_eq!(show(Text::Slot(2), &timers), "Read error");
    }

    #[test]
    fn test_key_error_texts() {
        let timers = KeyTimerBank::new();
        assert_eq!(
            show(Text::KeyError(KeyErrorKind::ReadError, 2), &timers),
            "Read error in slot 3"
        );
        assert_eq!(
            show(Text::KeyError(KeyErrorKind::UnknownKey, 1), &timers),
            "Unknown key 17 (\"Garage\")"
        );
        assert_eq!(
            show(Text::KeyError(KeyErrorKind::WrongDevice, 1), &timers),
            "Invalid key; belongs to Basement"
        );
    }

    #[test]
    fn test_timer_line() {
        let mut timers = KeyTimerBank::new();
        assert_eq!(show(Text::Timers, &timers), "--- --- --- --- ");

        timers.set_timeout(MAX_KEYS, 1);
        timers.tick();
        timers.set_timeout(MAX_KEYS + 2, 25);
        timers.set_timeout(4, 3);
        timers.set_timeout(6, 2);
        assert_eq!(show(Text::Timers, &timers), "59s --- 25m  2m ");
    }
}
