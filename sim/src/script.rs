//! Line oriented scripts driving a [`Session`](crate::Session).
//!
//! ```text
//! # comment
//! cw 2            # rotate the encoder two detents clockwise
//! ccw             # one detent counter-clockwise
//! push            # press the encoder
//! smaul           # press the secondary button
//! wait 90s        # let time pass: ms, s (default) or m
//! plug 3 10       # plug key 10 of the configured keyboard into slot 3
//! plug 3 10 7     # ... or a key belonging to keyboard 7
//! garbled 3       # a key that cannot be read
//! unplug 3
//! show            # print the LCD
//! expect 2 Door   # fail unless LCD row 2 reads `Door`
//! > add_key 10 1 10 BR Door
//! ```

use std::str::SplitWhitespace;

use panel::{Direction, MAX_KEYS};
use thiserror::Error as ThisError;

/// One script line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Rotate { direction: Direction, steps: u32 },
    Push,
    Smaul,
    /// Milliseconds to run.
    Wait(u64),
    Plug {
        slot: u8,
        key: u8,
        keyboard: Option<u8>,
    },
    Garbled { slot: u8 },
    Unplug { slot: u8 },
    Show,
    /// Row index and the expected text, trailing blanks ignored.
    Expect { row: usize, text: String },
    /// A line for the command console.
    Console(String),
}

#[derive(Debug, ThisError)]
#[cfg_attr(test, derive(PartialEq))]
pub enum ScriptError {
    #[error("line {line}: unknown action `{action}`")]
    UnknownAction { line: usize, action: String },
    #[error("line {line}: missing argument")]
    MissingArgument { line: usize },
    #[error("line {line}: invalid number `{value}`")]
    InvalidNumber { line: usize, value: String },
    #[error("line {line}: slot {slot} out of range 0..{MAX_KEYS}")]
    InvalidSlot { line: usize, slot: u8 },
    #[error("line {line}: the LCD has rows 1 and 2")]
    InvalidRow { line: usize },
}

/// Parses a whole script into actions paired with their line number.
pub fn parse(script: &str) -> Result<Vec<(usize, Action)>, ScriptError> {
    let mut actions = Vec::new();
    for (line, text) in (1..).zip(script.lines()) {
        if let Some(action) = Action::parse(line, text)? {
            actions.push((line, action));
        }
    }
    Ok(actions)
}

impl Action {
    /// Parses one line, `None` for blank and comment lines.
    pub fn parse(line: usize, text: &str) -> Result<Option<Self>, ScriptError> {
        let text = text.trim();

        // Console lines keep their own comments.
        if let Some(command) = text.strip_prefix('>') {
            return Ok(Some(Self::Console(command.trim().to_owned())));
        }

        let text = text.split_once('#').map_or(text, |(text, _)| text);
        let (name, rest) = text
            .split_once(char::is_whitespace)
            .unwrap_or((text, ""));
        if name.is_empty() {
            return Ok(None);
        }

        let mut args = Args {
            line,
            words: rest.split_whitespace(),
        };

        let action = match name {
            "cw" | "ccw" => Self::Rotate {
                direction: if name == "cw" {
                    Direction::Forward
                } else {
                    Direction::Back
                },
                steps: args.optional()?.unwrap_or(1),
            },
            "push" => Self::Push,
            "smaul" => Self::Smaul,
            "wait" => Self::Wait(args.duration()?),
            "plug" => Self::Plug {
                slot: args.slot()?,
                key: args.required()?,
                keyboard: args.optional()?,
            },
            "garbled" => Self::Garbled { slot: args.slot()? },
            "unplug" => Self::Unplug { slot: args.slot()? },
            "show" => Self::Show,
            "expect" => {
                let row = args.required::<usize>()?;
                if !(1..=2).contains(&row) {
                    return Err(ScriptError::InvalidRow { line });
                }
                // Everything after the row number.
                let text = rest.trim_start();
                let text = text
                    .split_once(char::is_whitespace)
                    .map_or("", |(_, text)| text.trim());
                Self::Expect {
                    row: row - 1,
                    text: text.to_owned(),
                }
            }
            _ => {
                return Err(ScriptError::UnknownAction {
                    line,
                    action: name.to_owned(),
                });
            }
        };

        Ok(Some(action))
    }
}

struct Args<'a> {
    line: usize,
    words: SplitWhitespace<'a>,
}

impl Args<'_> {
    fn optional<T: std::str::FromStr>(&mut self) -> Result<Option<T>, ScriptError> {
        self.words
            .next()
            .map(|word| {
                word.parse().map_err(|_| ScriptError::InvalidNumber {
                    line: self.line,
                    value: word.to_owned(),
                })
            })
            .transpose()
    }

    fn required<T: std::str::FromStr>(&mut self) -> Result<T, ScriptError> {
        self.optional()?
            .ok_or(ScriptError::MissingArgument { line: self.line })
    }

    fn slot(&mut self) -> Result<u8, ScriptError> {
        let slot = self.required()?;
        if slot >= MAX_KEYS {
            return Err(ScriptError::InvalidSlot {
                line: self.line,
                slot,
            });
        }
        Ok(slot)
    }

    fn duration(&mut self) -> Result<u64, ScriptError> {
        let word = self
            .words
            .next()
            .ok_or(ScriptError::MissingArgument { line: self.line })?;

        let (digits, scale) = if let Some(digits) = word.strip_suffix("ms") {
            (digits, 1)
        } else if let Some(digits) = word.strip_suffix('s') {
            (digits, 1000)
        } else if let Some(digits) = word.strip_suffix('m') {
            (digits, 60_000)
        } else {
            (word, 1000)
        };

        digits
            .parse::<u64>()
            .map(|n| n * scale)
            .map_err(|_| ScriptError::InvalidNumber {
                line: self.line,
                value: word.to_owned(),
            })
    }
}
