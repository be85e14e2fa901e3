/// Encoder rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Top level menu entries, in rotation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(strum::EnumIter))]
pub enum MenuEntry {
    FindKey,
    Pizza1,
    Pizza2,
    Pizza3,
    Bootloader,
}

impl MenuEntry {
    #[must_use]
    pub fn rotate(self, direction: Direction) -> Self {
        use MenuEntry::{Bootloader, FindKey, Pizza1, Pizza2, Pizza3};

        match (direction, self) {
            (Direction::Forward, FindKey) | (Direction::Back, Pizza2) => Pizza1,
            (Direction::Forward, Pizza1) | (Direction::Back, Pizza3) => Pizza2,
            (Direction::Forward, Pizza2) | (Direction::Back, Bootloader) => Pizza3,
            (Direction::Forward, Pizza3) | (Direction::Back, FindKey) => Bootloader,
            (Direction::Forward, Bootloader) | (Direction::Back, Pizza1) => FindKey,
        }
    }

    /// Index of the pizza timer behind this entry.
    #[must_use]
    pub fn pizza(self) -> Option<u8> {
        match self {
            Self::Pizza1 => Some(0),
            Self::Pizza2 => Some(1),
            Self::Pizza3 => Some(2),
            Self::FindKey | Self::Bootloader => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UiState {
    #[default]
    Idle,
    /// Idle, showing feedback of a command until the message times out.
    MessageTimeout,
    /// A key slot has a problem, nothing but the error is shown.
    KeyError,
    Menu(MenuEntry),
    /// Choosing the minutes of a timer.
    SelectTime,
    /// Walking through the slots, lighting up the selected one.
    FindKey,
}

/// Kinds of sticky key errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(strum::EnumIter))]
pub enum KeyErrorKind {
    ReadError,
    UnknownKey,
    WrongDevice,
}
