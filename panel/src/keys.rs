//! Key identity bookkeeping.
//!
//! [`KeyDirectory`] is what the UI needs to know about keys: what sits in a slot and what the
//! expected keys are called. [`KeyTable`] is the reference implementation backed by the
//! configured key list and the last read of every slot.

use core::{fmt, ops::BitOr};

use heapless::Vec;

use crate::{KeyErrorKind, KeyTimers, MAX_KEYS, NAME_LENGTH, ProgramStatus};

/// Key and keyboard names, as stored on the keys.
pub type KeyName = heapless::String<NAME_LENGTH>;

/// Conditions reported to the UI by the key collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    TimerExpired { timer: u8, flags: KeyFlags },
    TimerCleared,
    KeyError { kind: KeyErrorKind, slot: u8 },
    KeyErrorCleared,
    /// An expected key left its slot and its timer started; the operator may pick another
    /// timeout up to `max` minutes.
    KeyRemoved { timer: u8, default: u8, max: u8 },
}

pub type Notifications = Vec<Notification, 8>;

/// What a missing key does once its timeout runs out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyFlags(u8);

impl KeyFlags {
    pub const NONE: Self = Self(0);
    pub const BEEP: Self = Self(1);
    pub const ROTLIGHT: Self = Self(2);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parses the command line notation: `B` for beeping, `R` for the rotating light, anything
    /// else is ignored.
    #[must_use]
    pub fn from_letters(letters: &str) -> Self {
        letters.chars().fold(Self::NONE, |flags, c| match c {
            'B' => flags | Self::BEEP,
            'R' => flags | Self::ROTLIGHT,
            _ => flags,
        })
    }
}

impl BitOr for KeyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Writes the letters understood by [`KeyFlags::from_letters`], `-` for no flags.
impl fmt::Display for KeyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NONE {
            return f.write_str("-");
        }
        if self.contains(Self::BEEP) {
            f.write_str("B")?;
        }
        if self.contains(Self::ROTLIGHT) {
            f.write_str("R")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyInfo {
    /// 1..=255, 0 is reserved.
    pub id: u8,
    /// Minutes until a missing key raises an alarm, 0 disables the timeout.
    pub dfl_timeout: u8,
    pub max_timeout: u8,
    pub flags: KeyFlags,
    pub name: KeyName,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyboardInfo {
    pub id: u8,
    pub name: KeyName,
}

/// Data stored on a physical key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyRecord {
    pub key: KeyInfo,
    pub kb: KeyboardInfo,
}

/// Last read of a key slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Empty,
    ReadError,
    BadChecksum,
    Valid(KeyRecord),
}

pub trait KeyDirectory {
    /// State of a slot. Out of range slots read as empty.
    fn slot(&self, slot: u8) -> &SlotState;

    /// Name of the expected key whose timer has the given index.
    fn expected_name(&self, timer: u8) -> Option<&str>;

    /// Re-evaluates the keys after the given slot changed, arming and cancelling key timers.
    fn key_change<T: KeyTimers>(&mut self, slot: u8, timers: &mut T) -> Notifications;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum KeyTableError {
    #[error("Key ID 0 is reserved")]
    ReservedId,
    #[error("List of expected keys is full")]
    Full,
    #[error("No key with ID {0}")]
    UnknownId(u8),
}

/// Expected keys and slot contents.
///
/// The index of an expected key in the list is also the index of its timer.
#[derive(Debug, Default)]
pub struct KeyTable {
    keyboard: KeyboardInfo,
    expected: [Option<KeyInfo>; MAX_KEYS as usize],
    slots: [SlotState; MAX_KEYS as usize],
    present: u8,
    error: Option<(KeyErrorKind, u8)>,
}

static EMPTY_SLOT: SlotState = SlotState::Empty;

impl KeyTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn keyboard(&self) -> &KeyboardInfo {
        &self.keyboard
    }

    pub fn set_keyboard(&mut self, keyboard: KeyboardInfo) {
        self.keyboard = keyboard;
    }

    /// Expected keys with their timer index.
    pub fn expected(&self) -> impl Iterator<Item = (u8, &KeyInfo)> {
        (0..).zip(&self.expected).filter_map(|(i, k)| k.as_ref().map(|k| (i, k)))
    }

    /// Adds a key to the expected list, replacing any key with the same ID.
    pub fn add_key(&mut self, key: KeyInfo) -> Result<(), KeyTableError> {
        if key.id == 0 {
            return Err(KeyTableError::ReservedId);
        }

        let entry = match self.position(key.id) {
            Some(i) => &mut self.expected[i],
            None => self
                .expected
                .iter_mut()
                .find(|k| k.is_none())
                .ok_or(KeyTableError::Full)?,
        };
        *entry = Some(key);
        Ok(())
    }

    /// Removes a key from the expected list and stops its timer.
    pub fn del_key<T: KeyTimers>(
        &mut self,
        id: u8,
        timers: &mut T,
    ) -> Result<Notifications, KeyTableError> {
        let timer = self
            .expected()
            .find_map(|(timer, key)| (key.id == id).then_some(timer))
            .ok_or(KeyTableError::UnknownId(id))?;
        let mut notes = Notifications::new();
        if self.forget(timer, timers) {
            notes.push(timers.expiry_changed()).ok();
        }
        Ok(notes)
    }

    /// Empties the expected list, stopping every key timer.
    pub fn clear_keys<T: KeyTimers>(&mut self, timers: &mut T) -> Notifications {
        let mut expired = false;
        for timer in 0..MAX_KEYS {
            expired |= self.forget(timer, timers);
        }

        let mut notes = Notifications::new();
        if expired {
            notes.push(timers.expiry_changed()).ok();
        }
        notes
    }

    /// Replaces the expected list with the valid keys of this keyboard that are plugged in.
    pub fn capture_keys<T: KeyTimers>(&mut self, timers: &mut T) -> Notifications {
        let notes = self.clear_keys(timers);
        for (slot, state) in self.slots.iter().enumerate() {
            if let SlotState::Valid(record) = state {
                if record.kb.id == self.keyboard.id {
                    self.expected[slot] = Some(record.key.clone());
                    self.present |= 1 << slot;
                }
            }
        }
        notes
    }

    /// Stores the latest read of a slot; call [`KeyDirectory::key_change`] afterwards.
    pub fn set_slot(&mut self, slot: u8, state: SlotState) {
        if let Some(s) = self.slots.get_mut(usize::from(slot)) {
            *s = state;
        }
    }

    /// Writes a record onto the key in a slot.
    pub fn program(&mut self, slot: u8, record: KeyRecord) -> ProgramStatus {
        match self.slots.get_mut(usize::from(slot)) {
            None | Some(SlotState::Empty) => ProgramStatus::NoKey,
            Some(state) => {
                *state = SlotState::Valid(record);
                ProgramStatus::Success
            }
        }
    }

    /// Drops an expected entry along with its countdown. Returns whether the timer had expired.
    fn forget<T: KeyTimers>(&mut self, timer: u8, timers: &mut T) -> bool {
        if self.expected[usize::from(timer)].take().is_none() {
            return false;
        }
        self.present &= !(1 << timer);
        timers.cancel(timer)
    }

    fn position(&self, id: u8) -> Option<usize> {
        self.expected
            .iter()
            .position(|k| k.as_ref().is_some_and(|k| k.id == id))
    }

    fn is_plugged(&self, id: u8) -> bool {
        self.slots.iter().any(|s| {
            matches!(s, SlotState::Valid(r) if r.key.id == id && r.kb.id == self.keyboard.id)
        })
    }

    fn slot_error(&self, slot: usize) -> Option<KeyErrorKind> {
        match &self.slots[slot] {
            SlotState::Empty => None,
            SlotState::ReadError | SlotState::BadChecksum => Some(KeyErrorKind::ReadError),
            SlotState::Valid(r) if r.kb.id != self.keyboard.id => Some(KeyErrorKind::WrongDevice),
            SlotState::Valid(r) if self.position(r.key.id).is_none() => {
                Some(KeyErrorKind::UnknownKey)
            }
            SlotState::Valid(_) => None,
        }
    }

    /// The error to show after `slot` changed: that slot's own error, or else whichever
    /// other slot still has one.
    fn current_error(&self, slot: u8) -> Option<(KeyErrorKind, u8)> {
        let own = self.slot_error(usize::from(slot)).map(|kind| (kind, slot));
        match self.error {
            Some(current) if current.1 != slot && own.is_none() => Some(current),
            _ => own.or_else(|| {
                (0..MAX_KEYS).find_map(|s| self.slot_error(usize::from(s)).map(|kind| (kind, s)))
            }),
        }
    }
}

impl KeyDirectory for KeyTable {
    fn slot(&self, slot: u8) -> &SlotState {
        self.slots.get(usize::from(slot)).unwrap_or(&EMPTY_SLOT)
    }

    fn expected_name(&self, timer: u8) -> Option<&str> {
        self.expected
            .get(usize::from(timer))?
            .as_ref()
            .map(|k| k.name.as_str())
    }

    fn key_change<T: KeyTimers>(&mut self, slot: u8, timers: &mut T) -> Notifications {
        let mut notes = Notifications::new();
        if usize::from(slot) >= self.slots.len() {
            return notes;
        }

        let error = self.current_error(slot);
        if error != self.error {
            self.error = error;
            let note = match error {
                Some((kind, slot)) => Notification::KeyError { kind, slot },
                None => Notification::KeyErrorCleared,
            };
            notes.push(note).ok();
        }

        for (timer, key) in (0..).zip(&self.expected) {
            let Some(key) = key else { continue };
            let bit = 1 << timer;
            let was_present = self.present & bit != 0;
            let present = self.is_plugged(key.id);

            if was_present && !present && key.dfl_timeout > 0 {
                timers.set_flags(timer, key.flags);
                if timers.set_timeout(timer, key.dfl_timeout) {
                    notes.push(timers.expiry_changed()).ok();
                }
                notes
                    .push(Notification::KeyRemoved {
                        timer,
                        default: key.dfl_timeout,
                        max: key.max_timeout.max(key.dfl_timeout),
                    })
                    .ok();
            } else if !was_present && present && timers.cancel(timer) {
                notes.push(timers.expiry_changed()).ok();
            }

            if present {
                self.present |= bit;
            } else {
                self.present &= !bit;
            }
        }

        notes
    }
}

#[cfg(test)]
mod tests {
    use super::{
        KeyDirectory, KeyFlags, KeyInfo, KeyRecord, KeyTable, KeyTableError, KeyboardInfo,
        Notification, SlotState,
    };
    use crate::{KeyErrorKind, KeyTimerBank, KeyTimers, ProgramStatus};

    fn key(id: u8, name: &str) -> KeyInfo {
        KeyInfo {
            id,
            dfl_timeout: 5,
            max_timeout: 30,
            flags: KeyFlags::BEEP,
            name: name.try_into().unwrap(),
        }
    }

    fn keyboard(id: u8) -> KeyboardInfo {
        KeyboardInfo {
            id,
            name: "Hackspace".try_into().unwrap(),
        }
    }

    fn record(id: u8, kb: u8) -> SlotState {
        SlotState::Valid(KeyRecord {
            key: key(id, "Workshop"),
            kb: keyboard(kb),
        })
    }

    fn table() -> KeyTable {
        let mut table = KeyTable::new();
        table.set_keyboard(keyboard(7));
        table.add_key(key(1, "Workshop")).unwrap();
        table.add_key(key(2, "Storage")).unwrap();
        table
    }

    #[test]
    fn test_flags_notation() {
        assert_eq!(KeyFlags::from_letters("BR"), KeyFlags::BEEP | KeyFlags::ROTLIGHT);
        assert_eq!(KeyFlags::from_letters("-"), KeyFlags::NONE);
        assert_eq!(KeyFlags::from_letters("xRx").to_string(), "R");
        assert_eq!((KeyFlags::ROTLIGHT | KeyFlags::BEEP).to_string(), "BR");
        assert_eq!(KeyFlags::NONE.to_string(), "-");
    }

    #[test]
    fn test_expected_list() {
        let mut table = table();
        assert_eq!(table.add_key(key(0, "Nope")), Err(KeyTableError::ReservedId));

        table.add_key(key(1, "Renamed")).unwrap();
        assert_eq!(table.expected_name(0), Some("Renamed"));
        assert_eq!(table.expected().count(), 2);

        let mut timers = KeyTimerBank::new();
        assert!(table.del_key(1, &mut timers).unwrap().is_empty());
        assert_eq!(table.del_key(1, &mut timers), Err(KeyTableError::UnknownId(1)));
        assert_eq!(table.expected_name(0), None);

        table.add_key(key(3, "Garage")).unwrap();
        assert_eq!(table.expected_name(0), Some("Garage"));

        for id in 10..16 {
            table.add_key(key(id, "Filler")).unwrap();
        }
        assert_eq!(table.add_key(key(99, "Extra")), Err(KeyTableError::Full));

        assert!(table.clear_keys(&mut timers).is_empty());
        assert_eq!(table.expected().count(), 0);
    }

    #[test]
    fn test_removed_key_arms_and_returning_key_cancels() {
        let mut table = table();
        let mut timers = KeyTimerBank::new();

        table.set_slot(0, record(1, 7));
        assert!(table.key_change(0, &mut timers).is_empty());
        assert_eq!(timers.read_timer(0), -1);

        table.set_slot(0, SlotState::Empty);
        assert_eq!(
            table.key_change(0, &mut timers).as_slice(),
            [Notification::KeyRemoved { timer: 0, default: 5, max: 30 }]
        );
        assert_eq!(timers.read_timer(0), 5 * 60);

        for _ in 0..5 * 60 {
            timers.tick();
        }
        assert_eq!(timers.first_expired(), Some((0, KeyFlags::BEEP)));

        table.set_slot(3, record(1, 7));
        let notes = table.key_change(3, &mut timers);
        assert_eq!(notes.as_slice(), [Notification::TimerCleared]);
        assert_eq!(timers.first_expired(), None);
    }

    #[test]
    fn test_key_errors() {
        let mut table = table();
        let mut timers = KeyTimerBank::new();

        table.set_slot(2, SlotState::BadChecksum);
        assert_eq!(
            table.key_change(2, &mut timers).as_slice(),
            [Notification::KeyError { kind: KeyErrorKind::ReadError, slot: 2 }]
        );
        // Same condition again is not reported twice.
        assert!(table.key_change(2, &mut timers).is_empty());

        table.set_slot(5, record(1, 8));
        assert!(table.key_change(5, &mut timers).as_slice().contains(
            &Notification::KeyError { kind: KeyErrorKind::WrongDevice, slot: 5 }
        ));

        table.set_slot(5, SlotState::Empty);
        assert_eq!(
            table.key_change(5, &mut timers).as_slice(),
            [Notification::KeyError { kind: KeyErrorKind::ReadError, slot: 2 }]
        );

        table.set_slot(2, record(42, 7));
        assert_eq!(
            table.key_change(2, &mut timers).as_slice(),
            [Notification::KeyError { kind: KeyErrorKind::UnknownKey, slot: 2 }]
        );

        table.set_slot(2, SlotState::Empty);
        assert_eq!(
            table.key_change(2, &mut timers).as_slice(),
            [Notification::KeyErrorCleared]
        );
    }

    #[test]
    fn test_capture_and_program() {
        let mut table = table();
        table.set_slot(1, record(9, 7));
        table.set_slot(4, record(3, 8));
        table.set_slot(6, SlotState::ReadError);

        let mut timers = KeyTimerBank::new();
        assert!(table.capture_keys(&mut timers).is_empty());
        let ids: Vec<u8> = table.expected().map(|(_, k)| k.id).collect();
        assert_eq!(ids, [9]);

        let rec = KeyRecord {
            key: key(12, "Office"),
            kb: keyboard(7),
        };
        assert_eq!(table.program(0, rec.clone()), ProgramStatus::NoKey);
        assert_eq!(table.program(6, rec.clone()), ProgramStatus::Success);
        assert_eq!(table.slot(6), &SlotState::Valid(rec));
        assert_eq!(table.slot(200), &SlotState::Empty);
    }

    #[test]
    fn test_deleting_a_missing_key_stops_its_timer() {
        let mut table = table();
        let mut timers = KeyTimerBank::new();
        table.set_slot(0, record(1, 7));
        table.key_change(0, &mut timers);
        table.set_slot(0, SlotState::Empty);
        table.key_change(0, &mut timers);
        assert_eq!(timers.read_timer(0), 5 * 60);

        assert!(table.del_key(1, &mut timers).unwrap().is_empty());
        assert_eq!(timers.read_timer(0), -1);
        for _ in 0..5 * 60 {
            assert!(timers.tick().is_empty());
        }
        assert_eq!(timers.first_expired(), None);
    }

    #[test]
    fn test_clearing_keys_silences_expired_timers() {
        let mut table = table();
        let mut timers = KeyTimerBank::new();
        timers.set_timeout(crate::MAX_KEYS, 1);
        for slot in [0, 1] {
            table.set_slot(slot, record(slot + 1, 7));
            table.key_change(slot, &mut timers);
            table.set_slot(slot, SlotState::Empty);
            table.key_change(slot, &mut timers);
        }
        for _ in 0..5 * 60 {
            timers.tick();
        }
        assert_eq!(timers.first_expired(), Some((0, KeyFlags::BEEP)));

        // The expired pizza timer is what is left to show.
        assert_eq!(
            table.clear_keys(&mut timers).as_slice(),
            [Notification::TimerExpired { timer: crate::MAX_KEYS, flags: KeyFlags::BEEP }]
        );
        assert_eq!(timers.read_timer(1), -1);

        // Acknowledging no longer brings removed keys back.
        timers.acknowledge();
        for _ in 0..5 * 60 {
            assert!(timers.tick().is_empty());
        }
    }

    #[test]
    fn test_removed_key_offers_its_maximum() {
        let mut table = KeyTable::new();
        let mut timers = KeyTimerBank::new();
        table.set_keyboard(keyboard(7));
        let mut short = key(4, "Shed");
        short.dfl_timeout = 20;
        short.max_timeout = 10;
        table.add_key(short).unwrap();
        let mut silent = key(5, "Loft");
        silent.dfl_timeout = 0;
        table.add_key(silent).unwrap();

        for (slot, id) in [(0, 4), (1, 5)] {
            table.set_slot(slot, record(id, 7));
            table.key_change(slot, &mut timers);
        }

        table.set_slot(0, SlotState::Empty);
        assert_eq!(
            table.key_change(0, &mut timers).as_slice(),
            [Notification::KeyRemoved { timer: 0, default: 20, max: 20 }]
        );

        // No timeout, nothing to pick.
        table.set_slot(1, SlotState::Empty);
        assert!(table.key_change(1, &mut timers).is_empty());
        assert_eq!(timers.read_timer(1), -1);
    }
}
