use core::fmt;

use arduino_hal::{
    hal::port::{PD2, PD3},
    pac::USART1,
    port::{
        Pin,
        mode::{Input, Output},
    },
};
use avr_device::interrupt;
use heapless::String;

use crate::shared_state::SHARED_STATE;

pub type Serial = arduino_hal::Usart<USART1, Pin<Input, PD2>, Pin<Output, PD3>>;

/// [`fmt::Write`] adapter for the console answers, translating `\n` to `\r\n`.
pub struct SerialWriter<'a>(pub &'a mut Serial);

impl fmt::Write for SerialWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.0.write_byte(b'\r');
            }
            self.0.write_byte(byte);
        }
        Ok(())
    }
}

/// Assembles received bytes into command lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    line: String<{ Self::CAPACITY }>,
}

impl LineBuffer {
    /// Longest accepted line, the rest is cut off.
    const CAPACITY: usize = 80;

    pub const fn new() -> Self {
        Self {
            line: String::new(),
        }
    }

    /// Adds a byte, returning the line once it is terminated. Blank lines are skipped.
    pub fn push(&mut self, byte: u8) -> Option<String<{ Self::CAPACITY }>> {
        match byte {
            b'\r' | b'\n' if self.line.is_empty() => None,
            b'\r' | b'\n' => Some(core::mem::take(&mut self.line)),
            // Backspace and delete
            0x08 | 0x7F => {
                self.line.pop();
                None
            }
            b if b.is_ascii() && !b.is_ascii_control() => {
                self.line.push(char::from(b)).ok();
                None
            }
            _ => None,
        }
    }
}

#[interrupt(atmega32u4)]
fn USART1_RX() {
    let usart = unsafe { &*USART1::ptr() };
    let byte = usart.udr1.read().bits();
    interrupt::free(|cs| SHARED_STATE.borrow(cs).borrow_mut().push_rx(byte));
}
