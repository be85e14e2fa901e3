use core::cell::RefCell;

use avr_device::interrupt::{self, Mutex};
use circular_buffer::CircularBuffer;
use panel::{Event, EventQueue, Panel, PanelAccess};

use crate::outputs::{OUTPUTS, Outputs};

/// Mutex locked state shared between the tick, the serial receiver and the main loop.
pub static SHARED_STATE: Mutex<RefCell<SharedState>> =
    Mutex::new(RefCell::new(SharedState::new()));

#[derive(Debug)]
pub struct SharedState {
    pub panel: Panel,
    pub events: EventQueue,
    /// Serial bytes not yet picked up by the console.
    serial_rx: CircularBuffer<{ Self::SERIAL_RX_SIZE }, u8>,
}

impl SharedState {
    /// A full command line, so the console can fall behind by one line while the LCD redraws.
    const SERIAL_RX_SIZE: usize = 96;

    const fn new() -> Self {
        Self {
            panel: Panel::new(),
            events: EventQueue::new(),
            serial_rx: CircularBuffer::new(),
        }
    }

    #[inline]
    pub fn pop_event(&mut self) -> Option<Event> {
        self.events.pop()
    }

    /// Queues a byte from the serial port. Bytes arriving while the buffer is full are lost.
    #[inline]
    pub fn push_rx(&mut self, byte: u8) {
        if !self.serial_rx.is_full() {
            self.serial_rx.push_back(byte);
        }
    }

    #[inline]
    pub fn pop_rx(&mut self) -> Option<u8> {
        self.serial_rx.pop_front()
    }
}

/// [`PanelAccess`] for the main loop: each access runs in its own critical section.
#[derive(Debug, Default)]
pub struct SharedPanel;

impl PanelAccess for SharedPanel {
    type Hardware = Outputs;

    fn with_panel<R>(&mut self, f: impl FnOnce(&mut Panel, &mut Outputs) -> R) -> R {
        interrupt::free(|cs| {
            let shared_state = &mut *SHARED_STATE.borrow(cs).borrow_mut();
            let outputs = &mut *OUTPUTS.borrow(cs).borrow_mut();
            f(&mut shared_state.panel, outputs)
        })
    }
}
