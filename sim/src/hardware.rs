use panel::{
    CharDisplay, Frame, LCD_WIDTH, OutputRecord, PanelHardware, ShiftRegisterBus, ShiftRegisters,
};
use tracing::debug;

/// Shift register chain whose transfers complete instantly.
#[derive(Debug, Default)]
pub struct SimBus {
    enabled: bool,
    chain: [u8; OutputRecord::LEN],
    latched: [u8; OutputRecord::LEN],
}

impl SimBus {
    /// Bytes currently visible on the register outputs, in shifting order.
    #[must_use]
    pub fn latched(&self) -> [u8; OutputRecord::LEN] {
        self.latched
    }
}

impl ShiftRegisterBus for SimBus {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn write(&mut self, byte: u8) {
        debug_assert!(self.enabled, "byte written while the bus is off");
        self.chain.rotate_right(1);
        self.chain[0] = byte;
    }

    fn write_blocking(&mut self, byte: u8) {
        self.write(byte);
    }

    fn latch(&mut self) {
        self.latched = [self.chain[1], self.chain[0]];
    }

    fn disable(&mut self) {
        self.enabled = false;
    }
}

/// Stands in for the PWM channels and the shift register chain.
#[derive(Debug)]
pub struct SimHardware {
    backlight: u8,
    indicator: u8,
    registers: ShiftRegisters<SimBus>,
}

impl SimHardware {
    #[must_use]
    pub fn new() -> Self {
        let mut registers = ShiftRegisters::new(SimBus::default());
        registers.reset();

        Self {
            backlight: 0,
            indicator: 0,
            registers,
        }
    }

    #[inline]
    #[must_use]
    pub fn backlight(&self) -> u8 {
        self.backlight
    }

    #[inline]
    #[must_use]
    pub fn indicator(&self) -> u8 {
        self.indicator
    }

    /// The record as it reached the register outputs.
    #[must_use]
    pub fn latched(&self) -> OutputRecord {
        let [status, leds] = self.registers.bus().latched();
        OutputRecord {
            beeper: status & 1 != 0,
            rotating_light: status & 2 != 0,
            leds,
        }
    }
}

impl Default for SimHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelHardware for SimHardware {
    fn set_backlight(&mut self, level: u8) {
        self.backlight = level;
    }

    fn set_indicator(&mut self, level: u8) {
        self.indicator = level;
    }

    fn update_outputs(&mut self, record: OutputRecord) {
        debug!(?record, "output record");
        self.registers.request_update(record);
        while self.registers.is_busy() {
            self.registers.on_byte_sent();
        }
    }
}

/// Character LCD that keeps what was written to it.
#[derive(Debug)]
pub struct SimDisplay {
    cells: Frame,
    cursor: (usize, usize),
    /// Number of complete redraws.
    redraws: usize,
}

impl SimDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: [[b' '; LCD_WIDTH]; 2],
            cursor: (0, 0),
            redraws: 0,
        }
    }

    /// Contents of a row, trailing blanks removed.
    #[must_use]
    pub fn row(&self, row: usize) -> String {
        String::from_utf8_lossy(&self.cells[row]).trim_end().to_owned()
    }

    #[inline]
    #[must_use]
    pub fn redraws(&self) -> usize {
        self.redraws
    }
}

impl Default for SimDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl CharDisplay for SimDisplay {
    fn set_cursor(&mut self, col: u8, row: u8) {
        if col == 0 && row == 0 {
            self.redraws += 1;
        }
        self.cursor = (usize::from(col), usize::from(row));
    }

    fn write_char(&mut self, c: u8) {
        let (col, row) = self.cursor;
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = c;
        }
        self.cursor.0 += 1;
    }
}
