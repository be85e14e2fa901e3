use arduino_hal::{
    delay_ms, delay_us,
    port::{Pin, mode::Output},
};
use panel::CharDisplay;

/// HD44780 compatible character LCD on a 4 bit bus, write only.
pub struct Hd44780 {
    rs: Pin<Output>,
    en: Pin<Output>,
    data: [Pin<Output>; 4],
}

impl Hd44780 {
    const CLEAR: u8 = 0x01;
    const ENTRY_MODE_INCREMENT: u8 = 0x06;
    const DISPLAY_ON: u8 = 0x0C;
    const FUNCTION_SET_4BIT_2LINE: u8 = 0x28;
    const SET_DDRAM_ADDR: u8 = 0x80;
    const ROW_OFFSET: u8 = 0x40;

    /// Runs the 4 bit initialization sequence. Takes around 60 ms.
    pub fn new(rs: Pin<Output>, en: Pin<Output>, data: [Pin<Output>; 4]) -> Self {
        let mut lcd = Self { rs, en, data };
        lcd.rs.set_low();
        lcd.en.set_low();

        delay_ms(50);
        for _ in 0..3 {
            lcd.write_nibble(0x3);
            delay_us(4500);
        }
        lcd.write_nibble(0x2);
        delay_us(150);

        lcd.command(Self::FUNCTION_SET_4BIT_2LINE);
        lcd.command(Self::DISPLAY_ON);
        lcd.command(Self::CLEAR);
        delay_ms(2);
        lcd.command(Self::ENTRY_MODE_INCREMENT);
        lcd
    }

    fn command(&mut self, cmd: u8) {
        self.rs.set_low();
        self.write_byte(cmd);
    }

    fn write_byte(&mut self, byte: u8) {
        self.write_nibble(byte >> 4);
        self.write_nibble(byte & 0x0F);
        // Longest regular instruction
        delay_us(40);
    }

    fn write_nibble(&mut self, nibble: u8) {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            if nibble & (1 << bit) == 0 {
                pin.set_low();
            } else {
                pin.set_high();
            }
        }
        self.en.set_high();
        delay_us(1);
        self.en.set_low();
    }
}

impl CharDisplay for Hd44780 {
    fn set_cursor(&mut self, col: u8, row: u8) {
        self.command(Self::SET_DDRAM_ADDR | (col + row * Self::ROW_OFFSET));
    }

    fn write_char(&mut self, c: u8) {
        self.rs.set_high();
        self.write_byte(c);
    }
}
