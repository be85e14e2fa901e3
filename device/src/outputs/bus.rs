use arduino_hal::{
    pac::SPI,
    port::{Pin, mode::Output},
};
use panel::ShiftRegisterBus;

use super::pins::{LatchPin, MosiPin, SckPin, SsPin};

/// The shift register chain on the hardware SPI, plus a GPIO for the latch.
pub struct SpiBus {
    spi: SPI,
    latch: Pin<Output, LatchPin>,
    _sck: Pin<Output, SckPin>,
    _mosi: Pin<Output, MosiPin>,
    _ss: Pin<Output, SsPin>,
}

impl SpiBus {
    /// Master, mode 0, MSB first, 1 MHz. The interface stays off until the first transfer.
    pub fn new(
        spi: SPI,
        mut latch: Pin<Output, LatchPin>,
        sck: Pin<Output, SckPin>,
        mosi: Pin<Output, MosiPin>,
        ss: Pin<Output, SsPin>,
    ) -> Self {
        latch.set_low();
        spi.spcr.write(|w| {
            w.mstr()
                .set_bit()
                .dord()
                .clear_bit()
                .cpol()
                .clear_bit()
                .cpha()
                .clear_bit()
                .spr()
                .fosc_16_8()
        });

        Self {
            spi,
            latch,
            _sck: sck,
            _mosi: mosi,
            _ss: ss,
        }
    }
}

impl ShiftRegisterBus for SpiBus {
    fn enable(&mut self) {
        self.spi.spcr.modify(|_, w| w.spe().set_bit().spie().set_bit());
    }

    fn write(&mut self, byte: u8) {
        self.spi.spdr.write(|w| w.bits(byte));
    }

    fn write_blocking(&mut self, byte: u8) {
        self.write(byte);
        while self.spi.spsr.read().spif().bit_is_clear() {}
        // Reading the data register after the status clears SPIF, so enabling the interrupt
        // later does not fire a stale completion.
        self.spi.spdr.read();
    }

    fn latch(&mut self) {
        self.latch.set_high();
        self.latch.set_low();
    }

    fn disable(&mut self) {
        self.spi.spcr.modify(|_, w| w.spe().clear_bit().spie().clear_bit());
    }
}
