use avr_device::interrupt;

use super::OUTPUTS;

#[interrupt(atmega32u4)]
fn SPI_STC() {
    interrupt::free(|cs| OUTPUTS.borrow(cs).borrow_mut().byte_sent());
}
