use arduino_hal::pac::TC0;
use avr_device::interrupt;

use super::TICK_CTX;

#[interrupt(atmega32u4)]
fn TIMER0_COMPA() {
    let timer = unsafe { &*TC0::ptr() };

    // The tick must not nest, but the shift register interrupt has to get through while it runs.
    timer.timsk0.write(|w| w.ocie0a().clear_bit());
    unsafe { interrupt::enable() };

    TICK_CTX.as_inner_mut().tick();

    interrupt::disable();
    timer.timsk0.write(|w| w.ocie0a().set_bit());
}
