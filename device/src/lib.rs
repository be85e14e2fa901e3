#![no_std]
#![feature(abi_avr_interrupt)]

use arduino_hal::hal::{Wdt, wdt::Timeout};

mod interrupt_cell;
pub mod lcd;
pub mod outputs;
pub mod serial;
pub mod shared_state;
pub mod tick;

/// Triggers a watch dog reset that will leave the device in bootloader mode.
pub fn enter_bootloader(mut watchdog: Wdt) -> ! {
    /// Magic value that tells the bootloader to remain in bootloader mode on watchdog resets.
    /// Taken from <https://github.com/arduino/ArduinoCore-avr/blob/c8c514c9a19602542bc32c7033f48fecbbda4401/bootloaders/caterina/Caterina.c#L68>
    const BOOT_KEY: u16 = 0x7777;
    /// Pointer to the address where the bootloader looks for the [`BOOT_KEY`].
    /// Taken from <https://github.com/arduino/ArduinoCore-avr/blob/c8c514c9a19602542bc32c7033f48fecbbda4401/bootloaders/caterina/Caterina.c#L69>
    const BOOT_KEY_PTR: *mut u16 = 0x0800 as *mut u16;

    // Nothing may touch the panel while the watchdog runs out.
    avr_device::interrupt::disable();

    unsafe { core::ptr::write_volatile(BOOT_KEY_PTR, BOOT_KEY) };

    // Lowest possible timeout.
    watchdog.start(Timeout::Ms16).ok();

    // Loop until the watchdog reset happens.
    loop {}
}
