//! Key cabinet panel firmware.
//!
//! The code was developed for an Arduino Pro Micro with an ATmega32u4 running at 5V.
//! Hardware components used:
//! - TIMER0 (1 kHz tick), TIMER1 (backlight and indicator PWM)
//! - SPI (shift register chain)
//! - USART1 (command console)
//! - Pins: PB0, PB1, PB2, PB4, PB5, PB6, PC6, PD0, PD1, PD2, PD3, PD4, PD7, PE6, PF4-PF7
//! - WDT

#![no_std]
#![no_main]

use arduino_hal::{Pins, hal::Wdt, hal::usart::BaudrateArduinoExt};
use avr_device::{asm::sleep, interrupt};
use device::{
    enter_bootloader,
    lcd::Hd44780,
    outputs::setup_outputs,
    serial::{LineBuffer, SerialWriter},
    shared_state::{SHARED_STATE, SharedPanel},
    tick::setup_tick,
};
use panel::{
    Console, ConsoleRequest, Controller, Event, Flow, KeyTable, KeyTimerBank, PanelAccess, draw,
};
use panic_halt as _;

#[arduino_hal::entry]
fn main() -> ! {
    let peripherals = arduino_hal::Peripherals::take().unwrap();
    // Disable the analog comparator
    peripherals.AC.acsr.write(|w| w.acd().set_bit());
    // Disable ADC
    peripherals.ADC.adcsra.write(|w| w.aden().clear_bit());
    peripherals.CPU.prr0.modify(|_, w| w.pradc().set_bit());
    // Disable the on-chip debug system, it shares PF4-PF7 with the LCD.
    // JTD only sticks when written twice within four cycles.
    peripherals.CPU.mcucr.write(|w| w.jtd().set_bit());
    peripherals.CPU.mcucr.write(|w| w.jtd().set_bit());
    // Disable TWI
    peripherals.TWI.twcr.write(|w| w.twen().clear_bit());
    peripherals.CPU.prr0.modify(|_, w| w.prtwi().set_bit());
    // Disable power to unused timers
    peripherals.CPU.prr1.modify(|_, w| w.prtim3().set_bit().prtim4().set_bit());

    let wdt = peripherals.WDT;

    let Pins {
        d0: rx_pin,
        d1: tx_pin,
        d2: rot_a_pin,
        d3: rot_b_pin,
        d4: latch_pin,
        d5: lcd_rs_pin,
        d6: lcd_en_pin,
        d7: push_pin,
        d8: secondary_pin,
        d9: backlight_pin,
        d10: indicator_pin,
        a0: lcd_d7_pin,
        a1: lcd_d6_pin,
        a2: lcd_d5_pin,
        a3: lcd_d4_pin,
        sck: sck_pin,
        mosi: mosi_pin,
        led_rx: ss_pin,
        ..
    } = arduino_hal::pins!(peripherals);

    // Create the watchdog timer
    let watchdog = Wdt::new(wdt, &peripherals.CPU.mcusr);

    let mut serial = arduino_hal::Usart::new(
        peripherals.USART1,
        rx_pin,
        tx_pin.into_output(),
        57600.into_baudrate(),
    );
    serial.listen(arduino_hal::hal::usart::Event::RxComplete);

    let mut lcd = Hd44780::new(
        lcd_rs_pin.into_output().downgrade(),
        lcd_en_pin.into_output().downgrade(),
        [
            lcd_d4_pin.into_output().downgrade(),
            lcd_d5_pin.into_output().downgrade(),
            lcd_d6_pin.into_output().downgrade(),
            lcd_d7_pin.into_output().downgrade(),
        ],
    );

    setup_outputs(
        peripherals.TC1,
        backlight_pin.into_output(),
        indicator_pin.into_output(),
        peripherals.SPI,
        latch_pin.into_output(),
        sck_pin.into_output(),
        mosi_pin.into_output(),
        ss_pin.into_output(),
    );

    setup_tick(
        &peripherals.TC0,
        rot_a_pin.into_pull_up_input(),
        rot_b_pin.into_pull_up_input(),
        push_pin.into_pull_up_input(),
        secondary_pin.into_pull_up_input(),
    );

    let mut panel = SharedPanel;
    let mut controller = Controller::new();
    let mut console = Console::new();
    let mut keys = KeyTable::new();
    let mut timers = KeyTimerBank::new();
    let mut line = LineBuffer::new();

    panel.with_panel(|panel, outputs| panel.init(outputs));

    // Enable interrupts globally.
    unsafe { interrupt::enable() };

    loop {
        let (event, byte) = interrupt::free(|cs| {
            let shared_state = &mut *SHARED_STATE.borrow(cs).borrow_mut();
            (shared_state.pop_event(), shared_state.pop_rx())
        });

        if let Some(event) = event {
            let flow = controller.handle(event, &mut panel, &mut timers, &mut keys);
            if flow == Flow::EnterBootloader {
                enter_bootloader(watchdog);
            }
        }

        if let Some(text) = byte.and_then(|b| line.push(b)) {
            let mut out = SerialWriter(&mut serial);
            match console.handle_line(&text, &mut keys, &mut timers, &mut out) {
                Ok(Some(ConsoleRequest::Bootloader)) => enter_bootloader(watchdog),
                Ok(Some(ConsoleRequest::Beeper(on))) => {
                    panel.with_panel(|panel, outputs| panel.enable_beeper(on, outputs));
                }
                Ok(Some(ConsoleRequest::Notify(notes))) => {
                    controller.notify(notes, &mut panel, &mut timers, &mut keys);
                }
                Ok(Some(ConsoleRequest::Program { slot, record })) => {
                    let status = keys.program(slot, record);
                    if let Ok(message) = console.program_finished(status, &mut out) {
                        controller.message(message, &mut panel, &mut timers, &mut keys);
                    }
                    // Re-evaluate the slot with its new contents.
                    interrupt::free(|cs| {
                        let shared_state = &mut *SHARED_STATE.borrow(cs).borrow_mut();
                        shared_state.events.push(Event::KeyChange(slot)).ok();
                    });
                }
                Ok(None) | Err(_) => {}
            }
        }

        // Copy the frame out and talk to the slow LCD with interrupts enabled.
        let frame = interrupt::free(|cs| {
            SHARED_STATE
                .borrow(cs)
                .borrow_mut()
                .panel
                .lcd_mut()
                .frame()
        });
        if let Some(frame) = frame {
            draw(&frame, &mut lcd);
        }

        if event.is_none() && byte.is_none() {
            sleep();
        }
    }
}
