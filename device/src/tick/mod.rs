mod interrupts;
mod pins;

use arduino_hal::{
    pac::TC0,
    port::{
        Pin,
        mode::{Input, PullUp},
    },
};
use avr_device::interrupt;
use panel::{Debouncer, InputSample};
use pins::{PushPin, RotAPin, RotBPin, SecondaryPin};

use crate::{interrupt_cell::InterruptCell, outputs::OUTPUTS, shared_state::SHARED_STATE};

/// Tick context that gets setup prior to enabling interrupts
/// and is used exclusively from the timer interrupt.
static TICK_CTX: InterruptCell<TickContext> = InterruptCell::uninit();

/// Configure timer0 to fire every millisecond and constructs the [`InterruptCell`] used
/// exclusively in the compare match interrupt.
///
/// Formula: 16 MHz / (64 * (1 + 249)) = 1000 Hz
pub fn setup_tick(
    timer: &TC0,
    rot_a: Pin<Input<PullUp>, RotAPin>,
    rot_b: Pin<Input<PullUp>, RotBPin>,
    push: Pin<Input<PullUp>, PushPin>,
    secondary: Pin<Input<PullUp>, SecondaryPin>,
) {
    // WGM
    timer.tccr0a.write(|w| w.wgm0().bits(0b10));
    timer.tccr0b.write(|w| w.wgm02().clear_bit());

    // Prescaler
    timer.tccr0b.write(|w| w.cs0().prescale_64());
    timer.ocr0a.write(|w| w.bits(249));

    // Enable the timer interrupt
    timer.timsk0.write(|w| w.ocie0a().set_bit());

    TICK_CTX.init(TickContext {
        rot_a,
        rot_b,
        push,
        secondary,
        debouncer: Debouncer::new(),
    });
}

/// Contains components used exclusively in the timer interrupt.
struct TickContext {
    rot_a: Pin<Input<PullUp>, RotAPin>,
    rot_b: Pin<Input<PullUp>, RotBPin>,
    push: Pin<Input<PullUp>, PushPin>,
    secondary: Pin<Input<PullUp>, SecondaryPin>,
    debouncer: Debouncer,
}

impl TickContext {
    /// One millisecond of panel work. Every step masks interrupts on its own, so the SPI
    /// completion can slip in between.
    #[inline]
    fn tick(&mut self) {
        let raw = InputSample::new(
            self.rot_a.is_high(),
            self.rot_b.is_high(),
            self.push.is_high(),
            self.secondary.is_high(),
        );

        interrupt::free(|cs| {
            let shared_state = &mut *SHARED_STATE.borrow(cs).borrow_mut();
            self.debouncer.poll(raw, &mut shared_state.events);
        });

        interrupt::free(|cs| {
            let shared_state = &mut *SHARED_STATE.borrow(cs).borrow_mut();
            let outputs = &mut *OUTPUTS.borrow(cs).borrow_mut();
            shared_state.panel.beeper_step(outputs);
            shared_state.panel.pwm_step(outputs);
        });

        interrupt::free(|cs| {
            let shared_state = &mut *SHARED_STATE.borrow(cs).borrow_mut();
            if shared_state.panel.advance_clock() {
                let outputs = &mut *OUTPUTS.borrow(cs).borrow_mut();
                shared_state.panel.quarter_step(&mut shared_state.events, outputs);
            }
        });
    }
}
