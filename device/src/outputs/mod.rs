mod bus;
mod interrupts;
mod pins;

use core::cell::RefCell;

use arduino_hal::{
    pac::{SPI, TC1},
    port::{
        Pin,
        mode::{Output, PwmOutput},
    },
    simple_pwm::{IntoPwmPin, Prescaler, Timer1Pwm},
};
use avr_device::interrupt::{self, Mutex};
use bus::SpiBus;
use panel::{OutputRecord, PanelHardware, ShiftRegisters};
use pins::{BacklightPin, IndicatorPin, LatchPin, MosiPin, SckPin, SsPin};

/// Everything the panel drives. Shared between the tick, the main loop and the SPI interrupt.
pub static OUTPUTS: Mutex<RefCell<Outputs>> = Mutex::new(RefCell::new(Outputs(None)));

/// Panel outputs, `None` until [`setup_outputs`] ran. Writes before that are dropped.
pub struct Outputs(Option<Wired>);

struct Wired {
    backlight: Pin<PwmOutput<Timer1Pwm>, BacklightPin>,
    indicator: Pin<PwmOutput<Timer1Pwm>, IndicatorPin>,
    registers: ShiftRegisters<SpiBus>,
}

impl Outputs {
    /// SPI transfer complete callback.
    #[inline]
    fn byte_sent(&mut self) {
        if let Some(wired) = &mut self.0 {
            wired.registers.on_byte_sent();
        }
    }
}

impl PanelHardware for Outputs {
    fn set_backlight(&mut self, level: u8) {
        if let Some(wired) = &mut self.0 {
            wired.backlight.set_duty(level);
        }
    }

    fn set_indicator(&mut self, level: u8) {
        if let Some(wired) = &mut self.0 {
            wired.indicator.set_duty(level);
        }
    }

    fn update_outputs(&mut self, record: OutputRecord) {
        if let Some(wired) = &mut self.0 {
            wired.registers.request_update(record);
        }
    }
}

/// Sets up the PWM channels and the shift register chain, clearing all outputs.
///
/// Timer1 runs fast PWM at 16 MHz / (64 * 256) = 976 Hz.
#[allow(clippy::too_many_arguments)]
pub fn setup_outputs(
    timer: TC1,
    backlight: Pin<Output, BacklightPin>,
    indicator: Pin<Output, IndicatorPin>,
    spi: SPI,
    latch: Pin<Output, LatchPin>,
    sck: Pin<Output, SckPin>,
    mosi: Pin<Output, MosiPin>,
    ss: Pin<Output, SsPin>,
) {
    let pwm = Timer1Pwm::new(timer, Prescaler::Prescale64);
    let mut backlight = backlight.into_pwm(&pwm);
    let mut indicator = indicator.into_pwm(&pwm);
    backlight.set_duty(0);
    indicator.set_duty(0);
    backlight.enable();
    indicator.enable();

    let mut registers = ShiftRegisters::new(SpiBus::new(spi, latch, sck, mosi, ss));
    registers.reset();

    interrupt::free(|cs| {
        OUTPUTS.borrow(cs).replace(Outputs(Some(Wired {
            backlight,
            indicator,
            registers,
        })));
    });
}
