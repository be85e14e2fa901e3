use arduino_hal::hal::port::{PB0, PB1, PB2, PB5, PB6, PD4};

pub type BacklightPin = PB5;
pub type IndicatorPin = PB6;
pub type LatchPin = PD4;
pub type SckPin = PB1;
pub type MosiPin = PB2;
/// Has to stay an output for the SPI to remain master.
pub type SsPin = PB0;
