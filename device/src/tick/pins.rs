use arduino_hal::hal::port::{PB4, PD0, PD1, PE6};

pub type RotAPin = PD1;
pub type RotBPin = PD0;
pub type PushPin = PE6;
pub type SecondaryPin = PB4;
