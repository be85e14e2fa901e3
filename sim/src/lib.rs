mod hardware;
pub mod script;
mod session;

pub use anyhow::Result as AnyResult;
pub use hardware::{SimBus, SimDisplay, SimHardware};
pub use script::{Action, ScriptError};
pub use session::{Mismatch, Session};
