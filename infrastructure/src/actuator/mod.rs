//! Actuator adapters

mod paper;

pub use paper::{PaperActuator, PaperPosition};
