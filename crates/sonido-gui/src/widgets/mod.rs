//! Custom widgets for audio GUI.

mod knob;
mod meter;
mod toggle;

pub use knob::Knob;
pub use meter::{GainReductionMeter, LevelMeter};
pub use toggle::{BypassToggle, FootswitchToggle};
