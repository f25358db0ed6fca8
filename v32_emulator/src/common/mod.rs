//! Traits and types used by all components of the emulator.

pub mod bus;
pub mod constants;
pub mod logging;
#[cfg(test)]
pub mod test_util;
pub mod word;
