//! Placeholder device occupying every unused port range.
use crate::common::bus::ControlBusDevice;
use crate::common::word::Word;

#[derive(Default)]
pub struct NullController;

impl ControlBusDevice for NullController {
    fn read_port(&mut self, _port: i32) -> Word {
        Word::ZERO
    }

    fn write_port(&mut self, _port: i32, _value: Word) {}
}
