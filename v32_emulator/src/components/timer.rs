//! Frame/cycle counters and wall-clock exposure.
use chrono::Datelike;
use chrono::Local;
use chrono::Timelike;

use crate::common::bus::ControlBusDevice;
use crate::common::word::Word;

const PORT_CURRENT_DATE: i32 = 0;
const PORT_CURRENT_TIME: i32 = 1;
const PORT_FRAME_COUNTER: i32 = 2;
const PORT_CYCLE_COUNTER: i32 = 3;

/// All four ports are read-only; writes are ignored.
pub struct Timer {
    frame_counter: i32,
    cycle_counter: i32,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            frame_counter: 0,
            cycle_counter: 0,
        }
    }

    pub fn reset(&mut self) {
        self.frame_counter = 0;
        self.cycle_counter = 0;
    }

    /// Mirrors the CPU's position within the current frame.
    pub fn set_cycle_counter(&mut self, cycle: i32) {
        self.cycle_counter = cycle;
    }

    pub fn change_frame(&mut self) {
        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.cycle_counter = 0;
    }

    pub fn frame_counter(&self) -> i32 {
        self.frame_counter
    }

    fn current_date(&self) -> i32 {
        let now = Local::now();
        now.year() * 10_000 + now.month() as i32 * 100 + now.day() as i32
    }

    fn current_time(&self) -> i32 {
        let now = Local::now();
        now.hour() as i32 * 10_000 + now.minute() as i32 * 100 + now.second() as i32
    }
}

impl ControlBusDevice for Timer {
    fn read_port(&mut self, port: i32) -> Word {
        match port {
            PORT_CURRENT_DATE => Word::from(self.current_date()),
            PORT_CURRENT_TIME => Word::from(self.current_time()),
            PORT_FRAME_COUNTER => Word::from(self.frame_counter),
            PORT_CYCLE_COUNTER => Word::from(self.cycle_counter),
            _ => Word::ZERO,
        }
    }

    fn write_port(&mut self, _port: i32, _value: Word) {}
}
