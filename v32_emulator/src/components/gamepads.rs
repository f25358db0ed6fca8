//! Digital gamepad snapshot exposed to the guest.
use bilge::prelude::*;

use crate::common::bus::ControlBusDevice;
use crate::common::word::Word;

const PORT_SELECTED_GAMEPAD: i32 = 0;
const PORT_CONNECTED: i32 = 1;
const PORT_BUTTONS: i32 = 2;

pub const GAMEPAD_COUNT: usize = 4;

/// One bit per button, matching the guest-visible port layout.
#[bitsize(16)]
#[derive(Clone, Copy, DebugBits, Default, FromBits, PartialEq)]
pub struct GamepadButtons {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub start: bool,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub l: bool,
    pub r: bool,
    reserved: u5,
}

#[derive(Clone, Copy, Default)]
struct Gamepad {
    connected: bool,
    buttons: GamepadButtons,
}

pub struct GamepadController {
    selected: i32,
    pads: [Gamepad; GAMEPAD_COUNT],
}

impl GamepadController {
    pub fn new() -> Self {
        Self {
            selected: 0,
            pads: [Gamepad::default(); GAMEPAD_COUNT],
        }
    }

    pub fn reset(&mut self) {
        self.selected = 0;
    }

    pub fn set_connection(&mut self, gamepad: usize, connected: bool) {
        if let Some(pad) = self.pads.get_mut(gamepad) {
            pad.connected = connected;
            if !connected {
                pad.buttons = GamepadButtons::default();
            }
        }
    }

    /// Replaces the whole button snapshot of one pad. Called by the host
    /// between frames; the guest only ever sees complete states.
    pub fn set_buttons(&mut self, gamepad: usize, buttons: GamepadButtons) {
        if let Some(pad) = self.pads.get_mut(gamepad) {
            if pad.connected {
                pad.buttons = buttons;
            }
        }
    }

    fn selected_pad(&self) -> &Gamepad {
        &self.pads[self.selected as usize]
    }
}

impl ControlBusDevice for GamepadController {
    fn read_port(&mut self, port: i32) -> Word {
        match port {
            PORT_SELECTED_GAMEPAD => Word::from(self.selected),
            PORT_CONNECTED => Word::from(self.selected_pad().connected),
            PORT_BUTTONS => Word::from(self.selected_pad().buttons.value as u32),
            _ => Word::ZERO,
        }
    }

    fn write_port(&mut self, port: i32, value: Word) {
        if port == PORT_SELECTED_GAMEPAD {
            // out of range selections are ignored
            if (0..GAMEPAD_COUNT as i32).contains(&value.as_i32()) {
                self.selected = value.as_i32();
            }
        }
    }
}
