#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use v32_emulator::common::constants::BIOS_BASE;
use v32_emulator::common::constants::RAM_SIZE_WORDS;
use v32_emulator::common::word::Color;
use v32_emulator::common::word::Word;
use v32_emulator::components::cartridge::SoundAsset;
use v32_emulator::components::cartridge::TextureAsset;
use v32_emulator::components::cpu::encoding::encode;
use v32_emulator::components::cpu::encoding::Arg;
use v32_emulator::components::cpu::encoding::Opcode;
use v32_emulator::components::gpu::BlendingMode;
use v32_emulator::components::gpu::Quad;
use v32_emulator::components::gpu::VideoSink;
use v32_emulator::Bios;
use v32_emulator::Console;

#[derive(Default)]
pub struct SinkEvents {
    pub clears: Vec<Color>,
    pub quads: Vec<Quad>,
    pub multiply_colors: Vec<Color>,
    pub blending_modes: Vec<BlendingMode>,
    pub selected_textures: Vec<i32>,
    pub loaded_textures: Vec<i32>,
    pub unloads: usize,
}

pub struct RecordingVideoSink(pub Rc<RefCell<SinkEvents>>);

impl VideoSink for RecordingVideoSink {
    fn clear_screen(&mut self, color: Color) {
        self.0.borrow_mut().clears.push(color);
    }

    fn draw_quad(&mut self, quad: &Quad) {
        self.0.borrow_mut().quads.push(*quad);
    }

    fn set_multiply_color(&mut self, color: Color) {
        self.0.borrow_mut().multiply_colors.push(color);
    }

    fn set_blending_mode(&mut self, mode: BlendingMode) {
        self.0.borrow_mut().blending_modes.push(mode);
    }

    fn select_texture(&mut self, texture: i32) {
        self.0.borrow_mut().selected_textures.push(texture);
    }

    fn load_texture(&mut self, texture: i32, _asset: &TextureAsset) {
        self.0.borrow_mut().loaded_textures.push(texture);
    }

    fn unload_cartridge_textures(&mut self) {
        self.0.borrow_mut().unloads += 1;
    }
}

pub struct NullVideoSink;

impl VideoSink for NullVideoSink {
    fn clear_screen(&mut self, _color: Color) {}
    fn draw_quad(&mut self, _quad: &Quad) {}
    fn set_multiply_color(&mut self, _color: Color) {}
    fn set_blending_mode(&mut self, _mode: BlendingMode) {}
    fn select_texture(&mut self, _texture: i32) {}
    fn load_texture(&mut self, _texture: i32, _asset: &TextureAsset) {}
    fn unload_cartridge_textures(&mut self) {}
}

/// First program word after the standard bios prelude.
pub const PROGRAM_START: i32 = BIOS_BASE + 5;

/// Builds a bios image around `program`:
/// a jump over the fault vector, a HLT serving as the fault handler, a
/// stack pointer init at the top of work RAM, then the program itself.
pub fn test_bios(program: &[Vec<Word>]) -> Bios {
    let mut rom = encode(Opcode::Jmp, Arg::Imm(Word::from(BIOS_BASE + 3)), Arg::None);
    rom.extend(encode(Opcode::Hlt, Arg::None, Arg::None));
    rom.extend(encode(
        Opcode::Mov,
        Arg::Reg(14),
        Arg::Imm(Word::from(RAM_SIZE_WORDS)),
    ));
    for instruction in program {
        rom.extend(instruction.iter().copied());
    }
    Bios {
        rom,
        texture: TextureAsset {
            width: 8,
            height: 8,
            pixels: vec![0; 64],
        },
        sound: SoundAsset::default(),
    }
}

/// A powered-on console running `program`, with its video events shared.
pub fn console_with_program(program: &[Vec<Word>]) -> (Console, Rc<RefCell<SinkEvents>>) {
    v32_emulator::common::logging::test_init(false);
    let events = Rc::new(RefCell::new(SinkEvents::default()));
    let mut console = Console::new(Box::new(RecordingVideoSink(events.clone())));
    console.load_bios(test_bios(program)).unwrap();
    console.set_power(true).unwrap();
    (console, events)
}
