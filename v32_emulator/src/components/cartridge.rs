//! Read-only cartridge contents: program ROM plus decoded asset catalogues.
use anyhow::ensure;
use anyhow::Result;

use crate::common::bus::ControlBusDevice;
use crate::common::bus::MemoryBusDevice;
use crate::common::constants::CARTRIDGE_MAX_WORDS;
use crate::common::constants::GPU_MAX_CARTRIDGE_TEXTURES;
use crate::common::constants::GPU_TEXTURE_SIZE;
use crate::common::constants::SPU_MAX_CARTRIDGE_SOUNDS;
use crate::common::word::Word;

const PORT_CONNECTED: i32 = 0;
const PORT_PROGRAM_ROM_SIZE: i32 = 1;
const PORT_NUMBER_OF_TEXTURES: i32 = 2;
const PORT_NUMBER_OF_SOUNDS: i32 = 3;

/// A texture already decoded by the host, as RGBA words row by row.
#[derive(Clone)]
pub struct TextureAsset {
    pub width: i32,
    pub height: i32,
    pub pixels: Vec<u32>,
}

/// A sound already decoded by the host, as stereo samples at the SPU rate.
#[derive(Clone, Default)]
pub struct SoundAsset {
    pub samples: Vec<(f32, f32)>,
}

/// Everything the container loader hands the console. The core never sees
/// the on-disk format.
pub struct CartridgeContents {
    pub title: String,
    pub rom: Vec<Word>,
    pub textures: Vec<TextureAsset>,
    pub sounds: Vec<SoundAsset>,
}

impl CartridgeContents {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.rom.is_empty(), "cartridge has no program rom");
        ensure!(
            self.rom.len() <= CARTRIDGE_MAX_WORDS as usize,
            "cartridge program rom too large: {} words",
            self.rom.len()
        );
        ensure!(
            self.textures.len() <= GPU_MAX_CARTRIDGE_TEXTURES as usize,
            "too many textures: {}",
            self.textures.len()
        );
        ensure!(
            self.sounds.len() <= SPU_MAX_CARTRIDGE_SOUNDS as usize,
            "too many sounds: {}",
            self.sounds.len()
        );
        for (index, texture) in self.textures.iter().enumerate() {
            ensure!(
                texture.width > 0
                    && texture.height > 0
                    && texture.width <= GPU_TEXTURE_SIZE
                    && texture.height <= GPU_TEXTURE_SIZE,
                "texture {} has invalid size {}x{}",
                index,
                texture.width,
                texture.height
            );
            ensure!(
                texture.pixels.len() == (texture.width * texture.height) as usize,
                "texture {} pixel buffer does not match its size",
                index
            );
        }
        Ok(())
    }
}

/// The controller keeps only what the buses can see: the ROM words and the
/// catalogue counts. Pixel and sample data live in the GPU/SPU after load.
pub struct CartridgeController {
    rom: Vec<Word>,
    texture_count: i32,
    sound_count: i32,
}

impl CartridgeController {
    pub fn new() -> Self {
        Self {
            rom: Vec::new(),
            texture_count: 0,
            sound_count: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.rom.is_empty()
    }

    pub fn connect(&mut self, rom: Vec<Word>, texture_count: i32, sound_count: i32) {
        self.rom = rom;
        self.texture_count = texture_count;
        self.sound_count = sound_count;
    }

    pub fn disconnect(&mut self) {
        self.rom = Vec::new();
        self.texture_count = 0;
        self.sound_count = 0;
    }
}

impl MemoryBusDevice for CartridgeController {
    fn read_address(&mut self, address: i32) -> Option<Word> {
        self.rom.get(address as usize).copied()
    }

    // the rom is read-only; stores are rejected and fault on the CPU
    fn write_address(&mut self, _address: i32, _value: Word) -> bool {
        false
    }
}

impl ControlBusDevice for CartridgeController {
    fn read_port(&mut self, port: i32) -> Word {
        match port {
            PORT_CONNECTED => Word::from(self.is_connected()),
            PORT_PROGRAM_ROM_SIZE => Word::from(self.rom.len() as i32),
            PORT_NUMBER_OF_TEXTURES => Word::from(self.texture_count),
            PORT_NUMBER_OF_SOUNDS => Word::from(self.sound_count),
            _ => Word::ZERO,
        }
    }

    fn write_port(&mut self, _port: i32, _value: Word) {}
}
