//! Core of the V32 fantasy console.
//!
//! The [`Console`] façade owns the whole machine: a CPU whose bus owns
//! every other device. The host drives it one frame at a time and receives
//! video through the [`components::gpu::VideoSink`] capability and audio
//! through the pull-based [`components::spu::SpuAudioSource`].
pub mod common;
pub mod components;
pub mod main_bus;

use std::path::Path;

use anyhow::ensure;
use anyhow::Result;
use log::info;

use crate::common::constants::BIOS_MAX_WORDS;
use crate::common::constants::CYCLES_PER_FRAME;
use crate::common::word::Word;
use crate::components::cartridge::CartridgeContents;
use crate::components::cartridge::SoundAsset;
use crate::components::cartridge::TextureAsset;
use crate::components::cpu::Cpu;
use crate::components::gamepads::GamepadButtons;
use crate::components::gpu::Gpu;
use crate::components::gpu::VideoSink;
use crate::components::spu::SpuAudioSource;
use crate::main_bus::MainBusImpl;

/// Resident firmware: one program rom, one texture, one sound, all living
/// at index −1 of their catalogues.
pub struct Bios {
    pub rom: Vec<Word>,
    pub texture: TextureAsset,
    pub sound: SoundAsset,
}

impl Bios {
    fn validate(&self) -> Result<()> {
        ensure!(!self.rom.is_empty(), "bios has no program rom");
        ensure!(
            self.rom.len() <= BIOS_MAX_WORDS as usize,
            "bios program rom too large: {} words",
            self.rom.len()
        );
        Ok(())
    }
}

pub struct Console {
    pub cpu: Cpu<MainBusImpl>,
    bios: Option<Bios>,
    power_on: bool,
}

impl Console {
    pub fn new(video_sink: Box<dyn VideoSink>) -> Self {
        Self {
            cpu: Cpu::new(MainBusImpl::new(Gpu::new(video_sink))),
            bios: None,
            power_on: false,
        }
    }

    pub fn is_power_on(&self) -> bool {
        self.power_on
    }

    /// The pull-side audio handle for the host backend. Cloneable and safe
    /// to use from another thread.
    pub fn audio_source(&self) -> SpuAudioSource {
        self.cpu.bus.spu.audio_source()
    }

    // -----------------------------------------------------------------
    // Media

    pub fn load_bios(&mut self, bios: Bios) -> Result<()> {
        bios.validate()?;
        self.bios = Some(bios);
        Ok(())
    }

    pub fn has_bios(&self) -> bool {
        self.bios.is_some()
    }

    /// Inserts a cartridge. Only legal while powered off, like the slot of
    /// the physical machine it models.
    pub fn load_cartridge(&mut self, contents: CartridgeContents) -> Result<()> {
        ensure!(!self.power_on, "cannot insert a cartridge while powered on");
        ensure!(
            !self.cpu.bus.cartridge.is_connected(),
            "a cartridge is already inserted"
        );
        contents.validate()?;
        info!("loading cartridge '{}'", contents.title);
        self.cpu.bus.cartridge.connect(
            contents.rom,
            contents.textures.len() as i32,
            contents.sounds.len() as i32,
        );
        self.cpu.bus.gpu.load_cartridge_textures(&contents.textures);
        self.cpu.bus.spu.load_cartridge_sounds(&contents.sounds);
        Ok(())
    }

    pub fn unload_cartridge(&mut self) -> Result<()> {
        ensure!(!self.power_on, "cannot remove a cartridge while powered on");
        self.cpu.bus.cartridge.disconnect();
        self.cpu.bus.gpu.unload_cartridge_textures();
        self.cpu.bus.spu.unload_cartridge_sounds();
        Ok(())
    }

    pub fn create_memory_card(&mut self, path: &Path) -> Result<()> {
        self.cpu.bus.memory_card.create_file(path)
    }

    pub fn load_memory_card(&mut self, path: &Path) -> Result<()> {
        self.cpu.bus.memory_card.load_file(path)
    }

    pub fn unload_memory_card(&mut self) {
        self.cpu.bus.memory_card.unload_file();
    }

    // -----------------------------------------------------------------
    // Input

    pub fn set_gamepad_connection(&mut self, gamepad: usize, connected: bool) {
        self.cpu.bus.gamepads.set_connection(gamepad, connected);
    }

    pub fn set_gamepad_buttons(&mut self, gamepad: usize, buttons: GamepadButtons) {
        self.cpu.bus.gamepads.set_buttons(gamepad, buttons);
    }

    // -----------------------------------------------------------------
    // Power and frame stepping

    /// Powering on performs a reset; powering off halts the machine and
    /// zeroes device-visible state. Card contents survive either way.
    pub fn set_power(&mut self, on: bool) -> Result<()> {
        if on == self.power_on {
            return Ok(());
        }
        if on {
            ensure!(self.has_bios(), "cannot power on without a bios");
            self.power_on = true;
            self.reset();
        } else {
            self.power_on = false;
            self.cpu.bus.ram.clear();
            self.cpu.reset();
            self.cpu.halt = true;
            self.cpu.bus.gpu.reset();
            self.cpu.bus.spu.reset();
            self.cpu.bus.timer.reset();
            self.cpu.bus.gamepads.reset();
        }
        Ok(())
    }

    /// Back to the power-on state: bios reloaded into its slots, register
    /// sets zeroed, timer rewound. Card contents are left alone.
    pub fn reset(&mut self) {
        if !self.power_on {
            return;
        }
        info!("console reset");
        let Some(bios) = self.bios.as_ref() else {
            return;
        };
        self.cpu.bus.bios_rom = bios.rom.clone();
        self.cpu.bus.ram.clear();
        self.cpu.bus.gpu.reset();
        self.cpu.bus.gpu.load_bios_texture(&bios.texture);
        self.cpu.bus.spu.reset();
        self.cpu.bus.spu.load_bios_sound(&bios.sound);
        self.cpu.bus.timer.reset();
        self.cpu.bus.gamepads.reset();
        self.cpu.reset();
    }

    /// Runs the machine for one frame: the CPU's cycle budget, then one
    /// frame of audio, the timer tick and a card flush if needed.
    pub fn run_next_frame(&mut self) -> Result<()> {
        if !self.power_on {
            return Ok(());
        }
        self.cpu.begin_frame();
        self.cpu.bus.gpu.begin_frame();
        for _ in 0..CYCLES_PER_FRAME {
            if self.cpu.halt {
                break;
            }
            self.cpu.run_cycle();
            self.cpu.bus.timer.set_cycle_counter(self.cpu.cycle);
        }
        self.cpu.bus.spu.change_frame();
        self.cpu.bus.timer.change_frame();
        self.cpu.bus.memory_card.change_frame()
    }
}
