//! Memory and control bus fabric connecting the CPU to every device.
use log::trace;

use crate::common::bus::ControlBusDevice;
use crate::common::bus::MemoryBusDevice;
use crate::common::constants::*;
use crate::common::word::Word;
use crate::components::cartridge::CartridgeController;
use crate::components::cpu::MainBus;
use crate::components::gamepads::GamepadController;
use crate::components::gpu::Gpu;
use crate::components::memory_card::MemoryCardController;
use crate::components::null::NullController;
use crate::components::ram::Ram;
use crate::components::spu::Spu;
use crate::components::timer::Timer;

#[derive(Clone, Copy, Debug, PartialEq)]
enum MemoryDevice {
    Ram,
    Bios,
    Cartridge,
    MemoryCard,
}

/// Ordered by base, ranges disjoint. Sizes are the device slots' maximum
/// extents; a device answers `None` past its populated length.
const MEMORY_MAP: [(i32, i32, MemoryDevice); 4] = [
    (RAM_BASE, RAM_SIZE_WORDS, MemoryDevice::Ram),
    (BIOS_BASE, BIOS_MAX_WORDS, MemoryDevice::Bios),
    (CARTRIDGE_BASE, CARTRIDGE_MAX_WORDS, MemoryDevice::Cartridge),
    (CARD_BASE, CARD_SIZE_WORDS, MemoryDevice::MemoryCard),
];

#[derive(Clone, Copy, Debug, PartialEq)]
enum PortDevice {
    Timer,
    Gpu,
    Spu,
    Gamepads,
    MemoryCard,
    Cartridge,
}

const PORT_MAP: [(i32, i32, PortDevice); 6] = [
    (TIMER_PORTS_BASE, TIMER_PORTS_COUNT, PortDevice::Timer),
    (GPU_PORTS_BASE, GPU_PORTS_COUNT, PortDevice::Gpu),
    (SPU_PORTS_BASE, SPU_PORTS_COUNT, PortDevice::Spu),
    (GAMEPAD_PORTS_BASE, GAMEPAD_PORTS_COUNT, PortDevice::Gamepads),
    (CARD_PORTS_BASE, CARD_PORTS_COUNT, PortDevice::MemoryCard),
    (
        CARTRIDGE_PORTS_BASE,
        CARTRIDGE_PORTS_COUNT,
        PortDevice::Cartridge,
    ),
];

/// Locates the entry owning `address` in an ordered `(base, size, id)`
/// table and rebases the address to the device's local range.
fn decode<DeviceT: Copy>(table: &[(i32, i32, DeviceT)], address: i32) -> Option<(DeviceT, i32)> {
    if address < 0 {
        return None;
    }
    let index = table.partition_point(|entry| entry.0 <= address).checked_sub(1)?;
    let (base, size, device) = table[index];
    let local = address - base;
    (local < size).then_some((device, local))
}

pub struct MainBusImpl {
    pub ram: Ram,
    pub bios_rom: Vec<Word>,
    pub cartridge: CartridgeController,
    pub memory_card: MemoryCardController,
    pub gpu: Gpu,
    pub spu: Spu,
    pub timer: Timer,
    pub gamepads: GamepadController,
    pub null: NullController,
}

impl MainBusImpl {
    pub fn new(gpu: Gpu) -> Self {
        Self {
            ram: Ram::new(RAM_SIZE_WORDS),
            bios_rom: Vec::new(),
            cartridge: CartridgeController::new(),
            memory_card: MemoryCardController::new(),
            gpu,
            spu: Spu::new(),
            timer: Timer::new(),
            gamepads: GamepadController::new(),
            null: NullController,
        }
    }
}

impl MainBus for MainBusImpl {
    fn read(&mut self, address: i32) -> Option<Word> {
        let Some((device, local)) = decode(&MEMORY_MAP, address) else {
            trace!(target: "bus", "read from unmapped address {:#010X}", address);
            return None;
        };
        match device {
            MemoryDevice::Ram => self.ram.read_address(local),
            MemoryDevice::Bios => self.bios_rom.get(local as usize).copied(),
            MemoryDevice::Cartridge => self.cartridge.read_address(local),
            MemoryDevice::MemoryCard => self.memory_card.read_address(local),
        }
    }

    fn write(&mut self, address: i32, value: Word) -> bool {
        let Some((device, local)) = decode(&MEMORY_MAP, address) else {
            trace!(target: "bus", "write to unmapped address {:#010X}", address);
            return false;
        };
        match device {
            MemoryDevice::Ram => self.ram.write_address(local, value),
            // the bios slot is read-only on the bus
            MemoryDevice::Bios => false,
            MemoryDevice::Cartridge => self.cartridge.write_address(local, value),
            MemoryDevice::MemoryCard => self.memory_card.write_address(local, value),
        }
    }

    fn read_port(&mut self, port: i32) -> Word {
        let Some((device, local)) = decode(&PORT_MAP, port) else {
            return self.null.read_port(port);
        };
        match device {
            PortDevice::Timer => self.timer.read_port(local),
            PortDevice::Gpu => self.gpu.read_port(local),
            PortDevice::Spu => self.spu.read_port(local),
            PortDevice::Gamepads => self.gamepads.read_port(local),
            PortDevice::MemoryCard => self.memory_card.read_port(local),
            PortDevice::Cartridge => self.cartridge.read_port(local),
        }
    }

    fn write_port(&mut self, port: i32, value: Word) {
        let Some((device, local)) = decode(&PORT_MAP, port) else {
            return self.null.write_port(port, value);
        };
        match device {
            PortDevice::Timer => self.timer.write_port(local, value),
            PortDevice::Gpu => self.gpu.write_port(local, value),
            PortDevice::Spu => self.spu.write_port(local, value),
            PortDevice::Gamepads => self.gamepads.write_port(local, value),
            PortDevice::MemoryCard => self.memory_card.write_port(local, value),
            PortDevice::Cartridge => self.cartridge.write_port(local, value),
        }
    }
}
