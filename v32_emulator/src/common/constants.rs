//! Frozen ABI constants of the V32 machine. Known to the BIOS; never change.

pub const FRAMES_PER_SECOND: i32 = 60;
pub const CYCLES_PER_SECOND: i32 = 15_000_000;
pub const CYCLES_PER_FRAME: i32 = CYCLES_PER_SECOND / FRAMES_PER_SECOND;

pub const SCREEN_WIDTH: i32 = 640;
pub const SCREEN_HEIGHT: i32 = 360;

pub const GPU_TEXTURE_SIZE: i32 = 1024;
pub const GPU_REGIONS_PER_TEXTURE: i32 = 4096;
pub const GPU_MAX_CARTRIDGE_TEXTURES: i32 = 256;
pub const GPU_PIXEL_CAPACITY_PER_FRAME: i32 = 9 * SCREEN_WIDTH * SCREEN_HEIGHT;
pub const GPU_CLEAR_SCREEN_COST: i32 = SCREEN_WIDTH * SCREEN_HEIGHT;

pub const SPU_SOUND_CHANNELS: i32 = 16;
pub const SPU_SAMPLING_RATE: i32 = 44_100;
pub const SPU_SAMPLES_PER_FRAME: i32 = SPU_SAMPLING_RATE / FRAMES_PER_SECOND;
pub const SPU_MAX_CARTRIDGE_SOUNDS: i32 = 1024;

/// Memory bus layout, in word addresses. Device ranges never overlap.
pub const RAM_BASE: i32 = 0x0000_0000;
pub const RAM_SIZE_WORDS: i32 = 4 * 1024 * 1024;
pub const BIOS_BASE: i32 = 0x1000_0000;
pub const BIOS_MAX_WORDS: i32 = 1024 * 1024;
pub const CARTRIDGE_BASE: i32 = 0x2000_0000;
pub const CARTRIDGE_MAX_WORDS: i32 = 32 * 1024 * 1024;
pub const CARD_BASE: i32 = 0x3000_0000;
pub const CARD_SIZE_WORDS: i32 = 256 * 1024;

/// Execution starts at the first BIOS word after reset.
pub const BIOS_ENTRY_ADDRESS: i32 = BIOS_BASE;
/// Hardware faults jump here: right after the two-word jump the BIOS
/// places at its entry address.
pub const HARDWARE_FAULT_VECTOR: i32 = BIOS_BASE + 2;

/// Control bus layout. Every port outside these ranges belongs to the
/// null controller.
pub const TIMER_PORTS_BASE: i32 = 0x000;
pub const TIMER_PORTS_COUNT: i32 = 4;
pub const GPU_PORTS_BASE: i32 = 0x100;
pub const GPU_PORTS_COUNT: i32 = 18;
pub const SPU_PORTS_BASE: i32 = 0x200;
pub const SPU_PORTS_COUNT: i32 = 14;
pub const GAMEPAD_PORTS_BASE: i32 = 0x300;
pub const GAMEPAD_PORTS_COUNT: i32 = 3;
pub const CARD_PORTS_BASE: i32 = 0x400;
pub const CARD_PORTS_COUNT: i32 = 1;
pub const CARTRIDGE_PORTS_BASE: i32 = 0x500;
pub const CARTRIDGE_PORTS_COUNT: i32 = 4;
