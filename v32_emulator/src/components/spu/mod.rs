//! The 16-channel sound mixer.
//!
//! All channel and catalogue state sits behind one short-lived lock: the
//! CPU thread writes ports through it during `run_next_frame`, the host
//! audio thread pulls samples through it. Neither side can observe a
//! half-updated channel.
pub mod channel;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use crate::common::bus::ControlBusDevice;
use crate::common::constants::SPU_SAMPLES_PER_FRAME;
use crate::common::constants::SPU_SOUND_CHANNELS;
use crate::common::word::Word;
use crate::components::cartridge::SoundAsset;

pub use self::channel::Channel;
pub use self::channel::ChannelState;

pub const PORT_COMMAND: i32 = 0;
pub const PORT_GLOBAL_VOLUME: i32 = 1;
pub const PORT_SELECTED_SOUND: i32 = 2;
pub const PORT_SELECTED_CHANNEL: i32 = 3;
pub const PORT_SOUND_LENGTH: i32 = 4;
pub const PORT_SOUND_PLAY_WITH_LOOP: i32 = 5;
pub const PORT_SOUND_LOOP_START: i32 = 6;
pub const PORT_SOUND_LOOP_END: i32 = 7;
pub const PORT_CHANNEL_STATE: i32 = 8;
pub const PORT_CHANNEL_ASSIGNED_SOUND: i32 = 9;
pub const PORT_CHANNEL_VOLUME: i32 = 10;
pub const PORT_CHANNEL_SPEED: i32 = 11;
pub const PORT_CHANNEL_LOOP_ENABLED: i32 = 12;
pub const PORT_CHANNEL_POSITION: i32 = 13;

pub const COMMAND_PLAY_SELECTED_CHANNEL: i32 = 1;
pub const COMMAND_PAUSE_SELECTED_CHANNEL: i32 = 2;
pub const COMMAND_STOP_SELECTED_CHANNEL: i32 = 3;
pub const COMMAND_PAUSE_ALL_CHANNELS: i32 = 4;
pub const COMMAND_RESUME_ALL_CHANNELS: i32 = 5;
pub const COMMAND_STOP_ALL_CHANNELS: i32 = 6;

/// The BIOS sound sits at this index in every selection port.
pub const BIOS_SOUND: i32 = -1;

// mixed-ahead audio kept for the host; beyond this the oldest frame is lost
const OUTPUT_QUEUE_FRAMES: usize = 4;

/// A sound in the catalogue: shared sample data plus loop metadata.
#[derive(Clone, Default)]
struct SpuSound {
    samples: Arc<Vec<(f32, f32)>>,
    play_with_loop: bool,
    loop_start: i32,
    loop_end: i32,
}

impl SpuSound {
    fn from_asset(asset: &SoundAsset) -> Self {
        let length = asset.samples.len() as i32;
        Self {
            samples: Arc::new(asset.samples.clone()),
            play_with_loop: false,
            loop_start: 0,
            loop_end: (length - 1).max(0),
        }
    }

    fn length(&self) -> i32 {
        self.samples.len() as i32
    }
}

struct SpuCore {
    global_volume: f32,
    selected_sound: i32,
    selected_channel: i32,
    bios_sound: SpuSound,
    cartridge_sounds: Vec<SpuSound>,
    channels: [Channel; SPU_SOUND_CHANNELS as usize],
    output: VecDeque<(f32, f32)>,
}

impl SpuCore {
    fn new() -> Self {
        Self {
            global_volume: 1.0,
            selected_sound: BIOS_SOUND,
            selected_channel: 0,
            bios_sound: SpuSound::default(),
            cartridge_sounds: Vec::new(),
            channels: Default::default(),
            output: VecDeque::new(),
        }
    }

    fn reset(&mut self) {
        self.global_volume = 1.0;
        self.selected_sound = BIOS_SOUND;
        self.selected_channel = 0;
        self.channels = Default::default();
        self.output.clear();
    }

    fn sound(&self, index: i32) -> &SpuSound {
        if index == BIOS_SOUND {
            &self.bios_sound
        } else {
            &self.cartridge_sounds[index as usize]
        }
    }

    fn sound_mut(&mut self, index: i32) -> &mut SpuSound {
        if index == BIOS_SOUND {
            &mut self.bios_sound
        } else {
            &mut self.cartridge_sounds[index as usize]
        }
    }

    fn selected_channel(&mut self) -> &mut Channel {
        &mut self.channels[self.selected_channel as usize]
    }

    fn sound_count(&self) -> i32 {
        self.cartridge_sounds.len() as i32
    }

    // -----------------------------------------------------------------
    // Commands

    fn execute_command(&mut self, value: Word) {
        match value.as_i32() {
            COMMAND_PLAY_SELECTED_CHANNEL => self.selected_channel().play(),
            COMMAND_PAUSE_SELECTED_CHANNEL => self.selected_channel().pause(),
            COMMAND_STOP_SELECTED_CHANNEL => self.selected_channel().stop(),
            COMMAND_PAUSE_ALL_CHANNELS => {
                for channel in &mut self.channels {
                    channel.pause();
                }
            }
            COMMAND_RESUME_ALL_CHANNELS => {
                for channel in &mut self.channels {
                    channel.resume();
                }
            }
            COMMAND_STOP_ALL_CHANNELS => {
                for channel in &mut self.channels {
                    channel.stop();
                }
            }
            // unknown command codes are just ignored
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Mixing

    /// Produces `out.len()` fresh stereo samples, advancing every playing
    /// channel (advance first, then apply the loop wrap or natural end).
    fn mix(&mut self, out: &mut [(f32, f32)]) {
        for slot in out.iter_mut() {
            let mut left = 0.0_f32;
            let mut right = 0.0_f32;
            for index in 0..self.channels.len() {
                let channel = self.channels[index];
                if channel.state != ChannelState::Playing {
                    continue;
                }
                let sound = self.sound(channel.assigned_sound).clone();
                let length = sound.length();
                let channel = &mut self.channels[index];
                if length == 0 {
                    channel.stop();
                    continue;
                }
                let sample_index = (channel.position as i32).clamp(0, length - 1);
                let (l, r) = sound.samples[sample_index as usize];
                let gain = channel.volume * self.global_volume;
                left += l * gain;
                right += r * gain;

                channel.position += channel.speed as f64;
                if channel.loop_enabled {
                    if channel.position >= sound.loop_end as f64 {
                        channel.position = sound.loop_start as f64;
                    }
                } else if channel.position >= length as f64 {
                    channel.stop();
                }
            }
            *slot = (left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0));
        }
    }

    /// Mixes one frame's worth of samples into the output queue.
    fn change_frame(&mut self) {
        let mut frame = [(0.0, 0.0); SPU_SAMPLES_PER_FRAME as usize];
        self.mix(&mut frame);
        self.output.extend(frame);
        let cap = OUTPUT_QUEUE_FRAMES * SPU_SAMPLES_PER_FRAME as usize;
        while self.output.len() > cap {
            self.output.pop_front();
        }
    }

    // -----------------------------------------------------------------
    // Ports

    fn read_port(&mut self, port: i32) -> Word {
        match port {
            // command is write-only
            PORT_COMMAND => Word::ZERO,
            PORT_GLOBAL_VOLUME => Word::from(self.global_volume),
            PORT_SELECTED_SOUND => Word::from(self.selected_sound),
            PORT_SELECTED_CHANNEL => Word::from(self.selected_channel),
            PORT_SOUND_LENGTH => Word::from(self.sound(self.selected_sound).length()),
            PORT_SOUND_PLAY_WITH_LOOP => {
                Word::from(self.sound(self.selected_sound).play_with_loop)
            }
            PORT_SOUND_LOOP_START => Word::from(self.sound(self.selected_sound).loop_start),
            PORT_SOUND_LOOP_END => Word::from(self.sound(self.selected_sound).loop_end),
            PORT_CHANNEL_STATE => Word::from(self.selected_channel().state as i32),
            PORT_CHANNEL_ASSIGNED_SOUND => Word::from(self.selected_channel().assigned_sound),
            PORT_CHANNEL_VOLUME => Word::from(self.selected_channel().volume),
            PORT_CHANNEL_SPEED => Word::from(self.selected_channel().speed),
            PORT_CHANNEL_LOOP_ENABLED => Word::from(self.selected_channel().loop_enabled),
            PORT_CHANNEL_POSITION => Word::from(self.selected_channel().position as i32),
            _ => Word::ZERO,
        }
    }

    fn write_port(&mut self, port: i32, value: Word) {
        match port {
            PORT_COMMAND => self.execute_command(value),
            PORT_GLOBAL_VOLUME => {
                if let Some(volume) = accept_float(value, 0.0, 2.0) {
                    self.global_volume = volume;
                }
            }
            PORT_SELECTED_SOUND => {
                // prevent selecting a non-existent sound
                let index = value.as_i32();
                if index < BIOS_SOUND || index >= self.sound_count() {
                    return;
                }
                self.selected_sound = index;
            }
            PORT_SELECTED_CHANNEL => {
                let index = value.as_i32();
                if !(0..SPU_SOUND_CHANNELS).contains(&index) {
                    return;
                }
                self.selected_channel = index;
            }
            // read-only
            PORT_SOUND_LENGTH => {}
            PORT_SOUND_PLAY_WITH_LOOP => {
                self.sound_mut(self.selected_sound).play_with_loop = value.as_bool();
            }
            PORT_SOUND_LOOP_START => {
                let sound = self.sound_mut(self.selected_sound);
                let clamped = clamp_to_sound(value, sound.length());
                // keep loop_start <= loop_end by snapping to the other end
                sound.loop_start = clamped.min(sound.loop_end);
            }
            PORT_SOUND_LOOP_END => {
                let sound = self.sound_mut(self.selected_sound);
                let clamped = clamp_to_sound(value, sound.length());
                sound.loop_end = clamped.max(sound.loop_start);
            }
            // read-only
            PORT_CHANNEL_STATE => {}
            PORT_CHANNEL_ASSIGNED_SOUND => {
                let index = value.as_i32();
                if index < BIOS_SOUND || index >= self.sound_count() {
                    return;
                }
                // sounds can only be assigned to a non playing channel
                if self.selected_channel().state != ChannelState::Stopped {
                    return;
                }
                let play_with_loop = self.sound(index).play_with_loop;
                let channel = self.selected_channel();
                channel.assigned_sound = index;
                channel.loop_enabled = play_with_loop;
            }
            PORT_CHANNEL_VOLUME => {
                if let Some(volume) = accept_float(value, 0.0, 8.0) {
                    self.selected_channel().volume = volume;
                }
            }
            PORT_CHANNEL_SPEED => {
                if let Some(speed) = accept_float(value, 0.0, 128.0) {
                    self.selected_channel().speed = speed;
                }
            }
            PORT_CHANNEL_LOOP_ENABLED => {
                self.selected_channel().loop_enabled = value.as_bool();
            }
            PORT_CHANNEL_POSITION => {
                let assigned_sound = self.selected_channel().assigned_sound;
                let length = self.sound(assigned_sound).length();
                // whole samples only; the fractional part resets to zero
                self.selected_channel().position = clamp_to_sound(value, length) as f64;
            }
            _ => {}
        }
    }
}

/// Float ports discard non-finite writes and clamp the rest.
fn accept_float(value: Word, min: f32, max: f32) -> Option<f32> {
    let value = value.as_f32();
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(min, max))
}

fn clamp_to_sound(value: Word, length: i32) -> i32 {
    value.as_i32().clamp(0, (length - 1).max(0))
}

pub struct Spu {
    core: Arc<Mutex<SpuCore>>,
}

impl Spu {
    pub fn new() -> Self {
        Self {
            core: Arc::new(Mutex::new(SpuCore::new())),
        }
    }

    pub fn reset(&mut self) {
        self.core.lock().unwrap().reset();
    }

    /// Installs the resident firmware sound at index −1.
    pub fn load_bios_sound(&mut self, asset: &SoundAsset) {
        self.core.lock().unwrap().bios_sound = SpuSound::from_asset(asset);
    }

    pub fn load_cartridge_sounds(&mut self, assets: &[SoundAsset]) {
        let mut core = self.core.lock().unwrap();
        core.cartridge_sounds = assets.iter().map(SpuSound::from_asset).collect();
    }

    /// Drops the cartridge catalogue. Channels that referenced it fall
    /// back to the BIOS sound so no index can dangle.
    pub fn unload_cartridge_sounds(&mut self) {
        let mut core = self.core.lock().unwrap();
        core.cartridge_sounds.clear();
        core.selected_sound = BIOS_SOUND;
        for channel in &mut core.channels {
            channel.stop();
            channel.assigned_sound = BIOS_SOUND;
        }
    }

    pub fn change_frame(&mut self) {
        self.core.lock().unwrap().change_frame();
    }

    /// The pull-side handle handed to the host audio backend.
    pub fn audio_source(&self) -> SpuAudioSource {
        SpuAudioSource {
            core: self.core.clone(),
        }
    }

    #[cfg(test)]
    fn mix_now(&mut self, out: &mut [(f32, f32)]) {
        self.core.lock().unwrap().mix(out);
    }
}

impl ControlBusDevice for Spu {
    fn read_port(&mut self, port: i32) -> Word {
        self.core.lock().unwrap().read_port(port)
    }

    fn write_port(&mut self, port: i32, value: Word) {
        self.core.lock().unwrap().write_port(port, value);
    }
}

/// Cloneable pull interface; safe to call from the host audio thread.
#[derive(Clone)]
pub struct SpuAudioSource {
    core: Arc<Mutex<SpuCore>>,
}

impl SpuAudioSource {
    /// Fills `out` from the mixed-ahead queue, zero-filling underruns.
    pub fn pull(&self, out: &mut [(f32, f32)]) {
        let mut core = self.core.lock().unwrap();
        for slot in out.iter_mut() {
            *slot = core.output.pop_front().unwrap_or((0.0, 0.0));
        }
    }

    /// Samples waiting in the queue.
    pub fn buffered(&self) -> usize {
        self.core.lock().unwrap().output.len()
    }
}
