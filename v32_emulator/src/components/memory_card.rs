//! Persistent writable memory with frame-boundary saves.
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use log::debug;

use crate::common::bus::ControlBusDevice;
use crate::common::bus::MemoryBusDevice;
use crate::common::constants::CARD_SIZE_WORDS;
use crate::common::word::Word;

const PORT_CONNECTED: i32 = 0;

pub struct MemoryCardController {
    words: Vec<Word>,
    file_path: Option<PathBuf>,
    pending_save: bool,
}

impl MemoryCardController {
    pub fn new() -> Self {
        Self {
            words: vec![Word::ZERO; CARD_SIZE_WORDS as usize],
            file_path: None,
            pending_save: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.file_path.is_some()
    }

    /// Creates a zeroed card file and attaches it.
    pub fn create_file(&mut self, path: &Path) -> Result<()> {
        self.words.fill(Word::ZERO);
        self.file_path = Some(path.to_path_buf());
        self.pending_save = false;
        self.save_contents()
            .with_context(|| format!("cannot create memory card file {:?}", path))
    }

    /// Attaches an existing card file. The file must hold exactly one
    /// card's worth of little-endian words.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let data =
            fs::read(path).with_context(|| format!("cannot open memory card file {:?}", path))?;
        ensure!(
            data.len() == self.words.len() * 4,
            "memory card file {:?} has wrong size: expected {} bytes, got {}",
            path,
            self.words.len() * 4,
            data.len()
        );
        for (slot, bytes) in self.words.iter_mut().zip(data.chunks_exact(4)) {
            *slot = Word::from_bits(u32::from_le_bytes(bytes.try_into().unwrap()));
        }
        self.file_path = Some(path.to_path_buf());
        self.pending_save = false;
        Ok(())
    }

    /// Detaches the card file. Contents stay in place until the next load;
    /// reset never clears them either.
    pub fn unload_file(&mut self) {
        self.file_path = None;
        self.pending_save = false;
    }

    /// Persists the card at the frame boundary if any write happened.
    pub fn change_frame(&mut self) -> Result<()> {
        if !self.pending_save {
            return Ok(());
        }
        self.pending_save = false;
        if self.file_path.is_some() {
            debug!("saving memory card contents");
            self.save_contents()?;
        }
        Ok(())
    }

    fn save_contents(&self) -> Result<()> {
        let path = match &self.file_path {
            Some(path) => path,
            None => return Ok(()),
        };
        let mut data = Vec::with_capacity(self.words.len() * 4);
        for word in &self.words {
            data.extend_from_slice(&word.to_bits().to_le_bytes());
        }
        // write + rename so a crash mid-save never corrupts the card
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &data)
            .with_context(|| format!("cannot write memory card file {:?}", temp_path))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("cannot replace memory card file {:?}", path))?;
        Ok(())
    }
}

impl MemoryBusDevice for MemoryCardController {
    fn read_address(&mut self, address: i32) -> Option<Word> {
        self.words.get(address as usize).copied()
    }

    fn write_address(&mut self, address: i32, value: Word) -> bool {
        match self.words.get_mut(address as usize) {
            Some(slot) => {
                *slot = value;
                self.pending_save = true;
                true
            }
            None => false,
        }
    }
}

impl ControlBusDevice for MemoryCardController {
    fn read_port(&mut self, port: i32) -> Word {
        match port {
            PORT_CONNECTED => Word::from(self.is_connected()),
            _ => Word::ZERO,
        }
    }

    fn write_port(&mut self, _port: i32, _value: Word) {}
}
