use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cpu::CpuSnapshot;
use crate::emulator::Emulator;
use crate::error::CoreError;
use crate::memory::MEMORY_SIZE;

pub const SAVE_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub cpu: CpuSnapshot,
    // Full 64KB image
    pub ram: Vec<u8>,
}

impl SaveState {
    pub fn capture(emulator: &Emulator) -> Self {
        SaveState {
            version: SAVE_STATE_VERSION,
            cpu: emulator.inspect(),
            ram: emulator.memory().as_slice().to_vec(),
        }
    }

    pub fn apply(&self, emulator: &mut Emulator) -> Result<(), CoreError> {
        if self.version != SAVE_STATE_VERSION {
            return Err(CoreError::IncompatibleSaveState(format!(
                "version {} (expected {})",
                self.version, SAVE_STATE_VERSION
            )));
        }
        if !emulator.restore(&self.cpu, &self.ram) {
            return Err(CoreError::IncompatibleSaveState(format!(
                "memory image is {} bytes (expected {})",
                self.ram.len(),
                MEMORY_SIZE
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CoreError> {
        Ok(bincode::deserialize(data)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CoreError> {
        let data = self.to_bytes()?;
        std::fs::write(path.as_ref(), data)?;
        log::info!("Save state written to: {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let data = std::fs::read(path.as_ref())?;
        let save_state = Self::from_bytes(&data)?;
        log::info!("Save state loaded from: {}", path.as_ref().display());
        Ok(save_state)
    }
}
