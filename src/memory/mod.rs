use crate::cpu_bus::CpuBus;

pub const MEMORY_SIZE: usize = 0x10000;

pub const STACK_PAGE_START: u16 = 0x0100;
pub const PRG_WINDOW_START: u16 = 0x8000;

pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Flat 64KB image. Every address the CPU produces is an index into this
/// buffer; there is no mirroring or I/O decoding at this layer.
#[derive(Clone)]
pub struct Memory {
    pub(crate) ram: Box<[u8]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            ram: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    /// Builds an image from `bytes`, which must not exceed 64KB. Shorter
    /// inputs are zero-padded.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > MEMORY_SIZE {
            return None;
        }
        let mut memory = Memory::new();
        memory.ram[..bytes.len()].copy_from_slice(bytes);
        Some(memory)
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize] = data;
    }

    pub fn read_word(&self, addr: u16) -> u16 {
        let low = self.read(addr) as u16;
        let high = self.read(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    /// Copies `data` starting at `start`, wrapping past 0xFFFF back to 0x0000.
    pub fn load(&mut self, start: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.write(start.wrapping_add(i as u16), byte);
        }
    }

    pub fn reset_vector(&self) -> u16 {
        self.read_word(RESET_VECTOR)
    }

    pub fn set_reset_vector(&mut self, addr: u16) {
        self.write(RESET_VECTOR, addr as u8);
        self.write(RESET_VECTOR + 1, (addr >> 8) as u8);
    }

    // Save state methods
    pub fn as_slice(&self) -> &[u8] {
        &self.ram
    }

    pub fn set_ram(&mut self, ram: &[u8]) -> bool {
        if ram.len() != MEMORY_SIZE {
            return false;
        }
        self.ram.copy_from_slice(ram);
        true
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBus for Memory {
    fn read(&mut self, addr: u16) -> u8 {
        self.ram[addr as usize]
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.ram[addr as usize] = data;
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("size", &self.ram.len())
            .field("reset_vector", &format_args!("${:04X}", self.reset_vector()))
            .finish()
    }
}
