//! CPU address decoding for cartridge program ROM.
//!
//! A mapper answers one question: which byte of PRG-ROM does a CPU address in
//! the cartridge window see? Bank-switching mappers can be added behind the
//! same trait without touching the CPU core.

pub const PRG_BANK_SIZE: usize = 0x4000;

pub trait Mapper {
    /// PRG-ROM offset visible at `addr`, or `None` when the address is not
    /// backed by cartridge ROM.
    fn translate(&self, addr: u16) -> Option<usize>;

    fn number(&self) -> u8;

    fn name(&self) -> &'static str;
}

/// Mapper 0. 16KB images (NROM-128) are mirrored into 0xC000-0xFFFF so the
/// vectors in the last bytes of the bank are visible at 0xFFFA-0xFFFF.
#[derive(Debug, Clone, Copy)]
pub struct Nrom {
    prg_len: usize,
}

impl Nrom {
    pub fn new(prg_len: usize) -> Self {
        Nrom { prg_len }
    }
}

impl Mapper for Nrom {
    fn translate(&self, addr: u16) -> Option<usize> {
        if addr < 0x8000 || self.prg_len == 0 {
            return None;
        }
        let rom_addr = (addr - 0x8000) as usize;
        if self.prg_len <= PRG_BANK_SIZE {
            // 16KB PRG: Mirror at 0xC000
            Some((rom_addr & 0x3FFF) % self.prg_len)
        } else {
            // 32KB PRG: Direct mapping
            Some((rom_addr & 0x7FFF) % self.prg_len)
        }
    }

    fn number(&self) -> u8 {
        0
    }

    fn name(&self) -> &'static str {
        "NROM"
    }
}

pub fn for_number(number: u8, prg_len: usize) -> Option<Box<dyn Mapper>> {
    match number {
        0 => Some(Box::new(Nrom::new(prg_len))),
        _ => None,
    }
}
