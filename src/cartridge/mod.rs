pub mod mapper;

use std::fs;
use std::path::Path;

use crate::error::RomError;
use crate::memory::{Memory, PRG_WINDOW_START};
use mapper::{Mapper, PRG_BANK_SIZE};

pub const INES_SIGNATURE: [u8; 4] = *b"NES\x1a";
pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const CHR_BANK_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct INesHeader {
    /// PRG-ROM size in 16KB units.
    pub prg_banks: u8,
    /// CHR-ROM size in 8KB units; 0 means the board uses CHR-RAM.
    pub chr_banks: u8,
    pub mapper: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
}

impl INesHeader {
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < HEADER_SIZE {
            if data.len() >= 4 && data[0..4] != INES_SIGNATURE {
                return Err(RomError::BadSignature([data[0], data[1], data[2], data[3]]));
            }
            return Err(RomError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[0..4] != INES_SIGNATURE {
            return Err(RomError::BadSignature([data[0], data[1], data[2], data[3]]));
        }

        let flags6 = data[6];
        let flags7 = data[7];

        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Ok(INesHeader {
            prg_banks: data[4],
            chr_banks: data[5],
            mapper: (flags7 & 0xF0) | (flags6 >> 4),
            mirroring,
            battery: flags6 & 0x02 != 0,
            trainer: flags6 & 0x04 != 0,
        })
    }

    pub fn prg_rom_size(&self) -> usize {
        self.prg_banks as usize * PRG_BANK_SIZE
    }

    pub fn chr_rom_size(&self) -> usize {
        self.chr_banks as usize * CHR_BANK_SIZE
    }

    fn prg_rom_start(&self) -> usize {
        HEADER_SIZE + if self.trainer { TRAINER_SIZE } else { 0 }
    }
}

pub struct Cartridge {
    header: INesHeader,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, RomError> {
        let header = INesHeader::parse(data)?;
        if header.prg_banks == 0 {
            return Err(RomError::EmptyProgram);
        }

        let prg_rom_start = header.prg_rom_start();
        let chr_rom_start = prg_rom_start + header.prg_rom_size();
        let end = chr_rom_start + header.chr_rom_size();
        if data.len() < end {
            return Err(RomError::Truncated {
                expected: end,
                actual: data.len(),
            });
        }

        let mapper = mapper::for_number(header.mapper, header.prg_rom_size())
            .ok_or(RomError::UnsupportedMapper(header.mapper))?;

        let prg_rom = data[prg_rom_start..chr_rom_start].to_vec();
        let chr_rom = data[chr_rom_start..end].to_vec();

        log::info!(
            "Cartridge loaded - Mapper: {} ({}), PRG ROM: {} bytes, CHR ROM: {} bytes, Mirroring: {:?}",
            mapper.number(),
            mapper.name(),
            prg_rom.len(),
            chr_rom.len(),
            header.mirroring
        );

        Ok(Cartridge {
            header,
            prg_rom,
            chr_rom,
            mapper,
        })
    }

    /// Copies program ROM into the cartridge window of `memory` as the mapper
    /// decodes it. Addresses the mapper does not back are left untouched.
    pub fn map_into(&self, memory: &mut Memory) {
        for addr in PRG_WINDOW_START..=0xFFFF {
            if let Some(offset) = self.mapper.translate(addr) {
                if let Some(&byte) = self.prg_rom.get(offset) {
                    memory.write(addr, byte);
                }
            }
        }
    }

    pub fn header(&self) -> &INesHeader {
        &self.header
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    pub fn mirroring(&self) -> Mirroring {
        self.header.mirroring
    }

    pub fn mapper_number(&self) -> u8 {
        self.mapper.number()
    }
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("header", &self.header)
            .field("mapper", &self.mapper.name())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// iNES image with `prg_banks` NOP-filled PRG banks, `program` at the
    /// start of PRG and the reset vector pointing at 0x8000.
    pub(crate) fn build_rom(prg_banks: u8, program: &[u8]) -> Vec<u8> {
        let mut rom = vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut prg = vec![0xEA; prg_banks as usize * PRG_BANK_SIZE];
        prg[..program.len()].copy_from_slice(program);
        let len = prg.len();
        prg[len - 4] = 0x00;
        prg[len - 3] = 0x80;
        rom.extend_from_slice(&prg);
        rom.extend_from_slice(&[0; CHR_BANK_SIZE]);
        rom
    }

    #[test]
    fn test_parse_header_fields() {
        let mut rom = build_rom(1, &[]);
        rom[6] = 0x13; // mapper low nibble 1, battery, vertical
        rom[7] = 0x00;
        let header = INesHeader::parse(&rom).unwrap();
        assert_eq!(header.prg_banks, 1);
        assert_eq!(header.chr_banks, 1);
        assert_eq!(header.mapper, 1);
        assert_eq!(header.mirroring, Mirroring::Vertical);
        assert!(header.battery);
        assert!(!header.trainer);
    }

    #[test]
    fn test_bad_signature() {
        let mut rom = build_rom(1, &[]);
        rom[3] = 0x00;
        match Cartridge::from_bytes(&rom) {
            Err(err @ RomError::BadSignature(sig)) => {
                assert_eq!(sig, [0x4E, 0x45, 0x53, 0x00]);
                assert!(err.is_malformed());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_prg() {
        let rom = build_rom(1, &[]);
        let short = &rom[..HEADER_SIZE + 100];
        assert!(matches!(
            Cartridge::from_bytes(short),
            Err(RomError::Truncated { actual, .. }) if actual == HEADER_SIZE + 100
        ));
        assert!(matches!(
            Cartridge::from_bytes(&rom[..8]),
            Err(RomError::Truncated { expected: HEADER_SIZE, actual: 8 })
        ));
    }

    #[test]
    fn test_unsupported_mapper() {
        let mut rom = build_rom(1, &[]);
        rom[6] = 0x40;
        assert!(matches!(
            Cartridge::from_bytes(&rom),
            Err(RomError::UnsupportedMapper(4))
        ));
    }

    #[test]
    fn test_empty_program() {
        let mut rom = build_rom(1, &[]);
        rom[4] = 0;
        assert!(matches!(Cartridge::from_bytes(&rom), Err(RomError::EmptyProgram)));
    }

    #[test]
    fn test_trainer_is_skipped() {
        let plain = build_rom(1, &[0xA9, 0x2A]);
        let mut rom = plain[..HEADER_SIZE].to_vec();
        rom[6] |= 0x04;
        rom.extend_from_slice(&[0xFF; TRAINER_SIZE]);
        rom.extend_from_slice(&plain[HEADER_SIZE..]);
        let cart = Cartridge::from_bytes(&rom).unwrap();
        assert_eq!(&cart.prg_rom()[..2], &[0xA9, 0x2A]);
    }

    #[test]
    fn test_map_into_nrom_128() {
        let cart = Cartridge::from_bytes(&build_rom(1, &[0xA9, 0x2A])).unwrap();
        let mut memory = Memory::new();
        cart.map_into(&mut memory);
        assert_eq!(memory.read(0x8000), 0xA9);
        assert_eq!(memory.read(0x8001), 0x2A);
        assert_eq!(memory.read(0xC000), 0xA9);
        assert_eq!(memory.reset_vector(), 0x8000);
        assert_eq!(memory.read(0x7FFF), 0x00);
    }

    #[test]
    fn test_load_from_file_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&build_rom(2, &[0xEA])).unwrap();
        let cart = Cartridge::load(file.path()).unwrap();
        assert_eq!(cart.prg_rom().len(), 2 * PRG_BANK_SIZE);
        assert_eq!(cart.mapper_number(), 0);

        let missing = Cartridge::load("/nonexistent/definitely/missing.nes");
        match missing {
            Err(err @ RomError::Io(_)) => assert!(!err.is_malformed()),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
