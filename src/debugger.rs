use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::cpu::{lookup, AddressingMode, CpuSnapshot};
use crate::cpu_bus::CpuBus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub pc: u16,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl Disassembly {
    pub fn len(&self) -> u16 {
        self.bytes.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: Vec<String> = self.bytes.iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "{:04X}  {:<8}  {}", self.pc, hex.join(" "), self.text)
    }
}

/// Decodes the instruction at `pc` without executing it. Reads through the
/// bus, so it must not be pointed at read-sensitive addresses.
pub fn disassemble(bus: &mut dyn CpuBus, pc: u16) -> Disassembly {
    let opcode = bus.read(pc);
    let entry = lookup(opcode);
    let len = entry.mode.instruction_len() as u16;
    let bytes: Vec<u8> = (0..len).map(|i| bus.read(pc.wrapping_add(i))).collect();

    let byte = bytes.get(1).copied().unwrap_or(0);
    let word = ((bytes.get(2).copied().unwrap_or(0) as u16) << 8) | byte as u16;
    let mnemonic = entry.instruction.mnemonic();

    let text = if !entry.is_defined() {
        format!(".db ${:02X}", opcode)
    } else {
        match entry.mode {
            AddressingMode::Implicit => mnemonic.to_string(),
            AddressingMode::Accumulator => format!("{} A", mnemonic),
            AddressingMode::Immediate => format!("{} #${:02X}", mnemonic, byte),
            AddressingMode::ZeroPage => format!("{} ${:02X}", mnemonic, byte),
            AddressingMode::ZeroPageX => format!("{} ${:02X},X", mnemonic, byte),
            AddressingMode::ZeroPageY => format!("{} ${:02X},Y", mnemonic, byte),
            AddressingMode::Absolute => format!("{} ${:04X}", mnemonic, word),
            AddressingMode::AbsoluteX => format!("{} ${:04X},X", mnemonic, word),
            AddressingMode::AbsoluteY => format!("{} ${:04X},Y", mnemonic, word),
            AddressingMode::Indirect => format!("{} (${:04X})", mnemonic, word),
            AddressingMode::Relative => {
                let target = pc.wrapping_add(2).wrapping_add(byte as i8 as u16);
                format!("{} ${:04X}", mnemonic, target)
            }
            AddressingMode::IndexedIndirect => format!("{} (${:02X},X)", mnemonic, byte),
            AddressingMode::IndirectIndexed => format!("{} (${:02X}),Y", mnemonic, byte),
        }
    };

    Disassembly { pc, bytes, text }
}

#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub disassembly: Disassembly,
    /// Registers before the instruction ran.
    pub registers: CpuSnapshot,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<32} {}", self.disassembly.to_string(), self.registers)
    }
}

/// Bounded history of executed instructions plus PC breakpoints.
#[derive(Debug, Clone)]
pub struct Tracer {
    history: VecDeque<TraceEntry>,
    history_size: usize,
    breakpoints: HashSet<u16>,
}

impl Tracer {
    pub fn new(history_size: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(history_size),
            history_size,
            breakpoints: HashSet::new(),
        }
    }

    pub fn record(&mut self, entry: TraceEntry) {
        if self.history_size == 0 {
            return;
        }
        if self.history.len() == self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(entry);
    }

    pub fn history(&self) -> impl Iterator<Item = &TraceEntry> {
        self.history.iter()
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.history.back()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn add_breakpoint(&mut self, pc: u16) {
        self.breakpoints.insert(pc);
    }

    pub fn remove_breakpoint(&mut self, pc: u16) -> bool {
        self.breakpoints.remove(&pc)
    }

    pub fn is_breakpoint(&self, pc: u16) -> bool {
        self.breakpoints.contains(&pc)
    }
}
