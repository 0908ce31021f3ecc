use super::Cpu;
use crate::cpu_bus::CpuBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No operand; the handler works on registers only.
    Implicit,
    /// Shifts and rotates applied to A.
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// JMP ($nnnn) only.
    Indirect,
    Relative,
    /// (zp,X)
    IndexedIndirect,
    /// (zp),Y
    IndirectIndexed,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub const fn operand_bytes(self) -> u8 {
        match self {
            AddressingMode::Implicit | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndexedIndirect
            | AddressingMode::IndirectIndexed => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }

    /// Total instruction length including the opcode byte.
    pub const fn instruction_len(self) -> u8 {
        1 + self.operand_bytes()
    }
}

/// What an instruction handler receives after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Accumulator,
    Immediate(u8),
    Address(u16),
}

/// Reads the operand bytes that follow the opcode and computes the operand.
///
/// `cpu.pc` must already point at the first operand byte. The program counter
/// is not modified here; the caller advances it by the returned byte count.
pub fn resolve(mode: AddressingMode, bus: &mut dyn CpuBus, cpu: &Cpu) -> (Operand, u8) {
    let pc = cpu.pc;
    let consumed = mode.operand_bytes();

    let operand = match mode {
        AddressingMode::Implicit => Operand::None,
        AddressingMode::Accumulator => Operand::Accumulator,
        AddressingMode::Immediate => Operand::Immediate(bus.read(pc)),
        AddressingMode::ZeroPage => Operand::Address(bus.read(pc) as u16),
        AddressingMode::ZeroPageX => {
            let base = bus.read(pc);
            Operand::Address(base.wrapping_add(cpu.x) as u16)
        }
        AddressingMode::ZeroPageY => {
            let base = bus.read(pc);
            Operand::Address(base.wrapping_add(cpu.y) as u16)
        }
        AddressingMode::Absolute => Operand::Address(bus.read_u16(pc)),
        AddressingMode::AbsoluteX => {
            let base = bus.read_u16(pc);
            Operand::Address(base.wrapping_add(cpu.x as u16))
        }
        AddressingMode::AbsoluteY => {
            let base = bus.read_u16(pc);
            Operand::Address(base.wrapping_add(cpu.y as u16))
        }
        AddressingMode::Indirect => {
            let ptr = bus.read_u16(pc);
            // NMOS quirk: the high byte is fetched from the same page as the low byte.
            let low = bus.read(ptr) as u16;
            let high = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
            Operand::Address((high << 8) | low)
        }
        AddressingMode::Relative => {
            let offset = bus.read(pc) as i8;
            let next = pc.wrapping_add(consumed as u16);
            Operand::Address(next.wrapping_add(offset as u16))
        }
        AddressingMode::IndexedIndirect => {
            let ptr = bus.read(pc).wrapping_add(cpu.x);
            Operand::Address(bus.read_u16_zero_page(ptr))
        }
        AddressingMode::IndirectIndexed => {
            let ptr = bus.read(pc);
            let base = bus.read_u16_zero_page(ptr);
            Operand::Address(base.wrapping_add(cpu.y as u16))
        }
    };

    (operand, consumed)
}
