//! The 256-entry opcode table.
//!
//! Every byte value maps to an [`Opcode`]. The 151 documented NMOS encodings
//! carry their mnemonic and addressing mode; the remaining 105 values map to
//! [`Instruction::Undefined`] so the core can tell "unrecognized" apart from a
//! real NOP.

use super::addressing::AddressingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    Undefined,
}

impl Instruction {
    pub const fn mnemonic(self) -> &'static str {
        use Instruction::*;
        match self {
            Adc => "ADC",
            And => "AND",
            Asl => "ASL",
            Bcc => "BCC",
            Bcs => "BCS",
            Beq => "BEQ",
            Bit => "BIT",
            Bmi => "BMI",
            Bne => "BNE",
            Bpl => "BPL",
            Brk => "BRK",
            Bvc => "BVC",
            Bvs => "BVS",
            Clc => "CLC",
            Cld => "CLD",
            Cli => "CLI",
            Clv => "CLV",
            Cmp => "CMP",
            Cpx => "CPX",
            Cpy => "CPY",
            Dec => "DEC",
            Dex => "DEX",
            Dey => "DEY",
            Eor => "EOR",
            Inc => "INC",
            Inx => "INX",
            Iny => "INY",
            Jmp => "JMP",
            Jsr => "JSR",
            Lda => "LDA",
            Ldx => "LDX",
            Ldy => "LDY",
            Lsr => "LSR",
            Nop => "NOP",
            Ora => "ORA",
            Pha => "PHA",
            Php => "PHP",
            Pla => "PLA",
            Plp => "PLP",
            Rol => "ROL",
            Ror => "ROR",
            Rti => "RTI",
            Rts => "RTS",
            Sbc => "SBC",
            Sec => "SEC",
            Sed => "SED",
            Sei => "SEI",
            Sta => "STA",
            Stx => "STX",
            Sty => "STY",
            Tax => "TAX",
            Tay => "TAY",
            Tsx => "TSX",
            Txa => "TXA",
            Txs => "TXS",
            Tya => "TYA",
            Undefined => "???",
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode {
    pub instruction: Instruction,
    pub mode: AddressingMode,
}

impl Opcode {
    const fn new(instruction: Instruction, mode: AddressingMode) -> Self {
        Opcode { instruction, mode }
    }

    pub const fn is_defined(&self) -> bool {
        !matches!(self.instruction, Instruction::Undefined)
    }
}

pub static OPCODE_TABLE: [Opcode; 256] = build_table();

pub fn lookup(opcode: u8) -> Opcode {
    OPCODE_TABLE[opcode as usize]
}

const fn build_table() -> [Opcode; 256] {
    let mut table = [Opcode::new(Instruction::Undefined, AddressingMode::Implicit); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode(i as u8);
        i += 1;
    }
    table
}

const fn decode(opcode: u8) -> Opcode {
    use AddressingMode::*;
    use Instruction::*;

    let (instruction, mode) = match opcode {
        0x00 => (Brk, Implicit),
        0x01 => (Ora, IndexedIndirect),
        0x05 => (Ora, ZeroPage),
        0x06 => (Asl, ZeroPage),
        0x08 => (Php, Implicit),
        0x09 => (Ora, Immediate),
        0x0A => (Asl, Accumulator),
        0x0D => (Ora, Absolute),
        0x0E => (Asl, Absolute),

        0x10 => (Bpl, Relative),
        0x11 => (Ora, IndirectIndexed),
        0x15 => (Ora, ZeroPageX),
        0x16 => (Asl, ZeroPageX),
        0x18 => (Clc, Implicit),
        0x19 => (Ora, AbsoluteY),
        0x1D => (Ora, AbsoluteX),
        0x1E => (Asl, AbsoluteX),

        0x20 => (Jsr, Absolute),
        0x21 => (And, IndexedIndirect),
        0x24 => (Bit, ZeroPage),
        0x25 => (And, ZeroPage),
        0x26 => (Rol, ZeroPage),
        0x28 => (Plp, Implicit),
        0x29 => (And, Immediate),
        0x2A => (Rol, Accumulator),
        0x2C => (Bit, Absolute),
        0x2D => (And, Absolute),
        0x2E => (Rol, Absolute),

        0x30 => (Bmi, Relative),
        0x31 => (And, IndirectIndexed),
        0x35 => (And, ZeroPageX),
        0x36 => (Rol, ZeroPageX),
        0x38 => (Sec, Implicit),
        0x39 => (And, AbsoluteY),
        0x3D => (And, AbsoluteX),
        0x3E => (Rol, AbsoluteX),

        0x40 => (Rti, Implicit),
        0x41 => (Eor, IndexedIndirect),
        0x45 => (Eor, ZeroPage),
        0x46 => (Lsr, ZeroPage),
        0x48 => (Pha, Implicit),
        0x49 => (Eor, Immediate),
        0x4A => (Lsr, Accumulator),
        0x4C => (Jmp, Absolute),
        0x4D => (Eor, Absolute),
        0x4E => (Lsr, Absolute),

        0x50 => (Bvc, Relative),
        0x51 => (Eor, IndirectIndexed),
        0x55 => (Eor, ZeroPageX),
        0x56 => (Lsr, ZeroPageX),
        0x58 => (Cli, Implicit),
        0x59 => (Eor, AbsoluteY),
        0x5D => (Eor, AbsoluteX),
        0x5E => (Lsr, AbsoluteX),

        0x60 => (Rts, Implicit),
        0x61 => (Adc, IndexedIndirect),
        0x65 => (Adc, ZeroPage),
        0x66 => (Ror, ZeroPage),
        0x68 => (Pla, Implicit),
        0x69 => (Adc, Immediate),
        0x6A => (Ror, Accumulator),
        0x6C => (Jmp, Indirect),
        0x6D => (Adc, Absolute),
        0x6E => (Ror, Absolute),

        0x70 => (Bvs, Relative),
        0x71 => (Adc, IndirectIndexed),
        0x75 => (Adc, ZeroPageX),
        0x76 => (Ror, ZeroPageX),
        0x78 => (Sei, Implicit),
        0x79 => (Adc, AbsoluteY),
        0x7D => (Adc, AbsoluteX),
        0x7E => (Ror, AbsoluteX),

        0x81 => (Sta, IndexedIndirect),
        0x84 => (Sty, ZeroPage),
        0x85 => (Sta, ZeroPage),
        0x86 => (Stx, ZeroPage),
        0x88 => (Dey, Implicit),
        0x8A => (Txa, Implicit),
        0x8C => (Sty, Absolute),
        0x8D => (Sta, Absolute),
        0x8E => (Stx, Absolute),

        0x90 => (Bcc, Relative),
        0x91 => (Sta, IndirectIndexed),
        0x94 => (Sty, ZeroPageX),
        0x95 => (Sta, ZeroPageX),
        0x96 => (Stx, ZeroPageY),
        0x98 => (Tya, Implicit),
        0x99 => (Sta, AbsoluteY),
        0x9A => (Txs, Implicit),
        0x9D => (Sta, AbsoluteX),

        0xA0 => (Ldy, Immediate),
        0xA1 => (Lda, IndexedIndirect),
        0xA2 => (Ldx, Immediate),
        0xA4 => (Ldy, ZeroPage),
        0xA5 => (Lda, ZeroPage),
        0xA6 => (Ldx, ZeroPage),
        0xA8 => (Tay, Implicit),
        0xA9 => (Lda, Immediate),
        0xAA => (Tax, Implicit),
        0xAC => (Ldy, Absolute),
        0xAD => (Lda, Absolute),
        0xAE => (Ldx, Absolute),

        0xB0 => (Bcs, Relative),
        0xB1 => (Lda, IndirectIndexed),
        0xB4 => (Ldy, ZeroPageX),
        0xB5 => (Lda, ZeroPageX),
        0xB6 => (Ldx, ZeroPageY),
        0xB8 => (Clv, Implicit),
        0xB9 => (Lda, AbsoluteY),
        0xBA => (Tsx, Implicit),
        0xBC => (Ldy, AbsoluteX),
        0xBD => (Lda, AbsoluteX),
        0xBE => (Ldx, AbsoluteY),

        0xC0 => (Cpy, Immediate),
        0xC1 => (Cmp, IndexedIndirect),
        0xC4 => (Cpy, ZeroPage),
        0xC5 => (Cmp, ZeroPage),
        0xC6 => (Dec, ZeroPage),
        0xC8 => (Iny, Implicit),
        0xC9 => (Cmp, Immediate),
        0xCA => (Dex, Implicit),
        0xCC => (Cpy, Absolute),
        0xCD => (Cmp, Absolute),
        0xCE => (Dec, Absolute),

        0xD0 => (Bne, Relative),
        0xD1 => (Cmp, IndirectIndexed),
        0xD5 => (Cmp, ZeroPageX),
        0xD6 => (Dec, ZeroPageX),
        0xD8 => (Cld, Implicit),
        0xD9 => (Cmp, AbsoluteY),
        0xDD => (Cmp, AbsoluteX),
        0xDE => (Dec, AbsoluteX),

        0xE0 => (Cpx, Immediate),
        0xE1 => (Sbc, IndexedIndirect),
        0xE4 => (Cpx, ZeroPage),
        0xE5 => (Sbc, ZeroPage),
        0xE6 => (Inc, ZeroPage),
        0xE8 => (Inx, Implicit),
        0xE9 => (Sbc, Immediate),
        0xEA => (Nop, Implicit),
        0xEC => (Cpx, Absolute),
        0xED => (Sbc, Absolute),
        0xEE => (Inc, Absolute),

        0xF0 => (Beq, Relative),
        0xF1 => (Sbc, IndirectIndexed),
        0xF5 => (Sbc, ZeroPageX),
        0xF6 => (Inc, ZeroPageX),
        0xF8 => (Sed, Implicit),
        0xF9 => (Sbc, AbsoluteY),
        0xFD => (Sbc, AbsoluteX),
        0xFE => (Inc, AbsoluteX),

        _ => (Undefined, Implicit),
    };

    Opcode::new(instruction, mode)
}
