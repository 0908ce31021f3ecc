//! Instruction semantics. One handler per mnemonic; each receives the operand
//! the addressing resolver produced and mutates registers, flags and memory.

use super::addressing::Operand;
use super::flags::StatusFlags;
use super::opcodes::Instruction;
use super::{Cpu, Flow, HaltReason};
use crate::config::BrkBehavior;
use crate::cpu_bus::CpuBus;
use crate::memory::IRQ_VECTOR;

impl Cpu {
    pub(crate) fn execute(
        &mut self,
        instruction: Instruction,
        operand: Operand,
        bus: &mut dyn CpuBus,
    ) -> Flow {
        use Instruction::*;

        match instruction {
            // Loads and stores
            Lda => {
                self.a = self.read_operand(bus, operand);
                self.status.apply_zero_negative(self.a);
            }
            Ldx => {
                self.x = self.read_operand(bus, operand);
                self.status.apply_zero_negative(self.x);
            }
            Ldy => {
                self.y = self.read_operand(bus, operand);
                self.status.apply_zero_negative(self.y);
            }
            Sta => self.write_operand(bus, operand, self.a),
            Stx => self.write_operand(bus, operand, self.x),
            Sty => self.write_operand(bus, operand, self.y),

            // Arithmetic
            Adc => {
                let value = self.read_operand(bus, operand);
                self.adc(value);
            }
            Sbc => {
                let value = self.read_operand(bus, operand);
                self.sbc(value);
            }

            // Logic
            And => {
                self.a &= self.read_operand(bus, operand);
                self.status.apply_zero_negative(self.a);
            }
            Ora => {
                self.a |= self.read_operand(bus, operand);
                self.status.apply_zero_negative(self.a);
            }
            Eor => {
                self.a ^= self.read_operand(bus, operand);
                self.status.apply_zero_negative(self.a);
            }
            Bit => {
                let value = self.read_operand(bus, operand);
                self.bit(value);
            }

            // Shifts and rotates
            Asl => self.modify(bus, operand, |cpu, value| {
                cpu.status.set(StatusFlags::CARRY, value & 0x80 != 0);
                value << 1
            }),
            Lsr => self.modify(bus, operand, |cpu, value| {
                cpu.status.set(StatusFlags::CARRY, value & 0x01 != 0);
                value >> 1
            }),
            Rol => self.modify(bus, operand, |cpu, value| {
                let carry_in = cpu.status.carry_bit();
                cpu.status.set(StatusFlags::CARRY, value & 0x80 != 0);
                (value << 1) | carry_in
            }),
            Ror => self.modify(bus, operand, |cpu, value| {
                let carry_in = cpu.status.carry_bit();
                cpu.status.set(StatusFlags::CARRY, value & 0x01 != 0);
                (value >> 1) | (carry_in << 7)
            }),

            // Compares
            Cmp => {
                let value = self.read_operand(bus, operand);
                self.compare(self.a, value);
            }
            Cpx => {
                let value = self.read_operand(bus, operand);
                self.compare(self.x, value);
            }
            Cpy => {
                let value = self.read_operand(bus, operand);
                self.compare(self.y, value);
            }

            // Increments and decrements
            Inc => self.modify(bus, operand, |_, value| value.wrapping_add(1)),
            Dec => self.modify(bus, operand, |_, value| value.wrapping_sub(1)),
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.status.apply_zero_negative(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.status.apply_zero_negative(self.y);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.status.apply_zero_negative(self.x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.status.apply_zero_negative(self.y);
            }

            // Branches
            Bcc => self.branch(operand, !self.status.contains(StatusFlags::CARRY)),
            Bcs => self.branch(operand, self.status.contains(StatusFlags::CARRY)),
            Bne => self.branch(operand, !self.status.contains(StatusFlags::ZERO)),
            Beq => self.branch(operand, self.status.contains(StatusFlags::ZERO)),
            Bpl => self.branch(operand, !self.status.contains(StatusFlags::NEGATIVE)),
            Bmi => self.branch(operand, self.status.contains(StatusFlags::NEGATIVE)),
            Bvc => self.branch(operand, !self.status.contains(StatusFlags::OVERFLOW)),
            Bvs => self.branch(operand, self.status.contains(StatusFlags::OVERFLOW)),

            // Jumps and subroutines
            Jmp => {
                if let Operand::Address(target) = operand {
                    self.pc = target;
                }
            }
            Jsr => {
                if let Operand::Address(target) = operand {
                    // PC sits on the next instruction; the pushed value is one less.
                    let return_addr = self.pc.wrapping_sub(1);
                    self.push_word(bus, return_addr);
                    self.pc = target;
                }
            }
            Rts => {
                self.pc = self.pull_word(bus).wrapping_add(1);
            }
            Rti => {
                let pulled = self.pull(bus);
                self.status = StatusFlags::from_pulled_byte(pulled);
                self.pc = self.pull_word(bus);
            }
            Brk => return self.brk(bus),

            // Stack
            Pha => self.push(bus, self.a),
            Php => self.push(bus, self.status.to_pushed_byte()),
            Pla => {
                self.a = self.pull(bus);
                self.status.apply_zero_negative(self.a);
            }
            Plp => {
                let pulled = self.pull(bus);
                self.status = StatusFlags::from_pulled_byte(pulled);
            }

            // Transfers
            Tax => {
                self.x = self.a;
                self.status.apply_zero_negative(self.x);
            }
            Tay => {
                self.y = self.a;
                self.status.apply_zero_negative(self.y);
            }
            Txa => {
                self.a = self.x;
                self.status.apply_zero_negative(self.a);
            }
            Tya => {
                self.a = self.y;
                self.status.apply_zero_negative(self.a);
            }
            Tsx => {
                self.x = self.sp;
                self.status.apply_zero_negative(self.x);
            }
            Txs => self.sp = self.x,

            // Flags
            Clc => self.status.clear_flag(StatusFlags::CARRY),
            Sec => self.status.set_flag(StatusFlags::CARRY),
            Cli => self.status.clear_flag(StatusFlags::INTERRUPT_DISABLE),
            Sei => self.status.set_flag(StatusFlags::INTERRUPT_DISABLE),
            Cld => self.status.clear_flag(StatusFlags::DECIMAL),
            Sed => self.status.set_flag(StatusFlags::DECIMAL),
            Clv => self.status.clear_flag(StatusFlags::OVERFLOW),

            Nop | Undefined => {}
        }

        Flow::Continue
    }

    fn read_operand(&mut self, bus: &mut dyn CpuBus, operand: Operand) -> u8 {
        match operand {
            Operand::Immediate(value) => value,
            Operand::Address(addr) => bus.read(addr),
            Operand::Accumulator => self.a,
            // Only implicit-mode handlers see this, and none of them read an operand.
            Operand::None => 0,
        }
    }

    fn write_operand(&mut self, bus: &mut dyn CpuBus, operand: Operand, value: u8) {
        match operand {
            Operand::Address(addr) => bus.write(addr, value),
            Operand::Accumulator => self.a = value,
            Operand::Immediate(_) | Operand::None => {}
        }
    }

    /// Read-modify-write on A or memory; Zero/Negative follow the new value.
    fn modify<F>(&mut self, bus: &mut dyn CpuBus, operand: Operand, op: F)
    where
        F: FnOnce(&mut Cpu, u8) -> u8,
    {
        let value = self.read_operand(bus, operand);
        let result = op(self, value);
        self.write_operand(bus, operand, result);
        self.status.apply_zero_negative(result);
    }

    fn branch(&mut self, operand: Operand, condition: bool) {
        if let (true, Operand::Address(target)) = (condition, operand) {
            self.pc = target;
        }
    }

    fn compare(&mut self, reg: u8, value: u8) {
        let result = reg.wrapping_sub(value);
        self.status.set(StatusFlags::CARRY, reg >= value);
        self.status.set(StatusFlags::ZERO, reg == value);
        self.status.set(StatusFlags::NEGATIVE, result & 0x80 != 0);
    }

    fn bit(&mut self, value: u8) {
        self.status.set(StatusFlags::ZERO, self.a & value == 0);
        self.status.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
        self.status.set(StatusFlags::OVERFLOW, value & 0x40 != 0);
    }

    fn decimal_active(&self) -> bool {
        self.config.decimal_mode && self.status.contains(StatusFlags::DECIMAL)
    }

    fn adc(&mut self, value: u8) {
        if self.decimal_active() {
            self.adc_decimal(value);
        } else {
            self.adc_binary(value);
        }
    }

    fn sbc(&mut self, value: u8) {
        if self.decimal_active() {
            self.sbc_decimal(value);
        } else {
            // SBC is ADC with the operand complemented
            self.adc_binary(!value);
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let carry = self.status.carry_bit() as u16;
        let result = self.a as u16 + value as u16 + carry;

        self.status.set(StatusFlags::CARRY, result > 0xFF);
        self.status.set(
            StatusFlags::OVERFLOW,
            (self.a ^ result as u8) & (value ^ result as u8) & 0x80 != 0,
        );

        self.a = result as u8;
        self.status.apply_zero_negative(self.a);
    }

    /// NMOS BCD addition. Zero comes from the binary sum; Negative and
    /// Overflow come from the sum after the low-nibble adjustment only.
    fn adc_decimal(&mut self, value: u8) {
        let a = self.a as u16;
        let v = value as u16;
        let carry = self.status.carry_bit() as u16;

        let binary = (a + v + carry) as u8;

        let mut low = (a & 0x0F) + (v & 0x0F) + carry;
        if low >= 0x0A {
            low = ((low + 0x06) & 0x0F) + 0x10;
        }
        let mut sum = (a & 0xF0) + (v & 0xF0) + low;

        let intermediate = sum as u8;
        self.status.set(StatusFlags::NEGATIVE, intermediate & 0x80 != 0);
        self.status.set(
            StatusFlags::OVERFLOW,
            (self.a ^ intermediate) & (value ^ intermediate) & 0x80 != 0,
        );

        if sum >= 0xA0 {
            sum += 0x60;
        }
        self.status.set(StatusFlags::CARRY, sum >= 0x100);
        self.status.set(StatusFlags::ZERO, binary == 0);
        self.a = sum as u8;
    }

    /// NMOS BCD subtraction. All flags match the binary subtraction; only the
    /// stored result is decimal-adjusted.
    fn sbc_decimal(&mut self, value: u8) {
        let a = self.a as i16;
        let v = value as i16;
        let borrow = 1 - self.status.carry_bit() as i16;

        let mut low = (a & 0x0F) - (v & 0x0F) - borrow;
        if low < 0 {
            low = ((low - 0x06) & 0x0F) - 0x10;
        }
        let mut result = (a & 0xF0) - (v & 0xF0) + low;
        if result < 0 {
            result -= 0x60;
        }

        self.adc_binary(!value);
        self.a = (result & 0xFF) as u8;
    }

    fn brk(&mut self, bus: &mut dyn CpuBus) -> Flow {
        self.status.insert(StatusFlags::BREAK | StatusFlags::INTERRUPT_DISABLE);

        match self.config.brk {
            BrkBehavior::Halt => Flow::Halt(HaltReason::Break),
            BrkBehavior::Interrupt => {
                // BRK is followed by a signature byte; the return address skips it.
                let return_pc = self.pc.wrapping_add(1);
                self.push_word(bus, return_pc);
                self.push(bus, self.status.to_pushed_byte());

                let vector = bus.read_u16(IRQ_VECTOR);
                self.pc = vector;
                Flow::Interrupted { vector }
            }
        }
    }
}
