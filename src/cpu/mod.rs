pub mod addressing;
pub mod flags;
mod instructions;
pub mod opcodes;


use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::{CpuConfig, EntryPoint, UndefinedOpcodePolicy};
use crate::cpu_bus::CpuBus;
use crate::memory::{RESET_VECTOR, STACK_PAGE_START};

pub use addressing::{AddressingMode, Operand};
pub use flags::StatusFlags;
pub use opcodes::{lookup, Instruction, Opcode, OPCODE_TABLE};

pub const STACK_RESET: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted,
}

/// Conditions the core reports instead of swallowing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuEvent {
    UndefinedOpcode { opcode: u8, pc: u16 },
    /// BRK taken as a software interrupt.
    Break { pc: u16, vector: u16 },
    Halted { pc: u16, reason: HaltReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    Break,
    UndefinedOpcode,
}

pub trait CpuObserver {
    fn on_event(&mut self, event: &CpuEvent);
}

/// Default observer: everything goes to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl CpuObserver for LogObserver {
    fn on_event(&mut self, event: &CpuEvent) {
        match event {
            CpuEvent::UndefinedOpcode { opcode, pc } => {
                log::warn!("Undefined opcode 0x{:02X} at PC: 0x{:04X}", opcode, pc);
            }
            CpuEvent::Break { pc, vector } => {
                log::debug!("BRK at 0x{:04X}, vectoring to 0x{:04X}", pc, vector);
            }
            CpuEvent::Halted { pc, reason } => {
                log::info!("CPU halted at 0x{:04X} ({:?})", pc, reason);
            }
        }
    }
}

impl CpuObserver for Vec<CpuEvent> {
    fn on_event(&mut self, event: &CpuEvent) {
        self.push(event.clone());
    }
}

impl<T: CpuObserver + ?Sized> CpuObserver for Rc<RefCell<T>> {
    fn on_event(&mut self, event: &CpuEvent) {
        self.borrow_mut().on_event(event);
    }
}

/// What a handler asks of the step loop once it has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Interrupted { vector: u16 },
    Halt(HaltReason),
}

#[derive(Debug, Clone)]
pub struct Cpu {
    pub a: u8,      // Accumulator
    pub x: u8,      // X register
    pub y: u8,      // Y register
    pub sp: u8,     // Stack pointer
    pub pc: u16,    // Program counter
    pub status: StatusFlags,
    pub halted: bool,
    instructions: u64,
    config: CpuConfig,
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    pub fn with_config(config: CpuConfig) -> Self {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            sp: STACK_RESET,
            pc: 0,
            status: StatusFlags::power_on(),
            halted: false,
            instructions: 0,
            config,
        }
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn reset(&mut self, bus: &mut dyn CpuBus, entry: EntryPoint) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = STACK_RESET;
        self.status = StatusFlags::power_on() | StatusFlags::INTERRUPT_DISABLE;
        self.halted = false;
        self.instructions = 0;

        self.pc = match entry {
            EntryPoint::ResetVector => bus.read_u16(RESET_VECTOR),
            EntryPoint::Fixed(addr) => addr,
        };
    }

    /// Executes one instruction. A halted CPU stays halted and touches nothing.
    pub fn step(&mut self, bus: &mut dyn CpuBus, observer: &mut dyn CpuObserver) -> RunState {
        if self.halted {
            return RunState::Halted;
        }

        let opcode_pc = self.pc;
        let opcode = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);

        let entry = opcodes::lookup(opcode);
        let flow = if entry.is_defined() {
            let (operand, consumed) = addressing::resolve(entry.mode, bus, self);
            self.pc = self.pc.wrapping_add(consumed as u16);
            self.execute(entry.instruction, operand, bus)
        } else {
            observer.on_event(&CpuEvent::UndefinedOpcode { opcode, pc: opcode_pc });
            match self.config.undefined_opcode {
                UndefinedOpcodePolicy::Skip => Flow::Continue,
                UndefinedOpcodePolicy::Halt => Flow::Halt(HaltReason::UndefinedOpcode),
            }
        };
        self.instructions += 1;

        match flow {
            Flow::Continue => RunState::Running,
            Flow::Interrupted { vector } => {
                observer.on_event(&CpuEvent::Break { pc: opcode_pc, vector });
                RunState::Running
            }
            Flow::Halt(reason) => {
                self.halted = true;
                observer.on_event(&CpuEvent::Halted { pc: opcode_pc, reason });
                RunState::Halted
            }
        }
    }

    pub fn run_state(&self) -> RunState {
        if self.halted {
            RunState::Halted
        } else {
            RunState::Running
        }
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            pc: self.pc,
            sp: self.sp,
            a: self.a,
            x: self.x,
            y: self.y,
            status: self.status.bits(),
            halted: self.halted,
            instructions: self.instructions,
        }
    }

    pub fn restore(&mut self, snapshot: &CpuSnapshot) {
        self.pc = snapshot.pc;
        self.sp = snapshot.sp;
        self.a = snapshot.a;
        self.x = snapshot.x;
        self.y = snapshot.y;
        self.status = StatusFlags::from_bits_retain(snapshot.status) | StatusFlags::UNUSED;
        self.halted = snapshot.halted;
        self.instructions = snapshot.instructions;
    }

    fn push(&mut self, bus: &mut dyn CpuBus, value: u8) {
        let addr = STACK_PAGE_START | self.sp as u16;
        bus.write(addr, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull(&mut self, bus: &mut dyn CpuBus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = STACK_PAGE_START | self.sp as u16;
        bus.read(addr)
    }

    fn push_word(&mut self, bus: &mut dyn CpuBus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    fn pull_word(&mut self, bus: &mut dyn CpuBus) -> u16 {
        let low = self.pull(bus) as u16;
        let high = self.pull(bus) as u16;
        (high << 8) | low
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only copy of the register file for debug tooling and save states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub pc: u16,
    pub sp: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub status: u8,
    pub halted: bool,
    pub instructions: u64,
}

impl CpuSnapshot {
    pub fn flags(&self) -> StatusFlags {
        StatusFlags::from_bits_retain(self.status)
    }
}

impl fmt::Display for CpuSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} SP:{:02X} P:{:02X} [{}]{}",
            self.pc,
            self.a,
            self.x,
            self.y,
            self.sp,
            self.status,
            self.flags(),
            if self.halted { " HALTED" } else { "" }
        )
    }
}
