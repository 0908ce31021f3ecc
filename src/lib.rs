//! 6502 execution core for an NES emulator.
//!
//! The loader ([`cartridge`]) turns an iNES file into a populated
//! [`memory::Memory`] image; the [`emulator::Emulator`] handle then drives the
//! [`cpu`] one instruction per [`emulator::Emulator::step`] call.

pub mod cartridge;
pub mod config;
pub mod cpu;
pub mod cpu_bus;
pub mod debugger;
pub mod emulator;
pub mod error;
pub mod memory;
pub mod savestate;
pub mod shutdown;

pub use config::CoreConfig;
pub use cpu::{Cpu, CpuSnapshot, RunState};
pub use emulator::Emulator;
pub use error::{CoreError, RomError};
