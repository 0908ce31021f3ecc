use crate::cartridge::Cartridge;
use crate::config::CoreConfig;
use crate::cpu::{Cpu, CpuObserver, CpuSnapshot, LogObserver, RunState};
use crate::debugger::{disassemble, TraceEntry, Tracer};
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Halted,
    Breakpoint(u16),
    StepLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    pub reason: StopReason,
}

/// Owns the register file and the memory image. Everything outside the core
/// reads and mutates state through this handle.
pub struct Emulator {
    cpu: Cpu,
    memory: Memory,
    config: CoreConfig,
    observer: Box<dyn CpuObserver>,
    tracer: Tracer,
}

impl Emulator {
    /// Core over an already-populated image, starting at `entry_pc`.
    pub fn init(memory: Memory, entry_pc: u16, config: CoreConfig) -> Self {
        let mut cpu = Cpu::with_config(config.cpu);
        cpu.pc = entry_pc;
        let tracer = Tracer::new(if config.trace { config.trace_depth } else { 0 });
        Emulator {
            cpu,
            memory,
            config,
            observer: Box::new(LogObserver),
            tracer,
        }
    }

    /// Maps the cartridge into a fresh image and resets the CPU, taking the
    /// entry point from `config.entry`.
    pub fn from_cartridge(cartridge: &Cartridge, config: CoreConfig) -> Self {
        let mut memory = Memory::new();
        cartridge.map_into(&mut memory);
        let mut emulator = Self::init(memory, 0, config);
        emulator.reset();
        log::info!("Reset: PC = 0x{:04X}", emulator.cpu.pc);
        emulator
    }

    pub fn set_observer(&mut self, observer: Box<dyn CpuObserver>) {
        self.observer = observer;
    }

    pub fn step(&mut self) -> RunState {
        if self.config.trace && !self.cpu.halted {
            let entry = TraceEntry {
                disassembly: disassemble(&mut self.memory, self.cpu.pc),
                registers: self.cpu.snapshot(),
            };
            log::trace!("{}", entry);
            self.tracer.record(entry);
        }
        self.cpu.step(&mut self.memory, self.observer.as_mut())
    }

    /// Steps until the CPU halts, a breakpoint is reached, or `max_steps`
    /// instructions have run. A breakpoint on the current PC does not stop
    /// the first step, so a run can resume from it.
    pub fn run(&mut self, max_steps: Option<u64>) -> RunSummary {
        let mut steps = 0u64;
        loop {
            if self.cpu.halted {
                return RunSummary { steps, reason: StopReason::Halted };
            }
            if steps > 0 && self.tracer.is_breakpoint(self.cpu.pc) {
                return RunSummary {
                    steps,
                    reason: StopReason::Breakpoint(self.cpu.pc),
                };
            }
            if max_steps.is_some_and(|limit| steps >= limit) {
                return RunSummary { steps, reason: StopReason::StepLimit };
            }
            self.step();
            steps += 1;
        }
    }

    pub fn inspect(&self) -> CpuSnapshot {
        self.cpu.snapshot()
    }

    pub fn run_state(&self) -> RunState {
        self.cpu.run_state()
    }

    /// Power-on style reset. Memory is kept; registers are reinitialized and
    /// PC comes from the configured entry point.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.memory, self.config.entry);
        self.tracer.clear();
    }

    pub fn peek(&self, addr: u16) -> u8 {
        self.memory.read(addr)
    }

    pub fn poke(&mut self, addr: u16, value: u8) {
        self.memory.write(addr, value);
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut Tracer {
        &mut self.tracer
    }

    pub(crate) fn restore(&mut self, snapshot: &CpuSnapshot, ram: &[u8]) -> bool {
        if !self.memory.set_ram(ram) {
            return false;
        }
        self.cpu.restore(snapshot);
        self.tracer.clear();
        true
    }
}
