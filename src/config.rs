//! Runtime configuration for the core and the front end.
//!
//! Values come from `Default`, then from environment flags, then from
//! command-line flags in `main`. Nothing here is cached globally; every
//! emulator instance owns its own copy.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrkBehavior {
    /// Stop the core. Matches how ROM test programs signal completion.
    #[default]
    Halt,
    /// Software interrupt: push PC+2 and status, jump through 0xFFFE.
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedOpcodePolicy {
    /// Report the opcode and continue as a one-byte no-op.
    #[default]
    Skip,
    /// Report the opcode and halt.
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPoint {
    /// Little-endian address stored at 0xFFFC/0xFFFD.
    #[default]
    ResetVector,
    Fixed(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuConfig {
    pub brk: BrkBehavior,
    pub undefined_opcode: UndefinedOpcodePolicy,
    /// When false, ADC/SBC ignore the Decimal flag (Ricoh 2A03 behavior).
    pub decimal_mode: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        CpuConfig {
            brk: BrkBehavior::Halt,
            undefined_opcode: UndefinedOpcodePolicy::Skip,
            decimal_mode: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub cpu: CpuConfig,
    pub entry: EntryPoint,
    pub trace: bool,
    /// Number of executed instructions kept by the tracer.
    pub trace_depth: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            cpu: CpuConfig::default(),
            entry: EntryPoint::ResetVector,
            trace: false,
            trace_depth: 64,
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `NES_BRK`, `NES_UNDEFINED_OPCODE`, `NES_DECIMAL`,
    /// `NES_ENTRY` and `NES_TRACE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CoreConfig::from_env`] with an arbitrary key source.
    /// Unparseable values fall back to the default and are logged.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CoreConfig::default();

        if let Some(value) = lookup("NES_BRK") {
            match value.to_ascii_lowercase().as_str() {
                "halt" => config.cpu.brk = BrkBehavior::Halt,
                "interrupt" | "irq" => config.cpu.brk = BrkBehavior::Interrupt,
                other => log::warn!("Ignoring NES_BRK={}", other),
            }
        }
        if let Some(value) = lookup("NES_UNDEFINED_OPCODE") {
            match value.to_ascii_lowercase().as_str() {
                "skip" => config.cpu.undefined_opcode = UndefinedOpcodePolicy::Skip,
                "halt" => config.cpu.undefined_opcode = UndefinedOpcodePolicy::Halt,
                other => log::warn!("Ignoring NES_UNDEFINED_OPCODE={}", other),
            }
        }
        config.cpu.decimal_mode = flag(lookup("NES_DECIMAL"), config.cpu.decimal_mode);
        config.trace = flag(lookup("NES_TRACE"), config.trace);
        if let Some(value) = lookup("NES_ENTRY") {
            if value.eq_ignore_ascii_case("vector") {
                config.entry = EntryPoint::ResetVector;
            } else {
                match parse_hex_u16(&value) {
                    Some(addr) => config.entry = EntryPoint::Fixed(addr),
                    None => log::warn!("Ignoring NES_ENTRY={}", value),
                }
            }
        }

        config
    }

    pub fn with_brk(mut self, brk: BrkBehavior) -> Self {
        self.cpu.brk = brk;
        self
    }

    pub fn with_undefined_opcode(mut self, policy: UndefinedOpcodePolicy) -> Self {
        self.cpu.undefined_opcode = policy;
        self
    }

    pub fn with_decimal_mode(mut self, enabled: bool) -> Self {
        self.cpu.decimal_mode = enabled;
        self
    }

    pub fn with_entry(mut self, entry: EntryPoint) -> Self {
        self.entry = entry;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }
}

fn flag(value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => true,
        "0" | "false" | "off" | "no" => false,
        other => {
            log::warn!("Ignoring boolean flag value {}", other);
            default
        }
    }
}

/// Accepts `8000`, `$8000` and `0x8000`.
pub fn parse_hex_u16(text: &str) -> Option<u16> {
    let digits = text
        .trim()
        .trim_start_matches('$')
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u16::from_str_radix(digits, 16).ok()
}
