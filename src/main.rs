use std::env;
use std::process;

use nes_cpu::cartridge::Cartridge;
use nes_cpu::config::{self, BrkBehavior, CoreConfig, EntryPoint, UndefinedOpcodePolicy};
use nes_cpu::emulator::{Emulator, StopReason};
use nes_cpu::savestate::SaveState;
use nes_cpu::shutdown;

const BATCH_STEPS: u64 = 10_000;

#[derive(Debug)]
struct Options {
    rom: String,
    config: CoreConfig,
    max_steps: Option<u64>,
    load_state: Option<String>,
    save_state: Option<String>,
    breakpoints: Vec<u16>,
}

fn usage(program: &str) {
    eprintln!(
        "Usage: {} [--brk-interrupt] [--strict-opcodes] [--no-decimal] [--entry HEX] [--trace] \
         [--max-steps N] [--break HEX] [--load-state FILE] [--save-state FILE] <rom.nes>",
        program
    );
}

/// Why argument parsing stopped before a run.
#[derive(Debug, PartialEq, Eq)]
enum CliError {
    Help,
    Usage(String),
    MissingRom,
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Help => 0,
            CliError::Usage(_) => 2,
            CliError::MissingRom => 1,
        }
    }
}

fn value_of(args: &[String], i: usize, flag: &str) -> Result<String, CliError> {
    args.get(i + 1)
        .cloned()
        .ok_or_else(|| CliError::Usage(format!("{} requires a value", flag)))
}

fn hex_value(args: &[String], i: usize, flag: &str) -> Result<u16, CliError> {
    let value = value_of(args, i, flag)?;
    config::parse_hex_u16(&value)
        .ok_or_else(|| CliError::Usage(format!("{}: invalid address '{}'", flag, value)))
}

/// Command-line flags layered over `config`, which already carries the
/// environment overrides.
fn parse_args(args: &[String], mut config: CoreConfig) -> Result<Options, CliError> {
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Err(CliError::Help);
    }

    let mut rom: Option<String> = None;
    let mut max_steps = None;
    let mut load_state = None;
    let mut save_state = None;
    let mut breakpoints = Vec::new();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--brk-interrupt" => {
                config.cpu.brk = BrkBehavior::Interrupt;
                i += 1;
            }
            "--strict-opcodes" => {
                config.cpu.undefined_opcode = UndefinedOpcodePolicy::Halt;
                i += 1;
            }
            "--no-decimal" => {
                config.cpu.decimal_mode = false;
                i += 1;
            }
            "--trace" => {
                config.trace = true;
                i += 1;
            }
            "--entry" => {
                config.entry = EntryPoint::Fixed(hex_value(args, i, "--entry")?);
                i += 2;
            }
            "--max-steps" => {
                let value = value_of(args, i, "--max-steps")?;
                let n = value.parse::<u64>().map_err(|_| {
                    CliError::Usage(format!("--max-steps: invalid count '{}'", value))
                })?;
                max_steps = Some(n);
                i += 2;
            }
            "--break" => {
                breakpoints.push(hex_value(args, i, "--break")?);
                i += 2;
            }
            "--load-state" => {
                load_state = Some(value_of(args, i, "--load-state")?);
                i += 2;
            }
            "--save-state" => {
                save_state = Some(value_of(args, i, "--save-state")?);
                i += 2;
            }
            s if s.starts_with('-') => {
                return Err(CliError::Usage(format!("Unknown option: {}", s)));
            }
            s => {
                rom = Some(s.to_string());
                i += 1;
            }
        }
    }

    Ok(Options {
        rom: rom.ok_or(CliError::MissingRom)?,
        config,
        max_steps,
        load_state,
        save_state,
        breakpoints,
    })
}

/// Loads the ROM and runs it to completion. Returns the process exit code.
fn run(options: &Options) -> i32 {
    let cartridge = match Cartridge::load(&options.rom) {
        Ok(cart) => cart,
        Err(e) => {
            eprintln!("Failed to load ROM '{}': {}", options.rom, e);
            return 1;
        }
    };

    let mut emulator = Emulator::from_cartridge(&cartridge, options.config.clone());

    if let Some(path) = &options.load_state {
        let applied = SaveState::load_from_file(path).and_then(|state| state.apply(&mut emulator));
        if let Err(e) = applied {
            eprintln!("Failed to load save state '{}': {}", path, e);
            return 1;
        }
    }

    for &pc in &options.breakpoints {
        emulator.tracer_mut().add_breakpoint(pc);
    }

    shutdown::install();

    let mut total = 0u64;
    let reason = loop {
        let budget = match options.max_steps {
            Some(limit) => (limit - total).min(BATCH_STEPS),
            None => BATCH_STEPS,
        };
        let summary = emulator.run(Some(budget));
        total += summary.steps;

        match summary.reason {
            StopReason::StepLimit => {
                if options.max_steps.is_some_and(|limit| total >= limit) {
                    break StopReason::StepLimit;
                }
                if shutdown::should_quit() {
                    log::info!("Quit requested");
                    break StopReason::StepLimit;
                }
            }
            other => break other,
        }
    };

    let snapshot = emulator.inspect();
    log::info!("Stopped after {} instructions ({:?})", total, reason);
    log::info!("{}", snapshot);

    if options.config.trace {
        for entry in emulator.tracer().history() {
            log::debug!("{}", entry);
        }
    }

    if let Some(path) = &options.save_state {
        if let Err(e) = SaveState::capture(&emulator).save_to_file(path) {
            eprintln!("Failed to write save state '{}': {}", path, e);
            return 1;
        }
    }

    0
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("nes-cpu");

    let options = match parse_args(&args, CoreConfig::from_env()) {
        Ok(options) => options,
        Err(err) => {
            match &err {
                CliError::Help => {}
                CliError::Usage(message) => eprintln!("{}", message),
                CliError::MissingRom => eprintln!("Pass a path to a ROM file."),
            }
            usage(program);
            process::exit(err.exit_code());
        }
    };

    process::exit(run(&options));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("nes-cpu")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    /// NROM-128 image: `program` at 0x8000, reset vector pointing at it.
    fn write_rom(path: &Path, program: &[u8]) {
        let mut rom = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut prg = vec![0xEA; 0x4000];
        prg[..program.len()].copy_from_slice(program);
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        rom.extend_from_slice(&prg);
        rom.extend_from_slice(&[0; 0x2000]);
        std::fs::write(path, rom).unwrap();
    }

    fn options_for(rom: &Path) -> Options {
        parse_args(&args(&[rom.to_str().unwrap()]), CoreConfig::default()).unwrap()
    }

    #[test]
    fn test_missing_rom_argument_exits_1() {
        let err = parse_args(&args(&[]), CoreConfig::default()).unwrap_err();
        assert_eq!(err, CliError::MissingRom);
        assert_eq!(err.exit_code(), 1);

        let err = parse_args(&args(&["--trace"]), CoreConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_bad_options_exit_2_and_help_exits_0() {
        let err = parse_args(&args(&["--bogus", "game.nes"]), CoreConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
        assert_eq!(err.exit_code(), 2);

        let err = parse_args(&args(&["game.nes", "--entry"]), CoreConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = parse_args(&args(&["--max-steps", "lots", "game.nes"]), CoreConfig::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = parse_args(&args(&["--help"]), CoreConfig::default()).unwrap_err();
        assert_eq!(err, CliError::Help);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_flags_override_config() {
        let options = parse_args(
            &args(&[
                "--brk-interrupt",
                "--strict-opcodes",
                "--no-decimal",
                "--trace",
                "--entry",
                "$C000",
                "--max-steps",
                "500",
                "--break",
                "8004",
                "--break",
                "0x8010",
                "game.nes",
            ]),
            CoreConfig::default(),
        )
        .unwrap();

        assert_eq!(options.rom, "game.nes");
        assert_eq!(options.config.cpu.brk, BrkBehavior::Interrupt);
        assert_eq!(options.config.cpu.undefined_opcode, UndefinedOpcodePolicy::Halt);
        assert!(!options.config.cpu.decimal_mode);
        assert!(options.config.trace);
        assert_eq!(options.config.entry, EntryPoint::Fixed(0xC000));
        assert_eq!(options.max_steps, Some(500));
        assert_eq!(options.breakpoints, vec![0x8004, 0x8010]);
    }

    #[test]
    fn test_unreadable_or_malformed_rom_exits_1() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run(&options_for(&dir.path().join("missing.nes"))), 1);

        let bad = dir.path().join("bad.nes");
        std::fs::write(&bad, b"not a rom").unwrap();
        assert_eq!(run(&options_for(&bad)), 1);
    }

    #[test]
    fn test_rom_runs_to_brk_and_exits_0() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("halt.nes");
        let state = dir.path().join("halt.state");
        // LDA #$2A; BRK
        write_rom(&rom, &[0xA9, 0x2A, 0x00]);

        let mut options = options_for(&rom);
        options.save_state = Some(state.to_str().unwrap().to_string());
        assert_eq!(run(&options), 0);

        let saved = SaveState::load_from_file(&state).unwrap();
        assert_eq!(saved.cpu.a, 0x2A);
        assert!(saved.cpu.halted);
        assert_eq!(saved.cpu.pc, 0x8003);
    }

    #[test]
    fn test_step_limit_stops_endless_loop() {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("loop.nes");
        let state = dir.path().join("loop.state");
        // JMP $8000
        write_rom(&rom, &[0x4C, 0x00, 0x80]);

        let mut options = options_for(&rom);
        options.max_steps = Some(25);
        options.save_state = Some(state.to_str().unwrap().to_string());
        assert_eq!(run(&options), 0);

        let saved = SaveState::load_from_file(&state).unwrap();
        assert_eq!(saved.cpu.instructions, 25);
        assert!(!saved.cpu.halted);
    }
}
