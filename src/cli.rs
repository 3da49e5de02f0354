//! Command-line configuration for the demonstration binary.
//!
//! Declarative `clap` setup in the same style as the teacher's own
//! rootfs/bind/cwd flags, adapted to this controller's own knobs: the
//! guest program and its arguments, the emulated cycle-counter calibration,
//! and logging verbosity (handled by `env_logger` via `RUST_LOG` directly,
//! so it isn't repeated here as a flag).

use clap::{App, Arg};
use std::ffi::CString;

/// A representative modern x86-64 TSC frequency, used when the user does
/// not override it. See §11 of the controller's design notes: the original
/// implementation hardcodes a single calibration value; this demo exposes
/// it as a flag instead.
pub const DEFAULT_CYCLES_PER_SECOND: u64 = 2_000_000_000;
pub const DEFAULT_CYCLES_PER_SECOND_STR: &str = "2000000000";

pub struct Config {
    pub argv: Vec<CString>,
    pub cycles_per_second: u64,
}

pub fn parse_config() -> Config {
    let matches = App::new("tracee-ctl")
        .about("Runs a guest program under a traced-thread controller, demonstrating syscall interception and cycle-counter emulation.")
        .arg(Arg::with_name("cycles-per-second")
            .short("c")
            .long("cycles-per-second")
            .help("Emulated TSC frequency used to answer RDTSC/RDTSCP, in Hz.")
            .takes_value(true)
            .default_value(DEFAULT_CYCLES_PER_SECOND_STR))
        .arg(Arg::with_name("guest")
            .help("Guest program and its arguments.")
            .required(true)
            .multiple(true))
        .get_matches();

    let cycles_per_second: u64 = matches
        .value_of("cycles-per-second")
        .unwrap()
        .parse()
        .expect("cycles-per-second must be a non-negative integer");

    let argv: Vec<CString> = matches
        .values_of("guest")
        .expect("guest is a required argument")
        .map(|arg| CString::new(arg).expect("guest argument has no interior nul"))
        .collect();

    Config {
        argv,
        cycles_per_second,
    }
}
