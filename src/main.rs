#[macro_use]
extern crate log;

mod cli;

use std::ffi::CString;
use std::process::exit;
use tracee_ctl::process::{HandlerResult, SyscallArgs, SyscallHandler, TimeSource, TracedThread};

/// Lets every syscall through untouched and logs it, so running this
/// binary against an arbitrary guest demonstrates the controller end to
/// end without pretending to be a real simulator.
struct PassthroughHandler;

impl SyscallHandler for PassthroughHandler {
    fn handle(&mut self, thread: &mut TracedThread, call: SyscallArgs) -> HandlerResult {
        info!("{}: syscall {} args {:?}", thread.pid(), call.number, call.args);
        HandlerResult::Native
    }
}

/// A time source anchored to process start, standing in for the
/// simulator's own clock: real elapsed wall-clock time scaled by nothing,
/// just so `RDTSC`/`RDTSCP` have something deterministic-within-a-run to
/// answer with.
struct WallClockSinceStart {
    started_at: std::time::Instant,
}

impl WallClockSinceStart {
    fn new() -> Self {
        WallClockSinceStart {
            started_at: std::time::Instant::now(),
        }
    }
}

impl TimeSource for WallClockSinceStart {
    fn current_simulated_time(&self) -> u64 {
        self.started_at.elapsed().as_nanos() as u64
    }
}

fn main() {
    env_logger::init();

    let config = cli::parse_config();
    let envp: Vec<CString> = std::env::vars()
        .map(|(k, v)| CString::new(format!("{}={}", k, v)).expect("environment has no interior nul"))
        .collect();

    let mut handler = PassthroughHandler;
    let time_source = WallClockSinceStart::new();

    let mut thread = match TracedThread::run(
        &config.argv,
        &envp,
        config.cycles_per_second,
        &mut handler,
        &time_source,
    ) {
        Ok(thread) => thread,
        Err(err) => {
            error!("failed to launch guest: {}", err);
            exit(1);
        }
    };

    while thread.is_running() {
        if let Err(err) = thread.resume(&mut handler, &time_source) {
            error!("traced thread {} failed: {}", thread.pid(), err);
            let _ = thread.terminate();
            exit(1);
        }
    }

    let code = thread.return_code().unwrap_or(-1);
    exit(code);
}
