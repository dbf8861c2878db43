//! Startup sequencing and teardown draining (spec.md §4.9). Shaped after
//! the teacher's `main()`: a `signal_hook` SIGTERM/SIGINT handler flipping
//! a shared atomic, the tick loop running on the calling thread, the IPC
//! worker on its own.
//!
//! The shared flag is a "shutdown requested" latch: it starts `false` and
//! `signal_hook::flag::register` can only ever set it `true`, never clear
//! it. Every loop here checks `!flag` rather than `flag`, so a signal
//! actually stops them — `ClockManager` and `IpcServer` are both
//! constructed against this same `Arc`, so one signal drains both.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock_manager::ClockManager;
use crate::telemetry::Logger;

const SHELL_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polls `is_ready` every 500ms until it returns true — "block until the
/// platform shell process exists" (spec.md §4.9), generalized into an
/// injectable predicate so the startup wait isn't tied to Horizon's
/// `pm:dmnt`.
pub fn wait_for_platform_shell(is_ready: impl Fn() -> bool) {
    while !is_ready() {
        std::thread::sleep(SHELL_POLL_INTERVAL);
    }
}

/// Runs the tick loop on the calling thread until `manager.running()`
/// flips false (spec.md §4.5, §5: "main thread: the tick loop").
pub fn run_tick_loop(manager: &ClockManager) {
    while manager.running() {
        manager.tick();
        if !manager.running() {
            break;
        }
        manager.wait_for_next_tick();
    }
}

/// Registers SIGTERM/SIGINT against `shutdown`, exactly as the teacher's
/// `main()` does with `signal_hook::flag::register` — no signal thread
/// needed, the flag is flipped by the signal handler itself. `shutdown`
/// must start `false`; the registration can only ever set it `true`.
pub fn install_signal_handler(shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown)?;
    Ok(())
}

/// Stops the IPC worker (its accept loop polls `shutdown`), joins it, and
/// logs the teardown. The manager and drivers are dropped by the caller
/// immediately after, completing spec.md §4.9's drain sequence.
pub fn drain(shutdown: &AtomicBool, ipc_thread: std::thread::JoinHandle<()>, logger: &Logger) {
    shutdown.store(true, Ordering::Relaxed);
    let _ = ipc_thread.join();
    logger.log_line("[lifecycle] drained");
}
