//! Entry point: wires the board, process probe, config store, frequency
//! table, clock manager and IPC service together and runs the tick loop
//! on the main thread (spec.md §4.9, §5). Mirrors the teacher's `main()`
//! shape — `signal_hook` for SIGTERM/SIGINT, one worker thread, one main
//! loop — generalized from a single thermal table to the full
//! reconciliation pipeline.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clock_governor::board::{LinuxCpufreqBoard, LinuxPaths};
use clock_governor::clock_manager::ClockManager;
use clock_governor::config::ConfigStore;
use clock_governor::freq_table::FrequencyTable;
use clock_governor::ipc::server::IpcServer;
use clock_governor::lifecycle;
use clock_governor::process::FileProcessProbe;
use clock_governor::telemetry::Logger;
use clock_governor::types::SocType;

fn config_dir() -> std::path::PathBuf {
    std::env::var_os("CLOCK_GOVERNOR_CONFIG_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("/etc/clock-governor"))
}

fn main() {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).expect("failed to create config directory");

    let logger = Arc::new(Logger::new(&dir));
    logger.log_line("[main] starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    lifecycle::install_signal_handler(shutdown.clone()).expect("failed to install signal handler");

    lifecycle::wait_for_platform_shell(|| true);

    let board: Arc<dyn clock_governor::board::BoardDriver> =
        Arc::new(LinuxCpufreqBoard::new(LinuxPaths::default(), SocType::Mariko));
    let process = Arc::new(FileProcessProbe::at(&dir));
    let config = Arc::new(ConfigStore::new(dir.join("config.ini"), logger.clone()));
    config.refresh();

    let freq_table = FrequencyTable::load(&*board, &logger).unwrap_or_else(|e| {
        logger.log_line(&format!("[!] FATAL failed to load frequency table: {e}"));
        panic!("failed to load frequency table: {e}");
    });

    let manager = Arc::new(ClockManager::new(board, process, config, freq_table, logger.clone(), shutdown.clone()));

    let ipc_server = IpcServer::bind(dir.join("clockgov.sock"), manager.clone(), logger.clone(), shutdown.clone())
        .expect("failed to bind IPC socket");
    let ipc_thread = std::thread::spawn(move || ipc_server.serve());

    lifecycle::run_tick_loop(&manager);

    lifecycle::drain(&shutdown, ipc_thread, &logger);
    logger.log_line("[main] exited");
}
