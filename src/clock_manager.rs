//! The reconciliation state machine (spec.md §4.5). Owns the context
//! mutex; the tick body runs fully under the lock, mirroring the
//! teacher's `governor()` loop shape (one owner thread, a shared atomic
//! running flag, a blocking sleep between iterations) generalized from a
//! single thermal-table lookup to full context refresh + policy + cap +
//! quantize + set_hz.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::board::BoardDriver;
use crate::config::ConfigStore;
use crate::error::fatal;
use crate::freq_table::FrequencyTable;
use crate::policy::PolicyResolver;
use crate::process::ProcessProbe;
use crate::quantizer::{max_allowed_hz, nearest_hz};
use crate::telemetry::Logger;
use crate::types::{Context, Module, PowerSensor, RamLoad, ThermalSensor};

struct IntervalGate(AtomicU64);

impl IntervalGate {
    fn new() -> Self {
        IntervalGate(AtomicU64::new(0))
    }

    /// `interval_ms == 0` disables the gate permanently (matches
    /// `ConfigValueKey`'s "0 disables" semantics).
    fn ready(&self, now_ms: u64, interval_ms: u64) -> bool {
        if interval_ms == 0 {
            return false;
        }
        let last = self.0.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) >= interval_ms {
            self.0.store(now_ms, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

pub struct ClockManager {
    board: Arc<dyn BoardDriver>,
    process: Arc<dyn ProcessProbe>,
    config: Arc<ConfigStore>,
    freq_table: FrequencyTable,
    logger: Arc<Logger>,
    context: Mutex<Context>,
    /// Shared with the signal handler and the IPC server: starts `false`,
    /// flipped to `true` by a SIGTERM/SIGINT or an `Exit` command. Never
    /// cleared once set (matches `signal_hook::flag::register`'s own
    /// one-directional semantics).
    shutdown: Arc<AtomicBool>,
    start: Instant,
    temp_gate: IntervalGate,
    power_gate: IntervalGate,
    freq_gate: IntervalGate,
    csv_gate: IntervalGate,
}

impl ClockManager {
    pub fn new(
        board: Arc<dyn BoardDriver>,
        process: Arc<dyn ProcessProbe>,
        config: Arc<ConfigStore>,
        freq_table: FrequencyTable,
        logger: Arc<Logger>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        ClockManager {
            board,
            process,
            config,
            freq_table,
            logger,
            context: Mutex::new(Context::default()),
            shutdown,
            start: Instant::now(),
            temp_gate: IntervalGate::new(),
            power_gate: IntervalGate::new(),
            freq_gate: IntervalGate::new(),
            csv_gate: IntervalGate::new(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn get_current_context(&self) -> Context {
        self.context.lock().unwrap().clone()
    }

    pub fn get_config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn get_freq_list(&self, module: Module) -> Vec<u32> {
        self.freq_table.get_list(module).to_vec()
    }

    /// Requests shutdown. There is no way back to `true` — mirrors
    /// `signal_hook`'s own flag semantics so the same `Arc<AtomicBool>` can
    /// be registered with it directly (spec.md §4.9).
    pub fn set_running(&self, running: bool) {
        if !running {
            self.shutdown.store(true, Ordering::Relaxed);
        }
    }

    pub fn running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    pub fn wait_for_next_tick(&self) {
        let interval_ms = self.config.get_config_values().polling_interval_ms;
        std::thread::sleep(Duration::from_millis(interval_ms));
    }

    /// One reconciliation pass (spec.md §4.5). Holds the context mutex for
    /// its full duration.
    pub fn tick(&self) {
        let mut ctx = self.context.lock().unwrap();
        let config_reloaded = self.config.refresh();
        let changed = self.refresh_context(&mut ctx, config_reloaded);

        if changed {
            self.reconcile(&mut ctx);
        }

        self.sample_telemetry(&mut ctx);
    }

    /// Updates `ctx` from every live source and reports whether anything
    /// changed, a config reload counting as a change in its own right. On a
    /// change, hands control back to the platform (`reset_to_stock`) and
    /// waits one polling interval before returning, per spec.md §4.5 — so
    /// the reconcile step that follows in `tick()` sees platform defaults
    /// already applied.
    fn refresh_context(&self, ctx: &mut Context, config_reloaded: bool) -> bool {
        let mut changed = config_reloaded;

        let enabled = self.config.enabled();
        changed |= enabled != ctx.enabled;
        ctx.enabled = enabled;

        let app_id = self.process.application_id();
        changed |= app_id != ctx.application_id;
        ctx.application_id = app_id;

        let profile = self
            .board
            .get_profile()
            .unwrap_or_else(|e| fatal(&self.logger, &format!("get_profile: {e}")));
        changed |= profile != ctx.profile;
        ctx.profile = profile;

        for module in Module::ALL {
            let hz = self
                .board
                .get_hz(module)
                .unwrap_or_else(|e| fatal(&self.logger, &format!("get_hz({module:?}): {e}")));
            changed |= hz != ctx.freq(module);
            ctx.set_freq(module, hz);

            let override_hz = self.config.override_hz(module);
            changed |= override_hz != ctx.override_freq(module);
            ctx.set_override_freq(module, override_hz);
        }

        if changed {
            self.board
                .reset_to_stock()
                .unwrap_or_else(|e| fatal(&self.logger, &format!("reset_to_stock: {e}")));
            self.wait_for_next_tick();
        }

        changed
    }

    /// For each module: override wins over policy; skip if neither names a
    /// target; cap then quantize; command the hardware only if the
    /// quantized value differs from the cached one and the master switch
    /// is on.
    fn reconcile(&self, ctx: &mut Context) {
        let soc = self.board.soc_type();
        for module in Module::ALL {
            let mut target = ctx.override_freq(module);
            if target == 0 {
                target = PolicyResolver::auto_clock_hz(&self.config, ctx.application_id, module, ctx.profile);
            }
            if target == 0 {
                continue;
            }

            let cap = max_allowed_hz(module, ctx.profile, soc);
            let table = self.freq_table.get_list(module);
            if table.is_empty() {
                fatal(&self.logger, &format!("empty frequency table for {module:?}"));
            }
            let nearest = nearest_hz(table, target, cap);

            if nearest != ctx.freq(module) && ctx.enabled {
                self.logger.log_line(&format!(
                    "[clk] app={:016x} profile={} {} {} -> {}",
                    ctx.application_id,
                    ctx.profile.code(),
                    module.code(),
                    ctx.freq(module),
                    nearest
                ));
                self.board
                    .set_hz(module, nearest)
                    .unwrap_or_else(|e| fatal(&self.logger, &format!("set_hz({module:?}): {e}")));
                ctx.set_freq(module, nearest);
            }
        }
    }

    /// Samples temperature/power/real-Hz/ram-load unconditionally (never
    /// forces a reconcile, spec.md §9 open question #3), logging each
    /// family at its own configured interval, and writes one CSV row if
    /// the CSV interval has elapsed.
    fn sample_telemetry(&self, ctx: &mut Context) {
        let now_ms = self.now_ms();
        let values = self.config.get_config_values();

        for sensor in ThermalSensor::ALL {
            let milli = self
                .board
                .get_temperature_milli(sensor)
                .unwrap_or_else(|e| fatal(&self.logger, &format!("get_temperature_milli({sensor:?}): {e}")));
            ctx.set_temp(sensor, milli);
        }
        if self.temp_gate.ready(now_ms, values.temp_log_interval_ms) {
            self.logger.log_line(&format!(
                "[temp] soc={} pcb={} skin={}",
                ctx.temp(ThermalSensor::Soc),
                ctx.temp(ThermalSensor::Pcb),
                ctx.temp(ThermalSensor::Skin)
            ));
        }

        for sensor in PowerSensor::ALL {
            let mw = self
                .board
                .get_power_mw(sensor)
                .unwrap_or_else(|e| fatal(&self.logger, &format!("get_power_mw({sensor:?}): {e}")));
            ctx.set_power(sensor, mw);
        }
        if self.power_gate.ready(now_ms, values.power_log_interval_ms) {
            self.logger
                .log_line(&format!("[power] now={} avg={}", ctx.power(PowerSensor::Now), ctx.power(PowerSensor::Avg)));
        }

        for module in Module::ALL {
            let real = self
                .board
                .get_real_hz(module)
                .unwrap_or_else(|e| fatal(&self.logger, &format!("get_real_hz({module:?}): {e}")));
            ctx.set_real_freq(module, real);
        }
        if self.freq_gate.ready(now_ms, values.freq_log_interval_ms) {
            self.logger.log_line(&format!(
                "[freq] cpu={} gpu={} mem={}",
                ctx.real_freq(Module::Cpu),
                ctx.real_freq(Module::Gpu),
                ctx.real_freq(Module::Mem)
            ));
        }

        for which in RamLoad::ALL {
            let pct = self
                .board
                .get_ram_load_pct(which)
                .unwrap_or_else(|e| fatal(&self.logger, &format!("get_ram_load_pct({which:?}): {e}")));
            ctx.set_ram_load(which, pct);
        }

        if self.csv_gate.ready(now_ms, values.csv_write_interval_ms) {
            self.logger.write_context_csv(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::mock::MockBoard;
    use crate::process::mock::MockProcessProbe;
    use crate::types::Profile;

    fn manager(dir: &std::path::Path, board: MockBoard, app_id: u64) -> ClockManager {
        let logger = Arc::new(Logger::new(dir));
        let config = Arc::new(ConfigStore::new(dir.join("config.ini"), logger.clone()));
        config.refresh();
        config.set_enabled(true);
        let board: Arc<dyn BoardDriver> = Arc::new(board);
        let table = FrequencyTable::load(&*board, &logger).unwrap();
        let process = Arc::new(MockProcessProbe::new(app_id));
        let shutdown = Arc::new(AtomicBool::new(false));
        ClockManager::new(board, process, config, table, logger, shutdown)
    }

    fn std_freq_lists() -> [Vec<u32>; 3] {
        [
            vec![612_000_000, 918_000_000, 1_224_000_000, 1_785_000_000],
            vec![307_200_000, 460_800_000, 614_400_000, 768_000_000, 921_600_000],
            vec![204_000_000, 665_600_000, 1_600_000_000],
        ]
    }

    #[test]
    fn scenario_a_override_wins_over_policy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[0100000000abcdef]\ndocked_cpu=1020\n\n[values]\npolling_interval_ms=1\n",
        )
        .unwrap();
        let board = MockBoard::new(std_freq_lists());
        *board.profile.lock().unwrap() = Profile::Docked;
        let mgr = manager(dir.path(), board, 0x0100000000abcdef);
        mgr.get_config().set_override_hz(Module::Cpu, 1_224_000_000);

        mgr.tick();

        assert_eq!(mgr.get_current_context().freq(Module::Cpu), 1_224_000_000);
    }

    #[test]
    fn scenario_c_gpu_cap_enforced_on_mariko() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[0100000000abcdef]\nhandheld_gpu=921\n\n[values]\npolling_interval_ms=1\n",
        )
        .unwrap();
        let board = MockBoard::new(std_freq_lists());
        let mgr = manager(dir.path(), board, 0x0100000000abcdef);

        mgr.tick();

        assert_eq!(mgr.get_current_context().freq(Module::Gpu), 614_400_000);
    }

    #[test]
    fn scenario_b_profile_falls_back_to_handheld_under_usb_charging() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[0100000000abcdef]\nhandheld_gpu=307\n\n[values]\npolling_interval_ms=1\n",
        )
        .unwrap();
        let board = MockBoard::new(std_freq_lists());
        *board.profile.lock().unwrap() = Profile::HandheldChargingUSB;
        let mgr = manager(dir.path(), board, 0x0100000000abcdef);

        mgr.tick();

        assert_eq!(mgr.get_current_context().freq(Module::Gpu), 307_200_000);
    }

    #[test]
    fn scenario_d_live_config_reload_applies_new_value_next_tick() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.ini");
        std::fs::write(
            &config_path,
            "[0100000000abcdef]\ndocked_cpu=1020\n\n[values]\npolling_interval_ms=1\n",
        )
        .unwrap();
        let board = MockBoard::new(std_freq_lists());
        *board.profile.lock().unwrap() = Profile::Docked;
        let mgr = manager(dir.path(), board, 0x0100000000abcdef);

        mgr.tick();
        assert_eq!(mgr.get_current_context().freq(Module::Cpu), 1_020_000_000);

        // Force the mtime forward before rewriting so the poller's
        // metadata comparison actually observes a change.
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(
            &config_path,
            "[0100000000abcdef]\ndocked_cpu=1785\n\n[values]\npolling_interval_ms=1\n",
        )
        .unwrap();

        mgr.tick();

        assert_eq!(mgr.get_current_context().freq(Module::Cpu), 1_785_000_000);
    }

    #[test]
    fn scenario_e_disabled_master_never_calls_set_hz() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[0100000000abcdef]\ndocked_cpu=1020\n\n[values]\npolling_interval_ms=1\n",
        )
        .unwrap();
        let board = MockBoard::new(std_freq_lists());
        *board.profile.lock().unwrap() = Profile::Docked;
        let mgr = manager(dir.path(), board, 0x0100000000abcdef);
        mgr.get_config().set_enabled(false);

        mgr.tick();

        assert_eq!(mgr.get_current_context().freq(Module::Cpu), 0);
    }

    #[test]
    fn idempotent_second_tick_with_no_change_issues_no_set_hz() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[0100000000abcdef]\ndocked_cpu=1020\n\n[values]\npolling_interval_ms=1\n",
        )
        .unwrap();
        let board = MockBoard::new(std_freq_lists());
        *board.profile.lock().unwrap() = Profile::Docked;
        let mgr = manager(dir.path(), board, 0x0100000000abcdef);

        mgr.tick();
        let after_first = mgr.get_current_context().freq(Module::Cpu);
        mgr.tick();
        let after_second = mgr.get_current_context().freq(Module::Cpu);

        assert_eq!(after_first, after_second);
    }
}
