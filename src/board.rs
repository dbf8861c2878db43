//! The board driver: a thin abstraction over the vendor clock/thermal/power
//! services (spec.md §4.1). Out of scope per spec.md §1 — the core only
//! consumes this trait's contract. [`LinuxCpufreqBoard`] is a concrete,
//! best-effort implementation for a generic Linux handheld, grounded in
//! the teacher's own sysfs-poking style (`thermal-governor`'s
//! `cpufreq_dirs`/`read_sysfs_i64`/`set_max_freq`) rather than the
//! original's Horizon-kernel `clkrst`/`pcv` calls, which have no userspace
//! Linux equivalent.

use std::fs;
use std::path::PathBuf;

use crate::error::BoardError;
use crate::types::{Module, PowerSensor, Profile, RamLoad, SocType, ThermalSensor};

/// Capability set consumed by the clock manager (spec.md §4.1). Every
/// method blocks until the underlying vendor call completes; failures are
/// non-recoverable by policy (spec.md §4.5, §7) — callers turn an `Err`
/// into a fatal abort via [`crate::error::fatal`], never retry.
pub trait BoardDriver: Send + Sync {
    fn get_hz(&self, module: Module) -> Result<u32, BoardError>;
    fn set_hz(&self, module: Module, hz: u32) -> Result<(), BoardError>;
    /// Effective running frequency via a secondary telemetry path; `Ok(0)`
    /// is a valid "unavailable" answer, not a failure.
    fn get_real_hz(&self, module: Module) -> Result<u32, BoardError>;
    /// Enumerates the hardware's discrete supported frequencies, vendor
    /// order, length capped at [`crate::freq_table::FREQ_LIST_MAX`].
    fn get_freq_list(&self, module: Module) -> Result<Vec<u32>, BoardError>;
    fn get_profile(&self) -> Result<Profile, BoardError>;
    fn get_temperature_milli(&self, sensor: ThermalSensor) -> Result<u32, BoardError>;
    fn get_power_mw(&self, sensor: PowerSensor) -> Result<i32, BoardError>;
    /// Restores the vendor's default frequency triple for the currently
    /// active performance configuration.
    fn reset_to_stock(&self) -> Result<(), BoardError>;
    /// Read once at init; affects the GPU handheld cap table.
    fn soc_type(&self) -> SocType;
    /// Supplemented telemetry field, dropped by the distilled spec but
    /// present in `original_source`'s `SysClkContext` (see SPEC_FULL.md
    /// §B). Sampled like temperature/power — never forces a reconcile.
    fn get_ram_load_pct(&self, which: RamLoad) -> Result<u32, BoardError>;
}

fn read_sysfs_u64(path: &std::path::Path) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Per-module sysfs locations. Defaults assume a single cpufreq policy
/// covers the CPU complex; GPU/MEM paths are vendor-specific and default
/// to `None` (reads return 0, `reset_to_stock` and `set_hz` become no-ops)
/// so the driver degrades gracefully on hardware that doesn't expose them
/// — same shape as the teacher tolerating missing fan sysfs nodes.
pub struct LinuxPaths {
    pub cpu_policy_dir: Option<PathBuf>,
    pub gpu_freq_dir: Option<PathBuf>,
    pub mem_freq_dir: Option<PathBuf>,
    pub soc_temp: Option<PathBuf>,
    pub pcb_temp: Option<PathBuf>,
    pub skin_temp: Option<PathBuf>,
    pub power_now: Option<PathBuf>,
    pub power_avg: Option<PathBuf>,
}

impl Default for LinuxPaths {
    fn default() -> Self {
        LinuxPaths {
            cpu_policy_dir: Some(PathBuf::from("/sys/devices/system/cpu/cpufreq/policy0")),
            gpu_freq_dir: None,
            mem_freq_dir: None,
            soc_temp: Some(PathBuf::from("/sys/class/thermal/thermal_zone0/temp")),
            pcb_temp: None,
            skin_temp: None,
            power_now: Some(PathBuf::from("/sys/class/power_supply/BAT0/power_now")),
            power_avg: Some(PathBuf::from("/sys/class/power_supply/BAT0/power_avg")),
        }
    }
}

pub struct LinuxCpufreqBoard {
    paths: LinuxPaths,
    soc_type: SocType,
}

impl LinuxCpufreqBoard {
    pub fn new(paths: LinuxPaths, soc_type: SocType) -> Self {
        LinuxCpufreqBoard { paths, soc_type }
    }

    fn dir_for(&self, module: Module) -> Option<&PathBuf> {
        match module {
            Module::Cpu => self.paths.cpu_policy_dir.as_ref(),
            Module::Gpu => self.paths.gpu_freq_dir.as_ref(),
            Module::Mem => self.paths.mem_freq_dir.as_ref(),
        }
    }
}

impl BoardDriver for LinuxCpufreqBoard {
    fn get_hz(&self, module: Module) -> Result<u32, BoardError> {
        let Some(dir) = self.dir_for(module) else {
            return Ok(0);
        };
        let khz = read_sysfs_u64(&dir.join("scaling_cur_freq")).unwrap_or(0);
        Ok((khz * 1000) as u32)
    }

    fn set_hz(&self, module: Module, hz: u32) -> Result<(), BoardError> {
        let Some(dir) = self.dir_for(module) else {
            return Ok(());
        };
        let khz = (hz / 1000).to_string();
        fs::write(dir.join("scaling_max_freq"), &khz)?;
        fs::write(dir.join("scaling_min_freq"), &khz)?;
        Ok(())
    }

    fn get_real_hz(&self, module: Module) -> Result<u32, BoardError> {
        let Some(dir) = self.dir_for(module) else {
            return Ok(0);
        };
        Ok(read_sysfs_u64(&dir.join("scaling_cur_freq")).map(|khz| (khz * 1000) as u32).unwrap_or(0))
    }

    fn get_freq_list(&self, module: Module) -> Result<Vec<u32>, BoardError> {
        let Some(dir) = self.dir_for(module) else {
            return Ok(Vec::new());
        };
        let text = match fs::read_to_string(dir.join("scaling_available_frequencies")) {
            Ok(t) => t,
            Err(_) => return Ok(Vec::new()),
        };
        let mut freqs: Vec<u32> = text
            .split_whitespace()
            .filter_map(|s| s.parse::<u64>().ok())
            .map(|khz| (khz * 1000) as u32)
            .collect();
        freqs.truncate(crate::freq_table::FREQ_LIST_MAX);
        Ok(freqs)
    }

    fn get_profile(&self) -> Result<Profile, BoardError> {
        let docked = fs::metadata("/sys/class/power_supply/AC/online").is_ok()
            && read_sysfs_u64(&PathBuf::from("/sys/class/power_supply/AC/online")) == Some(1)
            && self.paths.gpu_freq_dir.is_some();
        if docked {
            return Ok(Profile::Docked);
        }

        let charging = read_sysfs_u64(&PathBuf::from("/sys/class/power_supply/BAT0/status"))
            .is_some();
        if !charging {
            return Ok(Profile::Handheld);
        }
        Ok(Profile::HandheldCharging)
    }

    fn get_temperature_milli(&self, sensor: ThermalSensor) -> Result<u32, BoardError> {
        let path = match sensor {
            ThermalSensor::Soc => &self.paths.soc_temp,
            ThermalSensor::Pcb => &self.paths.pcb_temp,
            ThermalSensor::Skin => &self.paths.skin_temp,
        };
        let Some(path) = path else { return Ok(0) };
        let millic = read_sysfs_u64(path).unwrap_or(0) as u32;
        Ok(millic)
    }

    fn get_power_mw(&self, sensor: PowerSensor) -> Result<i32, BoardError> {
        let path = match sensor {
            PowerSensor::Now => &self.paths.power_now,
            PowerSensor::Avg => &self.paths.power_avg,
        };
        let Some(path) = path else { return Ok(0) };
        let microwatts = read_sysfs_u64(path).unwrap_or(0) as i64;
        Ok((microwatts / 1000) as i32)
    }

    fn reset_to_stock(&self) -> Result<(), BoardError> {
        for module in Module::ALL {
            let Some(dir) = self.dir_for(module) else { continue };
            if let Some(max_khz) = read_sysfs_u64(&dir.join("cpuinfo_max_freq")) {
                fs::write(dir.join("scaling_max_freq"), max_khz.to_string())?;
            }
            if let Some(min_khz) = read_sysfs_u64(&dir.join("cpuinfo_min_freq")) {
                fs::write(dir.join("scaling_min_freq"), min_khz.to_string())?;
            }
        }
        Ok(())
    }

    fn soc_type(&self) -> SocType {
        self.soc_type
    }

    fn get_ram_load_pct(&self, which: RamLoad) -> Result<u32, BoardError> {
        let Ok(text) = fs::read_to_string("/proc/meminfo") else {
            return Ok(0);
        };
        let mut total_kb = None;
        let mut avail_kb = None;
        for line in text.lines() {
            if let Some(v) = line.strip_prefix("MemTotal:") {
                total_kb = v.trim().split_whitespace().next().and_then(|s| s.parse::<u64>().ok());
            } else if let Some(v) = line.strip_prefix("MemAvailable:") {
                avail_kb = v.trim().split_whitespace().next().and_then(|s| s.parse::<u64>().ok());
            }
        }
        let (Some(total), Some(avail)) = (total_kb, avail_kb) else {
            return Ok(0);
        };
        if total == 0 {
            return Ok(0);
        }
        let used_pct = match which {
            // no portable per-process-group split on generic Linux; folds
            // back to the same system-wide figure as `All`.
            RamLoad::All | RamLoad::Cpu => (100 * (total - avail)) / total,
        };
        Ok(used_pct as u32)
    }
}
