//! Core data model shared by every component: [`Module`], [`Profile`], the
//! sensor enums, and the [`Context`] snapshot. Mirrors `SysClkModule`,
//! `SysClkProfile` and `SysClkContext` from `original_source/common/include/sysclk/board.h`
//! and `clock_manager.h`.

use serde::{Deserialize, Serialize};

/// A clockable SoC subsystem. Iteration order is declaration order and is
/// load-bearing: every per-module table is indexed by this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Module {
    Cpu,
    Gpu,
    Mem,
}

impl Module {
    pub const ALL: [Module; 3] = [Module::Cpu, Module::Gpu, Module::Mem];

    /// Lowercase canonical code used in INI keys and CSV headers.
    pub fn code(self) -> &'static str {
        match self {
            Module::Cpu => "cpu",
            Module::Gpu => "gpu",
            Module::Mem => "mem",
        }
    }

    pub fn pretty(self) -> &'static str {
        match self {
            Module::Cpu => "CPU",
            Module::Gpu => "GPU",
            Module::Mem => "Memory",
        }
    }

    pub fn from_code(code: &str) -> Option<Module> {
        Module::ALL.into_iter().find(|m| m.code() == code)
    }
}

/// SoC family, read once at startup; affects the GPU handheld cap (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocType {
    Erista,
    Mariko,
}

/// Derived power state. Declaration order doubles as the precedence chain
/// used by the policy resolver (spec.md §3: Handheld < HandheldCharging <
/// HandheldChargingUSB < HandheldChargingOfficial < Docked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Profile {
    Handheld,
    HandheldCharging,
    HandheldChargingUSB,
    HandheldChargingOfficial,
    Docked,
}

impl Profile {
    pub const ALL: [Profile; 5] = [
        Profile::Handheld,
        Profile::HandheldCharging,
        Profile::HandheldChargingUSB,
        Profile::HandheldChargingOfficial,
        Profile::Docked,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Profile::Handheld => "handheld",
            Profile::HandheldCharging => "handheld_charging",
            Profile::HandheldChargingUSB => "handheld_charging_usb",
            Profile::HandheldChargingOfficial => "handheld_charging_official",
            Profile::Docked => "docked",
        }
    }

    pub fn pretty(self) -> &'static str {
        match self {
            Profile::Handheld => "Handheld",
            Profile::HandheldCharging => "Charging",
            Profile::HandheldChargingUSB => "USB Charger",
            Profile::HandheldChargingOfficial => "Official Charger",
            Profile::Docked => "Docked",
        }
    }

    pub fn from_code(code: &str) -> Option<Profile> {
        Profile::ALL.into_iter().find(|p| p.code() == code)
    }

    /// Fallback chain used by the policy resolver, high to low priority
    /// (spec.md §4.3).
    pub fn fallback_chain(self) -> &'static [Profile] {
        match self {
            Profile::Handheld => &[Profile::Handheld],
            Profile::HandheldCharging => &[
                Profile::HandheldChargingUSB,
                Profile::HandheldCharging,
                Profile::Handheld,
            ],
            Profile::HandheldChargingUSB => &[
                Profile::HandheldChargingUSB,
                Profile::HandheldCharging,
                Profile::Handheld,
            ],
            Profile::HandheldChargingOfficial => &[
                Profile::HandheldChargingOfficial,
                Profile::HandheldCharging,
                Profile::Handheld,
            ],
            Profile::Docked => &[Profile::Docked],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThermalSensor {
    Soc,
    Pcb,
    Skin,
}

impl ThermalSensor {
    pub const ALL: [ThermalSensor; 3] = [ThermalSensor::Soc, ThermalSensor::Pcb, ThermalSensor::Skin];

    pub fn code(self) -> &'static str {
        match self {
            ThermalSensor::Soc => "soc",
            ThermalSensor::Pcb => "pcb",
            ThermalSensor::Skin => "skin",
        }
    }

    pub fn pretty(self) -> &'static str {
        match self {
            ThermalSensor::Soc => "SOC",
            ThermalSensor::Pcb => "PCB",
            ThermalSensor::Skin => "Skin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerSensor {
    Now,
    Avg,
}

impl PowerSensor {
    pub const ALL: [PowerSensor; 2] = [PowerSensor::Now, PowerSensor::Avg];

    pub fn code(self) -> &'static str {
        match self {
            PowerSensor::Now => "now",
            PowerSensor::Avg => "avg",
        }
    }
}

/// Ram load is sampled the same way as temperature/power (no forced
/// reconcile). Supplemented from `original_source`'s `SysClkRamLoad`
/// (dropped by the distillation); see SPEC_FULL.md §B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RamLoad {
    All,
    Cpu,
}

impl RamLoad {
    pub const ALL: [RamLoad; 2] = [RamLoad::All, RamLoad::Cpu];

    pub fn code(self) -> &'static str {
        match self {
            RamLoad::All => "ram_all",
            RamLoad::Cpu => "ram_cpu",
        }
    }
}

fn zero_map<T: Default + Copy, const N: usize>() -> [T; N] {
    [T::default(); N]
}

/// The single observable snapshot of the system (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub enabled: bool,
    pub application_id: u64,
    pub profile: Profile,
    pub freqs: [u32; 3],
    pub real_freqs: [u32; 3],
    pub override_freqs: [u32; 3],
    pub temps: [u32; 3],
    pub power: [i32; 2],
    pub ram_load: [u32; 2],
}

impl Default for Context {
    fn default() -> Self {
        Context {
            enabled: false,
            application_id: 0,
            profile: Profile::Handheld,
            freqs: zero_map(),
            real_freqs: zero_map(),
            override_freqs: zero_map(),
            temps: zero_map(),
            power: zero_map(),
            ram_load: zero_map(),
        }
    }
}

impl Context {
    pub fn freq(&self, module: Module) -> u32 {
        self.freqs[module_index(module)]
    }
    pub fn set_freq(&mut self, module: Module, hz: u32) {
        self.freqs[module_index(module)] = hz;
    }
    pub fn real_freq(&self, module: Module) -> u32 {
        self.real_freqs[module_index(module)]
    }
    pub fn set_real_freq(&mut self, module: Module, hz: u32) {
        self.real_freqs[module_index(module)] = hz;
    }
    pub fn override_freq(&self, module: Module) -> u32 {
        self.override_freqs[module_index(module)]
    }
    pub fn set_override_freq(&mut self, module: Module, hz: u32) {
        self.override_freqs[module_index(module)] = hz;
    }
    pub fn temp(&self, sensor: ThermalSensor) -> u32 {
        self.temps[thermal_index(sensor)]
    }
    pub fn set_temp(&mut self, sensor: ThermalSensor, millic: u32) {
        self.temps[thermal_index(sensor)] = millic;
    }
    pub fn power(&self, sensor: PowerSensor) -> i32 {
        self.power[power_index(sensor)]
    }
    pub fn set_power(&mut self, sensor: PowerSensor, mw: i32) {
        self.power[power_index(sensor)] = mw;
    }
    pub fn ram_load(&self, which: RamLoad) -> u32 {
        self.ram_load[ram_index(which)]
    }
    pub fn set_ram_load(&mut self, which: RamLoad, pct: u32) {
        self.ram_load[ram_index(which)] = pct;
    }
}

fn module_index(m: Module) -> usize {
    Module::ALL.iter().position(|x| *x == m).unwrap()
}
fn thermal_index(s: ThermalSensor) -> usize {
    ThermalSensor::ALL.iter().position(|x| *x == s).unwrap()
}
fn power_index(s: PowerSensor) -> usize {
    PowerSensor::ALL.iter().position(|x| *x == s).unwrap()
}
fn ram_index(r: RamLoad) -> usize {
    RamLoad::ALL.iter().position(|x| *x == r).unwrap()
}

/// A 5x3 matrix of MHz values (profile x module). A 0 entry means "no entry
/// for this cell". Owned by IPC callers; persisted with 0 cells omitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TitleProfileList {
    pub mhz: [[u32; 3]; 5],
}

impl Default for TitleProfileList {
    fn default() -> Self {
        TitleProfileList { mhz: [[0; 3]; 5] }
    }
}

impl TitleProfileList {
    pub fn get(&self, profile: Profile, module: Module) -> u32 {
        self.mhz[profile_index(profile)][module_index(module)]
    }
    pub fn set(&mut self, profile: Profile, module: Module, mhz: u32) {
        self.mhz[profile_index(profile)][module_index(module)] = mhz;
    }
}

fn profile_index(p: Profile) -> usize {
    Profile::ALL.iter().position(|x| *x == p).unwrap()
}
