//! `ConfigValueList`: the finite set of global tunables stored under the
//! synthetic `[values]` INI section (spec.md §3, §6).

use serde::{Deserialize, Serialize};

/// One entry per tunable. `key()` is the INI key; each has its own
/// `is_valid`/`default`, enforced independently on load (spec.md §4.6
/// step 5: "invalid values silently fall back to default").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigValueKey {
    CsvWriteIntervalMs,
    TempLogIntervalMs,
    FreqLogIntervalMs,
    PowerLogIntervalMs,
    PollingIntervalMs,
}

impl ConfigValueKey {
    pub const ALL: [ConfigValueKey; 5] = [
        ConfigValueKey::CsvWriteIntervalMs,
        ConfigValueKey::TempLogIntervalMs,
        ConfigValueKey::FreqLogIntervalMs,
        ConfigValueKey::PowerLogIntervalMs,
        ConfigValueKey::PollingIntervalMs,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ConfigValueKey::CsvWriteIntervalMs => "csv_write_interval_ms",
            ConfigValueKey::TempLogIntervalMs => "temp_log_interval_ms",
            ConfigValueKey::FreqLogIntervalMs => "freq_log_interval_ms",
            ConfigValueKey::PowerLogIntervalMs => "power_log_interval_ms",
            ConfigValueKey::PollingIntervalMs => "polling_interval_ms",
        }
    }

    pub fn from_key(key: &str) -> Option<ConfigValueKey> {
        ConfigValueKey::ALL.into_iter().find(|k| k.key() == key)
    }

    pub fn default_value(self) -> u64 {
        match self {
            ConfigValueKey::CsvWriteIntervalMs => 0,
            ConfigValueKey::TempLogIntervalMs => 0,
            ConfigValueKey::FreqLogIntervalMs => 0,
            ConfigValueKey::PowerLogIntervalMs => 0,
            // 0 is invalid for this one; the vendor-chosen steady cadence.
            ConfigValueKey::PollingIntervalMs => 1000,
        }
    }

    pub fn is_valid(self, v: u64) -> bool {
        match self {
            ConfigValueKey::PollingIntervalMs => v > 0,
            _ => true,
        }
    }
}

/// Copyable snapshot of all tunables, indexed by [`ConfigValueKey`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfigValueList {
    pub csv_write_interval_ms: u64,
    pub temp_log_interval_ms: u64,
    pub freq_log_interval_ms: u64,
    pub power_log_interval_ms: u64,
    pub polling_interval_ms: u64,
}

impl Default for ConfigValueList {
    fn default() -> Self {
        ConfigValueList {
            csv_write_interval_ms: ConfigValueKey::CsvWriteIntervalMs.default_value(),
            temp_log_interval_ms: ConfigValueKey::TempLogIntervalMs.default_value(),
            freq_log_interval_ms: ConfigValueKey::FreqLogIntervalMs.default_value(),
            power_log_interval_ms: ConfigValueKey::PowerLogIntervalMs.default_value(),
            polling_interval_ms: ConfigValueKey::PollingIntervalMs.default_value(),
        }
    }
}

impl ConfigValueList {
    pub fn get(&self, key: ConfigValueKey) -> u64 {
        match key {
            ConfigValueKey::CsvWriteIntervalMs => self.csv_write_interval_ms,
            ConfigValueKey::TempLogIntervalMs => self.temp_log_interval_ms,
            ConfigValueKey::FreqLogIntervalMs => self.freq_log_interval_ms,
            ConfigValueKey::PowerLogIntervalMs => self.power_log_interval_ms,
            ConfigValueKey::PollingIntervalMs => self.polling_interval_ms,
        }
    }

    pub fn set(&mut self, key: ConfigValueKey, v: u64) {
        match key {
            ConfigValueKey::CsvWriteIntervalMs => self.csv_write_interval_ms = v,
            ConfigValueKey::TempLogIntervalMs => self.temp_log_interval_ms = v,
            ConfigValueKey::FreqLogIntervalMs => self.freq_log_interval_ms = v,
            ConfigValueKey::PowerLogIntervalMs => self.power_log_interval_ms = v,
            ConfigValueKey::PollingIntervalMs => self.polling_interval_ms = v,
        }
    }

    /// Returns `true` and applies `v` if valid; otherwise leaves the
    /// current value untouched and returns `false` (used wholesale by
    /// `SetConfigValues`, which rejects the whole batch on one bad entry).
    pub fn try_set(&mut self, key: ConfigValueKey, v: u64) -> bool {
        if !key.is_valid(v) {
            return false;
        }
        self.set(key, v);
        true
    }

    pub fn all_valid(&self) -> bool {
        ConfigValueKey::ALL
            .into_iter()
            .all(|k| k.is_valid(self.get(k)))
    }
}
