//! The config store: INI-backed persistence with live reload via
//! modification-time polling (spec.md §4.6). Mirrors
//! `original_source/sysmodule/src/config.cpp`'s `Config` class, split here
//! into a generic [`ini`] reader/writer and the semantic validation that
//! used to live in `BrowseIniFunc`.

pub mod ini;
pub mod values;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::telemetry::Logger;
use crate::types::{Module, Profile, TitleProfileList};
pub use values::{ConfigValueKey, ConfigValueList};

type ProfileKey = (u64, Profile, Module);

struct Inner {
    mtime: Option<SystemTime>,
    loaded: bool,
    profile_map: HashMap<ProfileKey, u32>,
    profile_count: HashMap<u64, u8>,
    config_values: ConfigValueList,
}

impl Inner {
    fn empty() -> Self {
        Inner {
            mtime: None,
            loaded: false,
            profile_map: HashMap::new(),
            profile_count: HashMap::new(),
            config_values: ConfigValueList::default(),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    inner: Mutex<Inner>,
    overrides: Mutex<[u32; 3]>,
    enabled: AtomicBool,
    logger: Arc<Logger>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, logger: Arc<Logger>) -> Self {
        ConfigStore {
            path: path.into(),
            inner: Mutex::new(Inner::empty()),
            overrides: Mutex::new([0; 3]),
            enabled: AtomicBool::new(false),
            logger,
        }
    }

    fn modification_time(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    /// Reloads if the file's mtime differs from the cached one, or if it
    /// has never been loaded. Returns whether a reload occurred.
    pub fn refresh(&self) -> bool {
        let current_mtime = self.modification_time();
        let needs_reload = {
            let inner = self.inner.lock().unwrap();
            !inner.loaded || inner.mtime != current_mtime
        };
        if needs_reload {
            self.load(current_mtime);
            true
        } else {
            false
        }
    }

    fn load(&self, mtime: Option<SystemTime>) {
        self.logger.log_line(&format!("[cfg] reading {}", self.path.display()));

        let mut inner = self.inner.lock().unwrap();
        inner.profile_map.clear();
        inner.profile_count.clear();
        inner.config_values = ConfigValueList::default();

        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(_) => {
                self.logger.log_line("[cfg] Error finding file");
                inner.mtime = mtime;
                inner.loaded = true;
                return;
            }
        };

        for entry in ini::parse(&text) {
            if entry.section == "values" {
                self.apply_config_value(&mut inner, &entry.key, &entry.value);
            } else {
                self.apply_profile_entry(&mut inner, &entry.section, &entry.key, &entry.value);
            }
        }

        inner.mtime = mtime;
        inner.loaded = true;
    }

    fn apply_config_value(&self, inner: &mut Inner, key: &str, value: &str) {
        let Some(k) = ConfigValueKey::from_key(key) else {
            self.logger.log_line(&format!("[cfg] Skipping key '{key}' in section 'values': Unrecognized key"));
            return;
        };
        let Ok(v) = value.parse::<u64>() else {
            self.logger.log_line(&format!("[cfg] Skipping key '{key}' in section 'values': Invalid value"));
            return;
        };
        if !inner.config_values.try_set(k, v) {
            self.logger.log_line(&format!("[cfg] Ignoring invalid value for '{key}': falling back to default"));
        }
    }

    fn apply_profile_entry(&self, inner: &mut Inner, section: &str, key: &str, value: &str) {
        let tid = u64::from_str_radix(section, 16).ok();
        if section.len() != 16 || tid.is_none() || tid == Some(0) {
            self.logger.log_line(&format!("[cfg] Skipping key '{key}' in section '{section}': Invalid TitleID"));
            return;
        }
        let tid = tid.unwrap();

        let mut parsed: Option<(Profile, Module)> = None;
        for profile in Profile::ALL {
            let code = profile.code();
            if let Some(rest) = key.strip_prefix(code) {
                if let Some(subkey) = rest.strip_prefix('_') {
                    if let Some(module) = Module::from_code(subkey) {
                        parsed = Some((profile, module));
                    }
                }
            }
        }

        let Some((profile, module)) = parsed else {
            self.logger.log_line(&format!("[cfg] Skipping key '{key}' in section '{section}': Unrecognized key"));
            return;
        };

        let mhz = value.parse::<u32>().unwrap_or(0);
        if mhz == 0 {
            self.logger.log_line(&format!("[cfg] Skipping key '{key}' in section '{section}': Invalid value"));
            return;
        }

        inner.profile_map.insert((tid, profile, module), mhz);
        *inner.profile_count.entry(tid).or_insert(0) += 1;
    }

    pub fn has_loaded(&self) -> bool {
        self.inner.lock().unwrap().loaded
    }

    pub(crate) fn find_clock_mhz(&self, tid: u64, module: Module, profile: Profile) -> u32 {
        let inner = self.inner.lock().unwrap();
        if !inner.loaded {
            return 0;
        }
        inner.profile_map.get(&(tid, profile, module)).copied().unwrap_or(0)
    }

    pub fn profile_count(&self, tid: u64) -> u8 {
        let inner = self.inner.lock().unwrap();
        inner.profile_count.get(&tid).copied().unwrap_or(0)
    }

    pub fn get_profiles(&self, tid: u64) -> TitleProfileList {
        let inner = self.inner.lock().unwrap();
        let mut out = TitleProfileList::default();
        for profile in Profile::ALL {
            for module in Module::ALL {
                let mhz = inner.profile_map.get(&(tid, profile, module)).copied().unwrap_or(0);
                out.set(profile, module, mhz);
            }
        }
        out
    }

    /// Replaces all 15 `(tid, profile, module)` entries: MHz > 0 inserts,
    /// MHz == 0 removes. Optionally persists atomically to the INI file.
    pub fn set_profiles(&self, tid: u64, profiles: TitleProfileList, persist: bool) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            let mut count = 0u8;
            for profile in Profile::ALL {
                for module in Module::ALL {
                    let mhz = profiles.get(profile, module);
                    let key = (tid, profile, module);
                    if mhz > 0 {
                        inner.profile_map.insert(key, mhz);
                    } else {
                        inner.profile_map.remove(&key);
                    }
                }
            }
            for profile in Profile::ALL {
                for module in Module::ALL {
                    if inner.profile_map.contains_key(&(tid, profile, module)) {
                        count += 1;
                    }
                }
            }
            if count > 0 {
                inner.profile_count.insert(tid, count);
            } else {
                inner.profile_count.remove(&tid);
            }
        }

        if persist {
            self.persist()
        } else {
            true
        }
    }

    pub fn get_config_values(&self) -> ConfigValueList {
        self.inner.lock().unwrap().config_values
    }

    pub fn set_config_values(&self, values: ConfigValueList, persist: bool) -> bool {
        if !values.all_valid() {
            return false;
        }
        {
            let mut inner = self.inner.lock().unwrap();
            inner.config_values = values;
        }
        if persist {
            self.persist()
        } else {
            true
        }
    }

    fn persist(&self) -> bool {
        let inner = self.inner.lock().unwrap();

        let mut by_tid: HashMap<u64, Vec<(String, String)>> = HashMap::new();
        for (&(tid, profile, module), &mhz) in inner.profile_map.iter() {
            by_tid
                .entry(tid)
                .or_default()
                .push((format!("{}_{}", profile.code(), module.code()), mhz.to_string()));
        }

        let mut section_names: Vec<u64> = by_tid.keys().copied().collect();
        section_names.sort_unstable();

        let mut rendered = String::new();
        for tid in section_names {
            let name = format!("{tid:016x}");
            let mut entries = by_tid.remove(&tid).unwrap_or_default();
            entries.sort();
            rendered.push_str(&ini::serialize([(name.as_str(), entries)]));
        }

        let values = &inner.config_values;
        let value_entries = vec![
            (ConfigValueKey::CsvWriteIntervalMs.key().to_string(), values.csv_write_interval_ms.to_string()),
            (ConfigValueKey::TempLogIntervalMs.key().to_string(), values.temp_log_interval_ms.to_string()),
            (ConfigValueKey::FreqLogIntervalMs.key().to_string(), values.freq_log_interval_ms.to_string()),
            (ConfigValueKey::PowerLogIntervalMs.key().to_string(), values.power_log_interval_ms.to_string()),
            (ConfigValueKey::PollingIntervalMs.key().to_string(), values.polling_interval_ms.to_string()),
        ];
        rendered.push_str(&ini::serialize([("values", value_entries)]));

        match ini::atomic_write(&self.path, &rendered) {
            Ok(()) => true,
            Err(e) => {
                self.logger.log_line(&format!("[cfg] Error saving file: {e}"));
                false
            }
        }
    }

    pub fn set_override_hz(&self, module: Module, hz: u32) {
        let mut overrides = self.overrides.lock().unwrap();
        overrides[module_index(module)] = hz;
    }

    pub fn override_hz(&self, module: Module) -> u32 {
        let overrides = self.overrides.lock().unwrap();
        overrides[module_index(module)]
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn module_index(m: Module) -> usize {
    Module::ALL.iter().position(|x| *x == m).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Module, Profile};

    fn store(dir: &std::path::Path) -> ConfigStore {
        let logger = Arc::new(Logger::new(dir));
        ConfigStore::new(dir.join("config.ini"), logger)
    }

    #[test]
    fn load_reads_profiles_and_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[0100000000abcdef]\ndocked_cpu=1020\nhandheld_gpu=307\n\n[values]\npolling_interval_ms=300\n",
        )
        .unwrap();

        let cfg = store(dir.path());
        assert!(cfg.refresh());
        assert!(cfg.has_loaded());
        assert_eq!(cfg.find_clock_mhz(0x0100000000abcdef, Module::Cpu, Profile::Docked), 1020);
        assert_eq!(cfg.find_clock_mhz(0x0100000000abcdef, Module::Gpu, Profile::Handheld), 307);
        assert_eq!(cfg.get_config_values().polling_interval_ms, 300);
        assert_eq!(cfg.profile_count(0x0100000000abcdef), 2);
    }

    #[test]
    fn missing_file_leaves_store_unloaded_state_but_marks_loaded_true() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store(dir.path());
        assert!(cfg.refresh());
        // Per original_source: a missing file still flips `loaded`, but the
        // maps stay empty, so every lookup returns 0.
        assert_eq!(cfg.find_clock_mhz(1, Module::Cpu, Profile::Docked), 0);
    }

    #[test]
    fn invalid_section_and_zero_values_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.ini"),
            "[not-hex]\ndocked_cpu=1000\n\n[0100000000000001]\ndocked_cpu=0\nbogus_key=5\n",
        )
        .unwrap();
        let cfg = store(dir.path());
        cfg.refresh();
        assert_eq!(cfg.profile_count(0x0100000000000001), 0);
    }

    #[test]
    fn set_profiles_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store(dir.path());
        cfg.refresh();

        let mut profiles = TitleProfileList::default();
        profiles.set(Profile::Docked, Module::Cpu, 1785);
        profiles.set(Profile::Handheld, Module::Gpu, 460);
        assert!(cfg.set_profiles(0x0100000000000042, profiles, true));

        let cfg2 = store(dir.path());
        assert!(cfg2.refresh());
        let round_tripped = cfg2.get_profiles(0x0100000000000042);
        assert_eq!(round_tripped.get(Profile::Docked, Module::Cpu), 1785);
        assert_eq!(round_tripped.get(Profile::Handheld, Module::Gpu), 460);
        assert_eq!(round_tripped.get(Profile::Docked, Module::Gpu), 0);
    }

    #[test]
    fn set_config_values_rejects_invalid_batch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store(dir.path());
        let mut values = ConfigValueList::default();
        values.polling_interval_ms = 0;
        assert!(!cfg.set_config_values(values, false));
        assert_eq!(cfg.get_config_values().polling_interval_ms, ConfigValueKey::PollingIntervalMs.default_value());
    }

    #[test]
    fn override_and_enabled_are_runtime_only() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store(dir.path());
        cfg.set_override_hz(Module::Cpu, 1224000000);
        assert_eq!(cfg.override_hz(Module::Cpu), 1224000000);
        cfg.set_enabled(true);
        assert!(cfg.enabled());
    }
}
