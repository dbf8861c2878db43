//! Policy resolver: `(app_id, profile, module) → target Hz` with
//! profile-inheritance fallbacks (spec.md §4.3).

use crate::config::ConfigStore;
use crate::types::{Module, Profile};

pub struct PolicyResolver;

impl PolicyResolver {
    /// Returns Hz (store MHz × 1_000_000), or 0 meaning "no entry, do not
    /// override the platform default" (spec.md §4.3). Walks `profile`'s
    /// fallback chain high to low priority, first non-zero wins.
    pub fn auto_clock_hz(config: &ConfigStore, app_id: u64, module: Module, profile: Profile) -> u32 {
        for candidate in profile.fallback_chain() {
            let mhz = config.find_clock_mhz(app_id, module, *candidate);
            if mhz != 0 {
                return mhz * 1_000_000;
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Logger;
    use std::sync::Arc;

    fn store_with(dir: &std::path::Path, entries: &str) -> ConfigStore {
        std::fs::write(dir.join("config.ini"), entries).unwrap();
        let cfg = ConfigStore::new(dir.join("config.ini"), Arc::new(Logger::new(dir)));
        cfg.refresh();
        cfg
    }

    #[test]
    fn exact_profile_entry_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store_with(dir.path(), "[0100000000abcdef]\ndocked_cpu=1020\n");
        let hz = PolicyResolver::auto_clock_hz(&cfg, 0x0100000000abcdef, Module::Cpu, Profile::Docked);
        assert_eq!(hz, 1_020_000_000);
    }

    #[test]
    fn falls_back_to_handheld_charging_usb_to_handheld() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store_with(dir.path(), "[0100000000abcdef]\nhandheld_gpu=307\n");
        let hz = PolicyResolver::auto_clock_hz(&cfg, 0x0100000000abcdef, Module::Gpu, Profile::HandheldChargingUSB);
        assert_eq!(hz, 307_000_000);
    }

    #[test]
    fn more_specific_entry_takes_priority_over_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store_with(
            dir.path(),
            "[0100000000abcdef]\nhandheld_gpu=307\nhandheld_charging_usb_gpu=600\n",
        );
        let hz = PolicyResolver::auto_clock_hz(&cfg, 0x0100000000abcdef, Module::Gpu, Profile::HandheldChargingUSB);
        assert_eq!(hz, 600_000_000);
    }

    #[test]
    fn no_entry_anywhere_in_chain_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store_with(dir.path(), "[0100000000abcdef]\ndocked_cpu=1020\n");
        let hz = PolicyResolver::auto_clock_hz(&cfg, 0x0100000000abcdef, Module::Gpu, Profile::Handheld);
        assert_eq!(hz, 0);
    }

    #[test]
    fn unknown_app_id_returns_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store_with(dir.path(), "[0100000000abcdef]\ndocked_cpu=1020\n");
        let hz = PolicyResolver::auto_clock_hz(&cfg, 0xdead, Module::Cpu, Profile::Docked);
        assert_eq!(hz, 0);
    }
}
