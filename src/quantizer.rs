//! `nearest_hz` and the safety-cap table (spec.md §3, §4.4).

use crate::types::{Module, Profile, SocType};

/// GPU handheld cap, one value per SoC family (spec.md §3).
const GPU_HANDHELD_CAP_MARIKO: u32 = 614_400_000;
const GPU_HANDHELD_CAP_ERISTA: u32 = 460_800_000;
const GPU_USB_CHARGING_CAP: u32 = 768_000_000;

/// Pure function, no board access: 0 means "no cap".
pub fn max_allowed_hz(module: Module, profile: Profile, soc: SocType) -> u32 {
    if module != Module::Gpu {
        return 0;
    }
    match profile {
        Profile::Handheld | Profile::HandheldCharging => match soc {
            SocType::Mariko => GPU_HANDHELD_CAP_MARIKO,
            SocType::Erista => GPU_HANDHELD_CAP_ERISTA,
        },
        Profile::HandheldChargingUSB => GPU_USB_CHARGING_CAP,
        Profile::HandheldChargingOfficial | Profile::Docked => 0,
    }
}

/// Walks `table` (ascending) and returns the quantized value (spec.md
/// §4.4). `table` must be non-empty; an empty table is a startup-time
/// impossibility turned fatal by the caller, not handled here.
pub fn nearest_hz(table: &[u32], in_hz: u32, max_hz: u32) -> u32 {
    debug_assert!(!table.is_empty());
    for (i, &entry) in table.iter().enumerate() {
        if max_hz > 0 && entry >= max_hz {
            return entry;
        }
        let is_last = i + 1 == table.len();
        if is_last {
            return entry;
        }
        let next = table[i + 1];
        // 64-bit widening avoids overflow for the sum of two u32 Hz values.
        let midpoint = (entry as u64 + next as u64) / 2;
        if (in_hz as u64) <= midpoint {
            return entry;
        }
    }
    unreachable!("table is non-empty, loop always returns")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: [u32; 4] = [204_000_000, 307_200_000, 460_800_000, 768_000_000];

    #[test]
    fn single_element_table_always_returns_it() {
        assert_eq!(nearest_hz(&[500_000_000], 0, 0), 500_000_000);
        assert_eq!(nearest_hz(&[500_000_000], 999_000_000, 0), 500_000_000);
        assert_eq!(nearest_hz(&[500_000_000], 1, 100), 500_000_000);
    }

    #[test]
    fn zero_in_hz_returns_smallest() {
        assert_eq!(nearest_hz(&TABLE, 0, 0), TABLE[0]);
    }

    #[test]
    fn exact_midpoint_returns_higher_entry() {
        let mid = (TABLE[1] as u64 + TABLE[2] as u64) / 2;
        assert_eq!(nearest_hz(&TABLE, mid as u32, 0), TABLE[1]);
        assert_eq!(nearest_hz(&TABLE, mid as u32 + 1, 0), TABLE[2]);
    }

    #[test]
    fn last_entry_is_ceiling() {
        assert_eq!(nearest_hz(&TABLE, 10_000_000_000, 0), *TABLE.last().unwrap());
    }

    #[test]
    fn monotone_in_in_hz() {
        let mut prev = 0;
        for hz in (0..1_000_000_000u32).step_by(10_000_000) {
            let out = nearest_hz(&TABLE, hz, 0);
            assert!(out >= prev);
            prev = out;
        }
    }

    #[test]
    fn cap_returns_first_entry_at_or_above_cap_even_if_it_overshoots() {
        // cap sits exactly between two entries; still returns the entry >= cap.
        let cap = TABLE[1] + 1;
        assert_eq!(nearest_hz(&TABLE, TABLE[1], cap), TABLE[2]);
    }

    #[test]
    fn uncapped_result_is_always_in_table() {
        for hz in (0..2_000_000_000u32).step_by(37_000_000) {
            assert!(TABLE.contains(&nearest_hz(&TABLE, hz, 0)));
        }
    }

    #[test]
    fn gpu_handheld_cap_depends_on_soc() {
        assert_eq!(max_allowed_hz(Module::Gpu, Profile::Handheld, SocType::Mariko), GPU_HANDHELD_CAP_MARIKO);
        assert_eq!(max_allowed_hz(Module::Gpu, Profile::Handheld, SocType::Erista), GPU_HANDHELD_CAP_ERISTA);
    }

    #[test]
    fn gpu_usb_charging_cap_is_fixed() {
        assert_eq!(max_allowed_hz(Module::Gpu, Profile::HandheldChargingUSB, SocType::Mariko), GPU_USB_CHARGING_CAP);
    }

    #[test]
    fn non_gpu_modules_are_uncapped() {
        assert_eq!(max_allowed_hz(Module::Cpu, Profile::Handheld, SocType::Mariko), 0);
        assert_eq!(max_allowed_hz(Module::Mem, Profile::Docked, SocType::Erista), 0);
    }

    #[test]
    fn docked_and_official_charging_gpu_uncapped() {
        assert_eq!(max_allowed_hz(Module::Gpu, Profile::Docked, SocType::Mariko), 0);
        assert_eq!(max_allowed_hz(Module::Gpu, Profile::HandheldChargingOfficial, SocType::Mariko), 0);
    }
}
