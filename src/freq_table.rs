//! Per-module table of assignable frequencies (spec.md §3, §4.2). Loaded
//! once at startup from [`crate::board::BoardDriver::get_freq_list`] and
//! never refreshed — the hardware's supported list is immutable per boot.

use crate::board::BoardDriver;
use crate::error::BoardError;
use crate::types::Module;

/// Matches the original's `SysClkTableHz` buffer bound.
pub const FREQ_LIST_MAX: usize = 32;

fn is_assignable(module: Module, hz: u32) -> bool {
    match module {
        Module::Cpu => hz >= 612_000_000,
        Module::Mem => hz == 204_000_000 || hz >= 665_600_000,
        Module::Gpu => true,
    }
}

/// Ascending, per-module, length capped at [`FREQ_LIST_MAX`].
pub struct FrequencyTable {
    tables: [Vec<u32>; 3],
}

impl FrequencyTable {
    /// Queries `board` once per module and keeps only assignable entries,
    /// preserving the hardware's reported order (ascending, per spec.md
    /// §4.2). Logs each accepted frequency, mirroring
    /// `ClockManager::RefreshFreqTableRow` in `original_source`.
    pub fn load(board: &dyn BoardDriver, logger: &crate::telemetry::Logger) -> Result<Self, BoardError> {
        let mut tables: [Vec<u32>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        for module in Module::ALL {
            let raw = board.get_freq_list(module)?;
            let mut filtered: Vec<u32> = raw.into_iter().filter(|hz| is_assignable(module, *hz)).collect();
            filtered.truncate(FREQ_LIST_MAX);
            for hz in &filtered {
                logger.log_line(&format!("[freq] {} table += {hz}", module.code()));
            }
            tables[index(module)] = filtered;
        }
        Ok(FrequencyTable { tables })
    }

    pub fn get_list(&self, module: Module) -> &[u32] {
        &self.tables[index(module)]
    }
}

fn index(m: Module) -> usize {
    Module::ALL.iter().position(|x| *x == m).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_cpu_below_minimum() {
        assert!(!is_assignable(Module::Cpu, 408_000_000));
        assert!(is_assignable(Module::Cpu, 612_000_000));
    }

    #[test]
    fn filters_mem_to_named_values() {
        assert!(is_assignable(Module::Mem, 204_000_000));
        assert!(!is_assignable(Module::Mem, 300_000_000));
        assert!(is_assignable(Module::Mem, 665_600_000));
        assert!(is_assignable(Module::Mem, 1_600_000_000));
    }

    #[test]
    fn gpu_accepts_everything() {
        assert!(is_assignable(Module::Gpu, 1));
    }

    #[test]
    fn load_truncates_and_preserves_order() {
        let lists = [
            (0..40).map(|i| 612_000_000 + i * 1000).collect(),
            vec![307_200_000, 460_800_000, 768_000_000],
            vec![204_000_000, 665_600_000, 1_600_000_000],
        ];
        let board = crate::board::mock::MockBoard::new(lists);
        let logger = crate::telemetry::Logger::new(tempfile::tempdir().unwrap().path());
        let table = FrequencyTable::load(&board, &logger).unwrap();
        assert_eq!(table.get_list(Module::Cpu).len(), FREQ_LIST_MAX);
        assert_eq!(table.get_list(Module::Gpu), &[307_200_000, 460_800_000, 768_000_000]);
    }
}
