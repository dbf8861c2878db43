//! Process manager probe (spec.md §1, §4.5: out of scope as a
//! collaborator, specified only by the interface the core consumes).
//! Returns the focused application's 64-bit id; 0 means the platform
//! shell is focused.

use std::path::{Path, PathBuf};

pub trait ProcessProbe: Send + Sync {
    fn application_id(&self) -> u64;
}

/// Reads a single hex title id from a runtime-state file maintained by the
/// platform shell, since there's no portable Linux equivalent of Horizon's
/// `pm:dmnt GetApplicationPid`/`GetProgramId`. Missing or unparseable file
/// reads as `0` (shell focused), matching "0 means the platform shell is
/// focused" rather than being treated as a probe failure.
pub struct FileProcessProbe {
    path: PathBuf,
}

impl FileProcessProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileProcessProbe { path: path.into() }
    }

    pub fn at(dir: impl AsRef<Path>) -> Self {
        FileProcessProbe::new(dir.as_ref().join("focused_application_id"))
    }
}

impl ProcessProbe for FileProcessProbe {
    fn application_id(&self) -> u64 {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| u64::from_str_radix(s.trim(), 16).ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
pub mod mock {
    use super::ProcessProbe;
    use std::sync::atomic::{AtomicU64, Ordering};

    pub struct MockProcessProbe(pub AtomicU64);

    impl MockProcessProbe {
        pub fn new(id: u64) -> Self {
            MockProcessProbe(AtomicU64::new(id))
        }
        pub fn set(&self, id: u64) {
            self.0.store(id, Ordering::Relaxed);
        }
    }

    impl ProcessProbe for MockProcessProbe {
        fn application_id(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_shell_focused() {
        let dir = tempfile::tempdir().unwrap();
        let probe = FileProcessProbe::at(dir.path());
        assert_eq!(probe.application_id(), 0);
    }

    #[test]
    fn reads_hex_id_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("focused_application_id"), "0100000000abcdef\n").unwrap();
        let probe = FileProcessProbe::at(dir.path());
        assert_eq!(probe.application_id(), 0x0100000000abcdef);
    }
}
