//! Error types. Grounded in the `ConfigError` pattern from
//! `other_examples/.../watt/src/config.rs` (plain enum, manual `Display`,
//! no `thiserror`) rather than the teacher's ad-hoc `unwrap_or_else`,
//! because our failure surface (board, config IO, IPC validation) is wide
//! enough to want a named type. Board-driver failures are **not** part of
//! this enum: per spec.md §7 they are fatal and go through [`fatal`]/
//! [`fatal!`] instead of being returned.

use std::fmt;

/// Wire-compatible error code for the IPC layer (spec.md §6:
/// `module=388, code in {0,1,2}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IpcErrorCode {
    Generic = 0,
    ConfigNotLoaded = 1,
    ConfigSaveFailed = 2,
}

pub const IPC_ERROR_MODULE: u16 = 388;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IpcError {
    pub module: u16,
    pub code: IpcErrorCode,
}

impl IpcError {
    pub fn new(code: IpcErrorCode) -> Self {
        IpcError {
            module: IPC_ERROR_MODULE,
            code,
        }
    }
}

impl fmt::Display for IpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:?})", self.module, self.code)
    }
}

impl std::error::Error for IpcError {}

/// A board driver call failed. This type exists only to carry a message
/// into [`fatal`] — per spec.md §4.5/§7 there is no recovery path, so it
/// is never matched on by callers, only logged and turned into a panic.
#[derive(Debug)]
pub struct BoardError(pub String);

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BoardError {}

impl From<std::io::Error> for BoardError {
    fn from(e: std::io::Error) -> Self {
        BoardError(e.to_string())
    }
}

/// Logs `msg` (with file+line, per spec.md §7) and aborts the daemon.
/// Board-driver failures, impossible enum values, and impossible
/// `(module, profile)` cap lookups all go through here.
#[track_caller]
pub fn fatal(logger: &crate::telemetry::Logger, msg: &str) -> ! {
    let loc = std::panic::Location::caller();
    logger.log_line(&format!("[!] FATAL {msg} ({}:{})", loc.file(), loc.line()));
    panic!("{msg} ({}:{})", loc.file(), loc.line());
}
