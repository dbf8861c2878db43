//! Cooperative, session-capped command/reply service (spec.md §4.8).
//!
//! The original transport is a Horizon kernel IPC session
//! (`ipcServerInit`/`ipcServerProcess`), a Switch-only primitive. Per
//! SPEC_FULL.md §A.4 we re-home it on a Unix domain socket with
//! newline-delimited JSON framing (`serde_json`, the same crate the
//! teacher already pulls in for its own state file), keeping every tested
//! semantic: fixed endpoint name, a userspace session cap, cooperative
//! cancellation, one request/response per connection.

pub mod client;
pub mod server;

use serde::{Deserialize, Serialize};

use crate::config::ConfigValueList;
use crate::error::IpcError;
use crate::types::{Context, Module, TitleProfileList};

pub const API_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "args")]
pub enum Request {
    GetApiVersion,
    GetVersionString,
    GetCurrentContext,
    Exit,
    GetProfileCount { tid: u64 },
    GetProfiles { tid: u64 },
    SetProfiles { tid: u64, profiles: TitleProfileList },
    SetEnabled { enabled: bool },
    SetOverride { module: Module, hz: u32 },
    GetConfigValues,
    SetConfigValues { values: ConfigValueList },
    GetFreqList { module: Module, max_count: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    ApiVersion(u32),
    VersionString(String),
    Context(Context),
    Unit,
    ProfileCount(u8),
    Profiles(TitleProfileList),
    ConfigValues(ConfigValueList),
    FreqList(Vec<u32>),
    Error(IpcError),
}
