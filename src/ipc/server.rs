//! Accept loop + request dispatch (spec.md §4.8, §4.9, §5).

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock_manager::ClockManager;
use crate::error::{IpcError, IpcErrorCode};
use crate::ipc::{Request, Response};
use crate::telemetry::Logger;

/// Implementation-chosen cap (spec.md §4.8: "42 concurrent sessions").
const MAX_SESSIONS: usize = 42;
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
    manager: Arc<ClockManager>,
    logger: Arc<Logger>,
    /// Same "shutdown requested" latch as `ClockManager` and the signal
    /// handler (`lifecycle::install_signal_handler`) — starts `false`,
    /// only ever set `true`.
    shutdown: Arc<AtomicBool>,
    session_count: Arc<AtomicUsize>,
}

impl IpcServer {
    /// Binds the fixed-name endpoint, removing any stale socket file left
    /// by a previous run first.
    pub fn bind(
        socket_path: impl Into<PathBuf>,
        manager: Arc<ClockManager>,
        logger: Arc<Logger>,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let socket_path = socket_path.into();
        let _ = fs::remove_file(&socket_path);
        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(&socket_path)?;
        listener.set_nonblocking(true)?;
        Ok(IpcServer {
            listener,
            socket_path,
            manager,
            logger,
            shutdown,
            session_count: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accepts and services connections until `shutdown` is set, either by
    /// the `Exit` command or by a SIGTERM/SIGINT caught by the outer
    /// lifecycle. Cancellation is cooperative: the accept call is
    /// non-blocking and polled, so no second OS-level signal path is
    /// needed to interrupt a blocking accept.
    pub fn serve(&self) {
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, _addr)) => self.dispatch_session(stream),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    self.logger.log_line(&format!("[ipc] accept error: {e}"));
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }
    }

    fn dispatch_session(&self, stream: UnixStream) {
        if self.session_count.load(Ordering::Relaxed) >= MAX_SESSIONS {
            drop(stream);
            return;
        }
        self.session_count.fetch_add(1, Ordering::Relaxed);

        let manager = self.manager.clone();
        let shutdown = self.shutdown.clone();
        let logger = self.logger.clone();
        let count = self.session_count.clone();
        std::thread::spawn(move || {
            handle_session(stream, &manager, &shutdown, &logger);
            count.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.socket_path);
    }
}

/// One connection: read one line, dispatch, write one line, close. No
/// server-initiated messages (spec.md §4.8).
fn handle_session(stream: UnixStream, manager: &Arc<ClockManager>, shutdown: &Arc<AtomicBool>, logger: &Arc<Logger>) {
    let Ok(read_half) = stream.try_clone() else { return };
    let mut writer = stream;
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    if reader.read_line(&mut line).unwrap_or(0) == 0 {
        return;
    }

    let response = match serde_json::from_str::<Request>(line.trim_end()) {
        Ok(req) => dispatch(req, manager, shutdown, logger),
        Err(_) => Response::Error(IpcError::new(IpcErrorCode::Generic)),
    };

    let Ok(mut out) = serde_json::to_string(&response) else { return };
    out.push('\n');
    let _ = writer.write_all(out.as_bytes());
}

fn dispatch(req: Request, manager: &Arc<ClockManager>, shutdown: &Arc<AtomicBool>, logger: &Arc<Logger>) -> Response {
    match req {
        Request::GetApiVersion => Response::ApiVersion(crate::ipc::API_VERSION),
        Request::GetVersionString => Response::VersionString(env!("CARGO_PKG_VERSION").to_string()),
        Request::GetCurrentContext => Response::Context(manager.get_current_context()),
        Request::Exit => {
            logger.log_line("[ipc] Exit requested");
            shutdown.store(true, Ordering::Relaxed);
            manager.set_running(false);
            Response::Unit
        }
        Request::GetProfileCount { tid } => {
            if !manager.get_config().has_loaded() {
                Response::Error(IpcError::new(IpcErrorCode::ConfigNotLoaded))
            } else {
                Response::ProfileCount(manager.get_config().profile_count(tid))
            }
        }
        Request::GetProfiles { tid } => Response::Profiles(manager.get_config().get_profiles(tid)),
        Request::SetProfiles { tid, profiles } => {
            if manager.get_config().set_profiles(tid, profiles, true) {
                Response::Unit
            } else {
                Response::Error(IpcError::new(IpcErrorCode::ConfigSaveFailed))
            }
        }
        Request::SetEnabled { enabled } => {
            manager.get_config().set_enabled(enabled);
            Response::Unit
        }
        Request::SetOverride { module, hz } => {
            manager.get_config().set_override_hz(module, hz);
            Response::Unit
        }
        Request::GetConfigValues => Response::ConfigValues(manager.get_config().get_config_values()),
        Request::SetConfigValues { values } => {
            if manager.get_config().set_config_values(values, true) {
                Response::Unit
            } else {
                Response::Error(IpcError::new(IpcErrorCode::ConfigSaveFailed))
            }
        }
        Request::GetFreqList { module, max_count } => {
            let list = manager.get_freq_list(module);
            let take = (max_count as usize).min(list.len());
            Response::FreqList(list[..take].to_vec())
        }
    }
}
