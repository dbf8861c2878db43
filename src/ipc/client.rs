//! Thin synchronous client, re-homed from `original_source`'s
//! `common/include/sysclk/client/ipc.h`. The overlay/manager GUIs that
//! actually consumed that header are out of scope (spec.md §1); this
//! wrapper exists only so the integration tests can speak the protocol
//! without hand-rolling socket code per test.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use crate::ipc::{Request, Response};

/// Opens a fresh connection, sends one request, reads one reply, closes —
/// matching the one-shot request/response contract (spec.md §4.8).
pub fn call(socket_path: &Path, req: &Request) -> std::io::Result<Response> {
    let mut stream = UnixStream::connect(socket_path)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;

    let mut line = serde_json::to_string(req).map_err(std::io::Error::other)?;
    line.push('\n');
    stream.write_all(line.as_bytes())?;

    let mut reader = BufReader::new(stream);
    let mut reply = String::new();
    reader.read_line(&mut reply)?;
    serde_json::from_str(reply.trim_end()).map_err(std::io::Error::other)
}
