//! Locating and opening the peer's IPC endpoint.
//!
//! # Endpoints
//!
//! | Platform | Endpoint |
//! |----------|----------|
//! | Unix | `<dir>/discord-ipc-{0..9}` for each candidate directory |
//! | Windows | `\\.\pipe\discord-ipc-{0..9}` |
//!
//! A discovery pass either yields a transport or fails with
//! [`Error::PeerNotFound`]. Retrying is up to the caller.

// ============================================================================
// Imports
// ============================================================================

use std::ffi::OsString;
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Number of endpoint indices probed per location.
pub const ENDPOINT_COUNT: u8 = 10;

/// File name prefix of the Unix socket.
const SOCKET_PREFIX: &str = "discord-ipc-";

/// Environment variables naming base directories, in priority order.
const BASE_DIR_VARS: [&str; 4] = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];

/// Base directory used after the environment ones.
const FALLBACK_DIR: &str = "/tmp";

/// Sub-directories used by sandboxed (Flatpak, Snap) peers.
const SANDBOX_SUBDIRS: [&str; 2] = ["app/com.discordapp.Discord", "snap.discord"];

// ============================================================================
// Transport
// ============================================================================

/// A duplex byte stream to the peer.
pub trait IpcStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> IpcStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// An opened, type-erased transport.
pub type Transport = Box<dyn IpcStream>;

// ============================================================================
// Candidate Resolution
// ============================================================================

/// Returns the default socket directories from the process environment.
///
/// This is the only place the crate reads the environment.
#[must_use]
pub fn default_candidate_dirs() -> Vec<PathBuf> {
    candidate_dirs_from(|key| std::env::var_os(key))
}

/// Builds the candidate directory list using `lookup` for environment
/// variables.
///
/// Each base directory expands into itself followed by the sandboxed peer
/// sub-directories. Duplicates keep their first position.
pub fn candidate_dirs_from<F>(lookup: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    let bases = BASE_DIR_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .chain(std::iter::once(PathBuf::from(FALLBACK_DIR)));

    let mut dirs: Vec<PathBuf> = Vec::new();
    for base in bases {
        let expanded = std::iter::once(base.clone())
            .chain(SANDBOX_SUBDIRS.iter().map(|sub| base.join(sub)));
        for dir in expanded {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }
    dirs
}

/// Returns the socket file name for `index`.
#[inline]
#[must_use]
pub fn socket_name(index: u8) -> String {
    format!("{SOCKET_PREFIX}{index}")
}

/// Returns the named pipe path for `index`.
#[inline]
#[must_use]
pub fn pipe_name(index: u8) -> String {
    format!(r"\\.\pipe\{SOCKET_PREFIX}{index}")
}

// ============================================================================
// Open
// ============================================================================

/// Opens the first reachable endpoint.
///
/// `candidates` are the socket directories, probed in order; they are
/// ignored on Windows, where pipe names are fixed.
///
/// # Errors
///
/// - [`Error::PeerNotFound`] if no endpoint exists
/// - [`Error::Io`] if an endpoint exists but connecting to it fails
pub async fn open(candidates: &[PathBuf]) -> Result<Transport> {
    #[cfg(unix)]
    {
        open_socket(candidates).await
    }

    #[cfg(windows)]
    {
        let _ = candidates;
        open_pipe().await
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = candidates;
        Err(Error::PeerNotFound)
    }
}

/// Connects to the first existing socket file.
#[cfg(unix)]
async fn open_socket(candidates: &[PathBuf]) -> Result<Transport> {
    use tokio::net::UnixStream;

    for dir in candidates {
        for index in 0..ENDPOINT_COUNT {
            let path = dir.join(socket_name(index));
            // Existence check is racy; a vanished socket surfaces as a
            // connect error below.
            if !exists(&path).await {
                continue;
            }

            debug!(path = %path.display(), "Connecting to IPC socket");
            let stream = UnixStream::connect(&path).await?;
            return Ok(Box::new(stream));
        }
        trace!(dir = %dir.display(), "No IPC socket in directory");
    }

    Err(Error::PeerNotFound)
}

/// Opens the first pipe that exists.
#[cfg(windows)]
async fn open_pipe() -> Result<Transport> {
    use std::io::ErrorKind;

    use tokio::net::windows::named_pipe::ClientOptions;

    for index in 0..ENDPOINT_COUNT {
        let name = pipe_name(index);
        // Opening doubles as the existence check.
        match ClientOptions::new().read(true).write(true).open(&name) {
            Ok(client) => {
                debug!(pipe = %name, "Opened IPC pipe");
                return Ok(Box::new(client));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(pipe = %name, "IPC pipe not found");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::PeerNotFound)
}

/// Returns `true` if `path` exists, treating probe errors as absence.
#[cfg(unix)]
async fn exists(path: &std::path::Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================
