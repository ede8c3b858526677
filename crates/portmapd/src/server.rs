//! Unix socket lifecycle and shutdown signals

use anyhow::{Context, Result};
use std::os::unix::fs::{DirBuilderExt, FileTypeExt};
use std::path::{Path, PathBuf};
use tokio::net::UnixListener;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tracing::{debug, warn};

/// Plugin socket, removed from disk when dropped
pub struct PluginSocket {
    path: PathBuf,
}

impl PluginSocket {
    /// Create the socket directory (mode 0700 if missing) and bind `path`
    ///
    /// A leftover socket from an earlier run is replaced; any other file at
    /// `path` is an error.
    pub fn bind(path: &Path) -> Result<(Self, UnixListener)> {
        if let Some(dir) = path.parent() {
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(dir)
                .with_context(|| format!("creating plugin directory {}", dir.display()))?;
        }

        match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_socket() => {
                warn!("Removing stale socket {}", path.display());
                std::fs::remove_file(path)
                    .with_context(|| format!("removing stale socket {}", path.display()))?;
            }
            Ok(_) => anyhow::bail!("{} exists and is not a socket", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("inspecting {}", path.display()));
            }
        }

        let listener = UnixListener::bind(path)
            .with_context(|| format!("listening on unix socket {}", path.display()))?;
        debug!("Bound {}", path.display());

        Ok((
            Self {
                path: path.to_path_buf(),
            },
            listener,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PluginSocket {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("Failed to remove socket {}: {}", self.path.display(), e);
        }
    }
}

/// SIGTERM and SIGINT handlers, installed up front
pub struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignals {
    pub fn install() -> Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?,
        })
    }

    /// Wait for either signal and return its name
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}
