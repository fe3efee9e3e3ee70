// Copyright 2024 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single-instance PID-file guard (§6 process lifecycle, out of the original spec's core scope).
//! Grounded in the `midpy` ETL's `utils/pidfile.py`: a liveness check via a no-op signal rather
//! than a platform file lock, kept here because `libc` is already load-bearing in this workspace
//! for it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Holds the lock for the lifetime of the value; dropping it removes the pidfile. Acquire with
/// [`PidFile::acquire`] at process start and keep the guard alive until shutdown.
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Checks for a live process recorded at `path` and, if none is found, writes the current
    /// pid. Returns [`PipelineError::AlreadyRunning`] if another instance holds the lock.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(pid) = read_running_pid(&path)? {
            return Err(PipelineError::AlreadyRunning(pid));
        }
        fs::write(&path, std::process::id().to_string())?;
        Ok(Self { path })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::warn!(?err, path = %self.path.display(), "failed to remove pidfile");
        }
    }
}

/// Returns `Some(pid)` if `path` names a pid whose process is alive and signalable, `None` if the
/// file is absent or stale. A non-integer pidfile is a programmer/logic error (§7 kind 3): it
/// surfaces rather than being treated as "not running".
fn read_running_pid(path: &Path) -> Result<Option<u32>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let pid: u32 = raw.trim().parse().map_err(|_| PipelineError::InvalidPidFile {
        path: path.display().to_string(),
        reason: format!("pidfile contents {raw:?} are not a valid pid"),
    })?;

    // Signal 0 sends no actual signal; it only checks whether we could signal `pid`, i.e.
    // whether it exists and we have permission (mirrors `os.kill(pid, 0)` in `pidfile.py`).
    let alive = unsafe { libc::kill(pid as libc::pid_t, 0) } == 0;
    if alive {
        Ok(Some(pid))
    } else {
        let errno = std::io::Error::last_os_error();
        match errno.raw_os_error() {
            Some(libc::ESRCH) => Ok(None),
            Some(libc::EPERM) => Ok(Some(pid)),
            _ => Err(errno.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_when_no_pidfile_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.pid");
        let guard = PidFile::acquire(&path).unwrap();
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), std::process::id().to_string());
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn rejects_when_pid_belongs_to_a_live_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.pid");
        // pid 1 is always alive (init/pid1) and not us, so this simulates another live holder.
        fs::write(&path, "1").unwrap();
        let err = PidFile::acquire(&path).unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyRunning(1)));
    }

    #[test]
    fn stale_pid_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.pid");
        // A pid astronomically unlikely to be alive on any test runner.
        fs::write(&path, "4000000000").unwrap();
        let guard = PidFile::acquire(&path);
        assert!(guard.is_ok());
    }

    #[test]
    fn corrupt_pidfile_is_an_invariant_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.pid");
        fs::write(&path, "not-a-pid").unwrap();
        let err = PidFile::acquire(&path).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPidFile { .. }));
    }
}
