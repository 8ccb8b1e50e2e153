//! workflow::cwd
//!
//! Scoped change of the process working directory.
//!
//! The working directory is process-wide state. [`WorkingDir`] holds a
//! process-wide lock for as long as it is alive, so two threads never
//! interleave directory changes. Entering again from the thread that
//! already holds the lock nests instead of deadlocking.

use std::cell::Cell;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::WorkflowError;

static CWD_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Guard that restores the previous working directory when dropped.
///
/// # Example
///
/// ```no_run
/// use multirepo::workflow::WorkingDir;
///
/// {
///     let _cwd = WorkingDir::enter("/tmp".as_ref())?;
///     // relative paths resolve against /tmp here
/// }
/// // back where we were
/// # Ok::<(), multirepo::workflow::WorkflowError>(())
/// ```
#[derive(Debug)]
pub struct WorkingDir {
    previous: PathBuf,
    _lock: Option<MutexGuard<'static, ()>>,
}

impl WorkingDir {
    /// Change into `dir` until the guard is dropped.
    pub fn enter(dir: &Path) -> Result<Self, WorkflowError> {
        let lock = if DEPTH.with(Cell::get) == 0 {
            Some(CWD_LOCK.lock().unwrap_or_else(PoisonError::into_inner))
        } else {
            None
        };

        let previous = env::current_dir().map_err(|source| WorkflowError::WorkingDir {
            path: dir.to_path_buf(),
            source,
        })?;
        env::set_current_dir(dir).map_err(|source| WorkflowError::WorkingDir {
            path: dir.to_path_buf(),
            source,
        })?;
        debug!("cd {}", dir.display());

        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Ok(Self {
            previous,
            _lock: lock,
        })
    }

    /// Directory restored on drop.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            warn!(
                "failed to restore working directory '{}': {e}",
                self.previous.display()
            );
        }
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
