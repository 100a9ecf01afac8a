//! Working-directory guard and the process-wide lock serialising in-process runs.
//!
//! The working directory, argv and the standard streams are singular per
//! process, so every in-process execution holds [`AmbientLock`] for its whole
//! duration: directory change, tool run, directory restore.
//!
//! The guard restores to a single baseline captured once, the first time the
//! sandbox looks at the working directory. It does not keep a stack: a nested
//! guard returns to the baseline, not to the enclosing guard's directory.
//! When the tool's directory is already current the change is skipped, and the
//! guard only puts back that directory if the tool moved away from it.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, trace};

use toolrun_commons::is_same_path;

use crate::error::{Result, SandboxError};

static AMBIENT_LOCK: Mutex<()> = parking_lot::const_mutex(());
static BASELINE_DIR: OnceCell<PathBuf> = OnceCell::new();

thread_local! {
    static HOLDS_AMBIENT_LOCK: Cell<bool> = const { Cell::new(false) };
}

/// Proof that the caller owns the process-wide ambient state.
///
/// Not `Send`: it must be released on the thread that acquired it.
pub struct AmbientLock {
    _guard: MutexGuard<'static, ()>,
}

impl fmt::Debug for AmbientLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientLock").finish()
    }
}

impl Drop for AmbientLock {
    fn drop(&mut self) {
        HOLDS_AMBIENT_LOCK.with(|held| held.set(false));
        trace!("in-process execution lock released");
    }
}

/// Block until no other in-process execution is running.
///
/// The lock is not reentrant; asking for it again from the thread that holds
/// it fails with [`SandboxError::Reentrant`] instead of deadlocking.
pub fn lock_ambient() -> Result<AmbientLock> {
    if HOLDS_AMBIENT_LOCK.with(Cell::get) {
        return Err(SandboxError::Reentrant);
    }

    let guard = match AMBIENT_LOCK.try_lock() {
        Some(guard) => guard,
        None => {
            debug!("waiting for in-process execution lock");
            AMBIENT_LOCK.lock()
        }
    };
    HOLDS_AMBIENT_LOCK.with(|held| held.set(true));
    trace!("in-process execution lock acquired");
    Ok(AmbientLock { _guard: guard })
}

/// True while some thread holds the in-process execution lock.
pub fn is_ambient_locked() -> bool {
    AMBIENT_LOCK.is_locked()
}

/// Record the baseline directory if it has not been recorded yet.
pub fn init_baseline() -> Result<&'static Path> {
    BASELINE_DIR
        .get_or_try_init(|| {
            std::env::current_dir().map_err(|source| SandboxError::WorkingDirectory {
                path: PathBuf::from("."),
                source,
            })
        })
        .map(PathBuf::as_path)
}

/// The directory every [`DirectoryGuard`] restores to, once recorded.
pub fn baseline_dir() -> Option<&'static Path> {
    BASELINE_DIR.get().map(PathBuf::as_path)
}

/// Keeps the process in a tool's working directory until dropped.
///
/// A guard that changed directory restores to the baseline. A guard that
/// found the target already current restores to that directory, and only if
/// the tool moved away from it.
#[must_use = "the working directory is restored as soon as the guard is dropped"]
pub struct DirectoryGuard<'lock> {
    baseline: &'static Path,
    target: PathBuf,
    restore_to: PathBuf,
    entered: bool,
    _lock: PhantomData<&'lock AmbientLock>,
}

impl<'lock> DirectoryGuard<'lock> {
    pub fn enter(_lock: &'lock AmbientLock, target: &Path) -> Result<Self> {
        let baseline = init_baseline()?;
        std::env::set_current_dir(target).map_err(|source| SandboxError::WorkingDirectory {
            path: target.to_path_buf(),
            source,
        })?;
        debug!(
            dir = %target.display(),
            baseline = %baseline.display(),
            "entered tool working directory"
        );
        Ok(Self {
            baseline,
            target: target.to_path_buf(),
            restore_to: baseline.to_path_buf(),
            entered: true,
            _lock: PhantomData,
        })
    }

    /// Like [`DirectoryGuard::enter`], but leaves the directory alone when
    /// `target` already is the current directory.
    pub fn enter_unless_current(lock: &'lock AmbientLock, target: &Path) -> Result<Self> {
        let baseline = init_baseline()?;
        let current = current_dir()?;
        if !is_same_path(&current, target) {
            return Self::enter(lock, target);
        }

        trace!(dir = %target.display(), "already in tool working directory");
        Ok(Self {
            baseline,
            target: target.to_path_buf(),
            restore_to: current,
            entered: false,
            _lock: PhantomData,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn baseline(&self) -> &Path {
        self.baseline
    }

    /// False when the directory change was skipped.
    pub fn entered(&self) -> bool {
        self.entered
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|source| SandboxError::WorkingDirectory {
        path: PathBuf::from("."),
        source,
    })
}

impl Drop for DirectoryGuard<'_> {
    fn drop(&mut self) {
        if !self.entered
            && let Ok(current) = std::env::current_dir()
            && current == self.restore_to
        {
            return;
        }

        match std::env::set_current_dir(&self.restore_to) {
            Ok(()) => debug!(dir = %self.restore_to.display(), "restored working directory"),
            Err(err) => error!(
                dir = %self.restore_to.display(),
                left_in = %self.target.display(),
                error = %err,
                "failed to restore working directory"
            ),
        }
    }
}

impl fmt::Debug for DirectoryGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryGuard")
            .field("baseline", &self.baseline)
            .field("target", &self.target)
            .field("entered", &self.entered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use serial_test::serial;

    #[test]
    #[serial]
    fn guard_restores_baseline_on_drop() -> anyhow::Result<()> {
        let baseline = init_baseline()?;
        let temp = TempDir::new()?;
        let lock = lock_ambient()?;
        {
            let guard = DirectoryGuard::enter(&lock, temp.path())?;
            assert!(guard.entered());
            assert_eq!(guard.baseline(), baseline);
            assert!(is_same_path(&std::env::current_dir()?, guard.target()));
        }
        assert!(is_same_path(&std::env::current_dir()?, baseline));
        Ok(())
    }

    #[test]
    #[serial]
    fn current_directory_short_circuits() -> anyhow::Result<()> {
        let baseline = init_baseline()?;
        let lock = lock_ambient()?;
        let current = std::env::current_dir()?;
        let guard = DirectoryGuard::enter_unless_current(&lock, &current)?;
        assert!(!guard.entered());
        drop(guard);
        assert_eq!(baseline_dir(), Some(baseline));
        assert_eq!(std::env::current_dir()?, current);
        Ok(())
    }

    #[test]
    #[serial]
    fn skipped_guard_still_undoes_a_directory_change() -> anyhow::Result<()> {
        let lock = lock_ambient()?;
        let current = std::env::current_dir()?;
        let elsewhere = TempDir::new()?;
        {
            let guard = DirectoryGuard::enter_unless_current(&lock, &current)?;
            assert!(!guard.entered());
            std::env::set_current_dir(elsewhere.path())?;
        }
        assert_eq!(std::env::current_dir()?, current);
        Ok(())
    }

    #[test]
    #[serial]
    fn nested_guard_returns_to_baseline() -> anyhow::Result<()> {
        let baseline = init_baseline()?;
        let outer_dir = TempDir::new()?;
        let inner_dir = TempDir::new()?;
        let lock = lock_ambient()?;

        let outer = DirectoryGuard::enter(&lock, outer_dir.path())?;
        {
            let _inner = DirectoryGuard::enter(&lock, inner_dir.path())?;
        }
        // Flat baseline: the inner guard skipped over the outer directory.
        assert!(is_same_path(&std::env::current_dir()?, baseline));
        drop(outer);
        assert!(is_same_path(&std::env::current_dir()?, baseline));
        Ok(())
    }

    #[test]
    #[serial]
    fn missing_directory_is_reported_and_cwd_kept() -> anyhow::Result<()> {
        let before = std::env::current_dir()?;
        let temp = TempDir::new()?;
        let missing = temp.path().join("does-not-exist");
        let lock = lock_ambient()?;
        let err = DirectoryGuard::enter(&lock, &missing).err();
        assert!(matches!(err, Some(SandboxError::WorkingDirectory { .. })));
        assert_eq!(std::env::current_dir()?, before);
        Ok(())
    }

    #[test]
    #[serial]
    fn lock_is_not_reentrant() -> anyhow::Result<()> {
        let lock = lock_ambient()?;
        assert!(is_ambient_locked());
        assert!(matches!(lock_ambient(), Err(SandboxError::Reentrant)));
        drop(lock);
        let again = lock_ambient()?;
        drop(again);
        Ok(())
    }
}
