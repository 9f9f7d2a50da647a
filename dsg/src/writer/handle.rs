use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};

use parking_lot::{const_mutex, Mutex};
use tracing::{debug, error, warn};

use crate::driver::{Driver, NcId, NC_CLOBBER, NC_NETCDF4};
use crate::errors::{Error, Result, StatusExt};

use super::Mode;

/// Absolute paths of every file currently open for writing in this process
static OPEN_PATHS: Mutex<BTreeSet<PathBuf>> = const_mutex(BTreeSet::new());

/// Exclusive claim on a target path, released on drop.
///
#[derive(Debug)]
pub(crate) struct PathLock {
    path: PathBuf,
}

impl PathLock {
    /// Claim `path`, failing with `PathInUse` if another writer holds it.
    pub(crate) fn acquire(path: &Path) -> Result<Self> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir()?.join(path)
        };

        let mut open = OPEN_PATHS.lock();
        if !open.insert(path.clone()) {
            return Err(Error::PathInUse(path));
        }

        Ok(Self { path })
    }

    #[cfg(test)]
    pub(crate) fn is_held(path: &Path) -> bool {
        OPEN_PATHS.lock().contains(path)
    }
}

impl Drop for PathLock {
    fn drop(&mut self) {
        OPEN_PATHS.lock().remove(&self.path);
    }
}

/// An open file and the driver it was opened with.
///
/// Owns the driver for the lifetime of the file. If the handle is dropped before `close`, it
/// closes the file itself.
///
pub(crate) struct Handle<D: Driver> {
    driver: D,
    ncid: NcId,
    mode: Mode,
    path: PathBuf,
    lock: Option<PathLock>,
}

impl<D: Driver> Handle<D> {
    /// Claim `path` and create a fresh file there, in define mode.
    pub(crate) fn create(mut driver: D, path: &Path) -> Result<Self> {
        let lock = PathLock::acquire(path)?;
        let ncid = driver
            .create(path, NC_NETCDF4 | NC_CLOBBER)
            .status("nc_create")?;

        debug!("created {}", path.display());

        Ok(Self {
            driver,
            ncid,
            mode: Mode::Define,
            path: path.to_path_buf(),
            lock: Some(lock),
        })
    }

    pub(crate) fn ncid(&self) -> NcId {
        self.ncid
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Leave define mode
    pub(crate) fn enddef(&mut self) -> Result<()> {
        self.driver.enddef(self.ncid).status("nc_enddef")?;
        self.mode = Mode::Data;

        debug!("{} entered data mode", self.path.display());

        Ok(())
    }

    pub(crate) fn sync(&mut self) -> Result<()> {
        if self.mode == Mode::Closed {
            return Err(Error::Closed);
        }

        self.driver.sync(self.ncid).status("nc_sync")
    }

    /// Close the file and release the path. Closing twice is a no-op.
    ///
    /// The handle counts as closed even if the driver reports a failure.
    ///
    pub(crate) fn close(&mut self) -> Result<()> {
        if self.mode == Mode::Closed {
            return Ok(());
        }

        self.mode = Mode::Closed;
        self.lock.take();
        self.driver.close(self.ncid).status("nc_close")?;

        debug!("closed {}", self.path.display());

        Ok(())
    }
}

impl<D: Driver> Drop for Handle<D> {
    fn drop(&mut self) {
        if self.mode != Mode::Closed {
            warn!("{} dropped without close, closing", self.path.display());
            if let Err(err) = self.close() {
                error!("failed to close {}: {}", self.path.display(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Status;
    use crate::memory::MemoryDriver;
    use crate::testing::setup_logging;

    #[test]
    fn test_path_lock() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("locked.nc");

        let lock = PathLock::acquire(&path)?;
        assert!(PathLock::is_held(&path));
        assert!(matches!(
            PathLock::acquire(&path),
            Err(Error::PathInUse(held)) if held == path
        ));

        drop(lock);
        assert!(!PathLock::is_held(&path));
        let _lock = PathLock::acquire(&path)?;

        Ok(())
    }

    #[test]
    fn test_relative_paths_are_made_absolute() -> Result<()> {
        let lock = PathLock::acquire(Path::new("relative-lock-test.nc"))?;
        let absolute = env::current_dir()?.join("relative-lock-test.nc");
        assert!(PathLock::is_held(&absolute));
        drop(lock);
        assert!(!PathLock::is_held(&absolute));

        Ok(())
    }

    #[test]
    fn test_handle_lifecycle() -> Result<()> {
        setup_logging();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("handle.nc");
        let driver = MemoryDriver::new();
        let store = driver.store();

        let mut handle = Handle::create(driver, &path)?;
        assert_eq!(handle.mode(), Mode::Define);
        assert!(PathLock::is_held(&path));

        handle.enddef()?;
        assert_eq!(handle.mode(), Mode::Data);
        handle.sync()?;
        assert!(store.get(&path).is_some());

        handle.close()?;
        handle.close()?;
        assert_eq!(handle.mode(), Mode::Closed);
        assert!(!PathLock::is_held(&path));
        assert!(matches!(handle.sync(), Err(Error::Closed)));

        Ok(())
    }

    #[test]
    fn test_drop_closes() -> Result<()> {
        setup_logging();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("dropped.nc");
        let driver = MemoryDriver::new();
        let store = driver.store();

        let handle = Handle::create(driver, &path)?;
        drop(handle);

        assert!(!PathLock::is_held(&path));
        assert!(store.get(&path).is_some());

        Ok(())
    }

    #[test]
    fn test_failed_close_still_releases() -> Result<()> {
        setup_logging();
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("failing.nc");
        let mut driver = MemoryDriver::new();
        driver.fail_on("nc_close", Status::EIO);

        let mut handle = Handle::create(driver, &path)?;
        assert!(matches!(
            handle.close(),
            Err(Error::Driver { op: "nc_close", status: Status::EIO })
        ));
        assert_eq!(handle.mode(), Mode::Closed);
        assert!(!PathLock::is_held(&path));
        handle.close()?;

        Ok(())
    }

    #[test]
    fn test_create_failure_releases_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("never.nc");
        let mut driver = MemoryDriver::new();
        driver.fail_on("nc_create", Status::EPERM);

        assert!(matches!(
            Handle::create(driver, &path),
            Err(Error::Driver { op: "nc_create", .. })
        ));
        assert!(!PathLock::is_held(&path));

        Ok(())
    }
}
