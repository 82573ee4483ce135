//! Per-task memo of "when did this artifact last change".
//!
//! A stamp is either loaded from the filesystem or marked with the clock
//! right after the task's action ran.  Marked stamps are never replaced by a
//! later stat(): filesystems with one second mtime resolution would otherwise
//! make an output and the input rebuilt just after it look equally old.

use crate::clock::Clock;
use crate::fs::{FileSystem, MTime};
use std::cell::Cell;
use std::time::SystemTime;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Origin {
    Loaded,
    Marked,
}

#[derive(Debug, Default)]
pub struct Stamp {
    cached: Cell<Option<(SystemTime, Origin)>>,
}

impl Stamp {
    pub fn get(&self) -> Option<SystemTime> {
        self.cached.get().map(|(time, _)| time)
    }

    /// Returns the cached time, or stats `path` and caches its mtime.
    /// A missing path yields None and caches nothing.
    pub fn get_or_load(
        &self,
        fs: &dyn FileSystem,
        path: &str,
    ) -> std::io::Result<Option<SystemTime>> {
        if let Some(time) = self.get() {
            return Ok(Some(time));
        }
        match fs.stat(path)? {
            MTime::Missing => Ok(None),
            MTime::Stamp(time) => {
                self.cached.set(Some((time, Origin::Loaded)));
                Ok(Some(time))
            }
        }
    }

    /// Records that the task just executed.
    pub fn mark_now(&self, clock: &dyn Clock) -> SystemTime {
        let now = clock.now();
        self.cached.set(Some((now, Origin::Marked)));
        now
    }

    /// Drops a stamp that came from stat(), so the next query sees edits made
    /// since.  Marked stamps survive.
    pub fn forget_loaded(&self) {
        if let Some((_, Origin::Loaded)) = self.cached.get() {
            self.cached.set(None);
        }
    }
}
