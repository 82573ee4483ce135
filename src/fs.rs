use std::time::SystemTime;

/// MTime info gathered for a file.  This also models "file is absent".
/// It's not using an Option<> just because it makes the code using it easier
/// to follow.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MTime {
    Missing,
    Stamp(SystemTime),
}

/// The filesystem as seen by the scheduler.  Indirected as a trait so tests
/// can run the staleness rules against an in-memory tree with exact times.
pub trait FileSystem {
    fn read(&self, path: &str) -> std::io::Result<Vec<u8>>;
    /// stat() an on-disk path, producing its MTime.
    fn stat(&self, path: &str) -> std::io::Result<MTime>;
    fn is_dir(&self, path: &str) -> bool;
    fn create_dir_all(&self, path: &str) -> std::io::Result<()>;

    fn exists(&self, path: &str) -> std::io::Result<bool> {
        Ok(self.stat(path)? != MTime::Missing)
    }
}

#[derive(Debug, Default)]
pub struct RealFileSystem {}
impl RealFileSystem {
    pub fn new() -> Self {
        RealFileSystem {}
    }
}

impl FileSystem for RealFileSystem {
    fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn stat(&self, path: &str) -> std::io::Result<MTime> {
        Ok(match std::fs::metadata(path) {
            Ok(meta) => MTime::Stamp(meta.modified()?),
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    MTime::Missing
                } else {
                    return Err(err);
                }
            }
        })
    }

    fn is_dir(&self, path: &str) -> bool {
        std::path::Path::new(path).is_dir()
    }

    fn create_dir_all(&self, path: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }
}
