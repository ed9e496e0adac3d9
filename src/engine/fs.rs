//! Filesystem access used by the scanners and readers: directory handles with lazy listings,
//! lstat classification and ownership capture from open handles.

use log::warn;
use std::ffi::OsString;
use std::fs::{self, File, Metadata};
use std::io;
use std::path::Path;

use crate::Ownership;

/// What an `lstat` says a directory entry is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
    /// FIFO, socket or device node.
    Special,
}

/// `lstat` the path and classify it. Symlinks are reported as such, never followed.
pub fn classify(path: &Path) -> io::Result<EntryKind> {
    let file_type = fs::symlink_metadata(path)?.file_type();
    Ok(if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Special
    })
}

#[cfg(unix)]
fn ownership_from_metadata(meta: &Metadata) -> Ownership {
    use std::os::unix::fs::MetadataExt;
    Ownership {
        uid: meta.uid(),
        gid: meta.gid(),
        mode: meta.mode(),
    }
}

#[cfg(not(unix))]
fn ownership_from_metadata(meta: &Metadata) -> Ownership {
    let mode = match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o040755,
        (false, true) => 0o100444,
        (false, false) => 0o100644,
    };
    Ownership { uid: 0, gid: 0, mode }
}

/// Ownership of an already-open handle. A failed stat is logged and yields zeroed fields.
fn ownership_of(meta: io::Result<Metadata>, path: &Path) -> Ownership {
    match meta {
        Ok(meta) => ownership_from_metadata(&meta),
        Err(e) => {
            warn!(
                "stat error on {}; uid/gid/mode will be incorrect: {}",
                path.display(),
                e
            );
            Ownership::default()
        }
    }
}

/// An open directory: its ownership plus a lazy listing of entry names.
///
/// On Unix both come from one descriptor: it is fstat-ed, then handed to `fdopendir`, so the
/// names always belong to the directory the ownership describes. Entries are pulled with
/// `readdir` as the iterator advances; `.` and `..` are left out. The descriptor closes when
/// this is dropped.
pub struct OpenDir {
    pub owner: Ownership,
    #[cfg(unix)]
    stream: unix_dir::DirStream,
    #[cfg(not(unix))]
    entries: fs::ReadDir,
}

impl OpenDir {
    #[cfg(unix)]
    pub fn open(path: &Path) -> io::Result<Self> {
        let handle = File::open(path)?;
        let owner = ownership_of(handle.metadata(), path);
        let stream = unix_dir::DirStream::from_file(handle)?;
        Ok(Self { owner, stream })
    }

    #[cfg(not(unix))]
    pub fn open(path: &Path) -> io::Result<Self> {
        let entries = fs::read_dir(path)?;
        let owner = ownership_of(fs::metadata(path), path);
        Ok(Self { owner, entries })
    }
}

impl Iterator for OpenDir {
    type Item = io::Result<OsString>;

    #[cfg(unix)]
    fn next(&mut self) -> Option<Self::Item> {
        self.stream.next()
    }

    #[cfg(not(unix))]
    fn next(&mut self) -> Option<Self::Item> {
        self.entries
            .next()
            .map(|entry| entry.map(|e| e.file_name()))
    }
}

#[cfg(unix)]
mod unix_dir {
    use std::ffi::{CStr, OsStr, OsString};
    use std::fs::File;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::io::IntoRawFd;
    use std::ptr::NonNull;

    /// `DIR*` stream owning the descriptor it was opened on.
    pub(super) struct DirStream {
        dir: NonNull<libc::DIR>,
        failed: bool,
    }

    impl DirStream {
        /// Take over `file`'s descriptor. It is closed with the stream, or right away on failure.
        pub(super) fn from_file(file: File) -> io::Result<Self> {
            let fd = file.into_raw_fd();
            let dir = unsafe { libc::fdopendir(fd) };
            match NonNull::new(dir) {
                Some(dir) => Ok(Self { dir, failed: false }),
                None => {
                    let err = io::Error::last_os_error();
                    unsafe { libc::close(fd) };
                    Err(err)
                }
            }
        }
    }

    #[cfg(any(target_os = "linux", target_os = "android", target_os = "emscripten"))]
    fn clear_errno() {
        unsafe { *libc::__errno_location() = 0 };
    }

    #[cfg(any(target_vendor = "apple", target_os = "freebsd", target_os = "dragonfly"))]
    fn clear_errno() {
        unsafe { *libc::__error() = 0 };
    }

    #[cfg(any(target_os = "openbsd", target_os = "netbsd"))]
    fn clear_errno() {
        unsafe { *libc::__errno() = 0 };
    }

    // No portable errno setter here: a stale errno at end of stream shows up as one
    // listing warning after the last entry.
    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "emscripten",
        target_vendor = "apple",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "openbsd",
        target_os = "netbsd"
    )))]
    fn clear_errno() {}

    impl Iterator for DirStream {
        type Item = io::Result<OsString>;

        fn next(&mut self) -> Option<Self::Item> {
            if self.failed {
                return None;
            }
            loop {
                // readdir signals both end of stream and errors with NULL; only errno tells them apart
                clear_errno();
                let entry = unsafe { libc::readdir(self.dir.as_ptr()) };
                if entry.is_null() {
                    let err = io::Error::last_os_error();
                    if err.raw_os_error() == Some(0) {
                        return None;
                    }
                    self.failed = true;
                    return Some(Err(err));
                }
                let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) }.to_bytes();
                if name == b"." || name == b".." {
                    continue;
                }
                return Some(Ok(OsStr::from_bytes(name).to_os_string()));
            }
        }
    }

    impl Drop for DirStream {
        fn drop(&mut self) {
            unsafe { libc::closedir(self.dir.as_ptr()) };
        }
    }
}

/// Open a file for reading and capture its ownership from the open handle.
pub fn open_file(path: &Path) -> io::Result<(File, Ownership)> {
    let file = File::open(path)?;
    let owner = ownership_of(file.metadata(), path);
    Ok((file, owner))
}
