//! Low level file helpers shared by the revision file, index and revprop
//! writers.

use std::{
    ffi, fs,
    io::{self, Read, Write},
    path,
};

use crate::Result;

/// Create a file in append mode for writing, failing if it already exists.
/// Creates parent directories as needed.
pub fn create_file_a(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);

    {
        let parent = match os_file.parent() {
            Some(parent) => Ok(parent),
            None => err_at!(InvalidFile, msg: "{:?}", file),
        }?;
        err_at!(IOError, fs::create_dir_all(parent))?;
    };

    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.append(true).create_new(true).open(os_file))
}

/// Open an existing file in append mode for writing.
pub fn open_file_a(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.append(true).open(os_file))
}

/// Open a file for reading.
pub fn open_file_r(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    err_at!(IOError, fs::OpenOptions::new().read(true).open(os_file))
}

/// Read an entire file into memory.
pub fn read_file(file: &ffi::OsStr) -> Result<Vec<u8>> {
    let mut fd = open_file_r(file)?;
    let mut buf = vec![];
    err_at!(IOError, fd.read_to_end(&mut buf))?;
    Ok(buf)
}

/// Write `data` and fsync, failing on a partial write.
pub fn sync_write(file: &mut fs::File, data: &[u8]) -> Result<usize> {
    let n = err_at!(IOError, file.write(data))?;
    if n != data.len() {
        err_at!(IOError, msg: "partial write to file {} {}", n, data.len())?;
    }
    err_at!(IOError, file.sync_all())?;
    Ok(n)
}

/// Write `data` to a temporary file alongside `dest` and atomically rename
/// it into place (spec.md "Design Notes — Platform divergence").
///
/// Relies on POSIX `rename` being atomic when source and destination share
/// a filesystem. On platforms where rename-over-an-existing-file is
/// unreliable, fall back to a link/unlink dance: link the temp file to
/// `dest`, then unlink the temp file, so a crash between the two leaves at
/// worst a dangling temp file rather than a half-written `dest`.
pub fn write_atomic(dest: &ffi::OsStr, data: &[u8]) -> Result<()> {
    let dest_path = path::Path::new(dest);
    let tmp_path = {
        let mut tmp = dest_path.as_os_str().to_os_string();
        tmp.push(".tmp");
        path::PathBuf::from(tmp)
    };

    {
        let mut fd = create_or_truncate(tmp_path.as_os_str())?;
        sync_write(&mut fd, data)?;
    }

    match fs::rename(&tmp_path, dest_path) {
        Ok(()) => Ok(()),
        Err(_) => rename_via_link(tmp_path.as_os_str(), dest),
    }
}

fn create_or_truncate(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    if let Some(parent) = os_file.parent() {
        err_at!(IOError, fs::create_dir_all(parent))?;
    }
    err_at!(
        IOError,
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(os_file)
    )
}

#[cfg(unix)]
fn rename_via_link(tmp: &ffi::OsStr, dest: &ffi::OsStr) -> Result<()> {
    fs::remove_file(dest).ok();
    err_at!(IOError, fs::hard_link(tmp, dest), "link {:?} -> {:?}", tmp, dest)?;
    err_at!(IOError, fs::remove_file(tmp))?;
    Ok(())
}

#[cfg(not(unix))]
fn rename_via_link(tmp: &ffi::OsStr, dest: &ffi::OsStr) -> Result<()> {
    err_at!(IOError, fs::copy(tmp, dest), "copy {:?} -> {:?}", tmp, dest)?;
    err_at!(IOError, fs::remove_file(tmp))?;
    Ok(())
}

/// Atomically rename `src` over `dest` without going through a temp-file
/// copy (used when `src` is already the fully-written proto file, e.g. the
/// proto-rev file becoming the final revision file).
pub fn rename_into_place(src: &ffi::OsStr, dest: &ffi::OsStr) -> Result<()> {
    if let Some(parent) = path::Path::new(dest).parent() {
        err_at!(IOError, fs::create_dir_all(parent))?;
    }
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => rename_via_link(src, dest),
    }
}

/// Remove a file, treating "already gone" as success. A pack or commit that
/// crashes after advancing `min-unpacked-rev`/`db/current` but before
/// finishing its cleanup pass must be safe to resume; without this, rerunning
/// the cleanup would fail on the files it already deleted.
pub fn remove_if_exists(file: &ffi::OsStr) -> Result<()> {
    match fs::remove_file(file) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => err_at!(IOError, msg: "remove {:?}: {}", file, err),
    }
}

#[cfg(test)]
#[path = "files_test.rs"]
mod files_test;
