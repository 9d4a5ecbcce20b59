//! On-disk path layout for a repository (spec.md §6 "On-disk layout").
//!
//! Every path a reader or writer needs to touch is computed here, keyed
//! off a repository root directory. Grounded on `dlog_journal.rs`'s
//! `JournalFile` name-encode/decode pattern: a lightweight wrapper type
//! around `OsString` with `From`/`Display` impls, rather than ad-hoc
//! `format!` calls scattered through the crate.

use std::{ffi, path::PathBuf};

/// Revision number. Revision 0 is the initial empty snapshot (spec.md §3).
pub type Revision = u64;

/// Shard number: `revision / max_files_per_dir`.
pub type Shard = u64;

/// Lowest filesystem format understood by this crate that supports
/// packed revisions (spec.md §6 "Format compatibility").
pub const FORMAT_PACKED_REVS: u32 = 4;
/// Lowest format that supports packed revprops.
pub const FORMAT_PACKED_REVPROPS: u32 = 5;
/// Lowest format that uses logical addressing (L2P/P2L indexes).
pub const FORMAT_LOGICAL_ADDRESSING: u32 = 7;
/// Highest format number this build understands.
pub const FORMAT_MAX_SUPPORTED: u32 = 7;

/// Compute the shard a revision belongs to.
pub fn shard_of(rev: Revision, max_files_per_dir: u64) -> Shard {
    rev / max_files_per_dir
}

/// Paths rooted at a repository's top-level directory.
#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
    pub max_files_per_dir: u64,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, max_files_per_dir: u64) -> Layout {
        Layout {
            root: root.into(),
            max_files_per_dir,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn current(&self) -> PathBuf {
        self.root.join("db").join("current")
    }

    pub fn format(&self) -> PathBuf {
        self.root.join("db").join("format")
    }

    pub fn fs_type(&self) -> PathBuf {
        self.root.join("db").join("fs-type")
    }

    pub fn min_unpacked_rev(&self) -> PathBuf {
        self.root.join("db").join("min-unpacked-rev")
    }

    pub fn revprop_generation(&self) -> PathBuf {
        self.root.join("db").join("revprop-generation")
    }

    pub fn uuid(&self) -> PathBuf {
        self.root.join("db").join("uuid")
    }

    pub fn txn_current(&self) -> PathBuf {
        self.root.join("db").join("txn-current")
    }

    pub fn txn_current_lock(&self) -> PathBuf {
        self.root.join("db").join("txn-current-lock")
    }

    pub fn write_lock(&self) -> PathBuf {
        self.root.join("db").join("write-lock")
    }

    pub fn revs_dir(&self) -> PathBuf {
        self.root.join("db").join("revs")
    }

    pub fn revprops_dir(&self) -> PathBuf {
        self.root.join("db").join("revprops")
    }

    pub fn transactions_dir(&self) -> PathBuf {
        self.root.join("db").join("transactions")
    }

    /// Path to an individual, unpacked revision file.
    pub fn unpacked_rev(&self, rev: Revision) -> PathBuf {
        let shard = shard_of(rev, self.max_files_per_dir);
        self.revs_dir().join(shard.to_string()).join(rev.to_string())
    }

    /// Path to a packed shard's single pack file.
    pub fn pack_file(&self, shard: Shard) -> PathBuf {
        self.revs_dir()
            .join(format!("{}.pack", shard))
            .join("pack")
    }

    /// Path to a packed shard's manifest, only present for physical
    /// addressing format (spec.md §6).
    pub fn pack_manifest(&self, shard: Shard) -> PathBuf {
        self.revs_dir()
            .join(format!("{}.pack", shard))
            .join("manifest")
    }

    /// Path to an individual, unpacked revprop file.
    pub fn unpacked_revprops(&self, rev: Revision) -> PathBuf {
        let shard = shard_of(rev, self.max_files_per_dir);
        self.revprops_dir()
            .join(shard.to_string())
            .join(rev.to_string())
    }

    pub fn revprops_pack_dir(&self, shard: Shard) -> PathBuf {
        self.revprops_dir().join(format!("{}.pack", shard))
    }

    pub fn revprops_manifest(&self, shard: Shard) -> PathBuf {
        self.revprops_pack_dir(shard).join("manifest")
    }

    /// Path to an individual revprops pack file, named `<first-rev>.<seq>`.
    pub fn revprops_pack_file(&self, shard: Shard, first_rev: Revision, seq: u32) -> PathBuf {
        self.revprops_pack_dir(shard)
            .join(format!("{}.{}", first_rev, seq))
    }

    pub fn txn_dir(&self, base_rev: Revision, seq: u64) -> PathBuf {
        self.transactions_dir()
            .join(format!("{}-{}.txn", base_rev, seq))
    }
}

/// Convert a `&std::path::Path` into an `OsString`, the form most of the
/// file-opening helpers in [crate::util::files] expect.
pub fn to_os_string(p: &std::path::Path) -> ffi::OsString {
    p.as_os_str().to_os_string()
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;
