//! Repository: the singleton manager object wiring together everything a
//! caller needs against one opened repository (spec.md §9 "Global mutable
//! state... Model as a singleton manager object per opened repository;
//! initialize at open, tear down at close; never at module scope").
//!
//! Grounded on `Rdms`/`Bogn`'s top-level handle, which bundles an index's
//! config and mutable state behind one owned value rather than free
//! functions over ambient statics.

use std::time::Duration;

use crate::{
    generation::GenerationTracker,
    item::{ItemCodec, CHANGED_PATHS_ITEM, ROOT_NODE_ITEM},
    layout::{Layout, Revision, Shard, FORMAT_MAX_SUPPORTED},
    lock::WriteLock,
    p2l::P2lEntry,
    pack::PlannedItem,
    proto::{ProtoL2p, ProtoP2l},
    revfile::Footer,
    revprops::RevpropStore,
    util::{files, fnv},
    Result,
};

/// How long a writer waits for the write lock before giving up (spec.md
/// §4.9 doesn't mandate a value; chosen generously since pack and commit
/// are expected to be brief).
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Defaults for the L2P/P2L layout a committed or packed revision file
/// ends up with, matching the values exercised throughout the crate's own
/// tests (e.g. `Packer::new(4096, 4096, 64)`).
const DEFAULT_BLOCK_SIZE: u64 = 4096;
const DEFAULT_PAGE_SIZE: u64 = 4096;
const DEFAULT_ENTRIES_PER_PAGE: u64 = 64;

/// Well-known MD5/SHA1 of the empty byte string, the representation an
/// empty directory or zero-length file carries (spec.md §3 "empty
/// revision"): no bytes were ever written for it, so there is no
/// [crate::item::Representation] to point at, only the digests of nothing.
const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

pub struct Repository {
    layout: Layout,
    format: u32,
    generation: GenerationTracker,
    revprop_pack_size_threshold: u64,
    revprop_compress: bool,
    lock_timeout: Duration,
    block_size: u64,
    page_size: u64,
    entries_per_page: u64,
}

impl Repository {
    /// Open an existing repository, refusing one whose format number is
    /// newer than this build understands (spec.md §4 "Format compatibility").
    pub fn open(root: impl Into<std::path::PathBuf>, max_files_per_dir: u64) -> Result<Repository> {
        let layout = Layout::new(root, max_files_per_dir);
        let format = read_format(&layout)?;
        if format > FORMAT_MAX_SUPPORTED {
            return err_at!(FormatUnsupported, msg: "repository format {} exceeds max supported {}", format, FORMAT_MAX_SUPPORTED);
        }
        let generation = GenerationTracker::open(&layout)?;
        Ok(Repository {
            layout,
            format,
            generation,
            revprop_pack_size_threshold: 16 * 1024,
            revprop_compress: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            block_size: DEFAULT_BLOCK_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            entries_per_page: DEFAULT_ENTRIES_PER_PAGE,
        })
    }

    /// Initialize a fresh repository's `db/` skeleton: format file,
    /// revision 0's current-revision marker, a random UUID, an empty
    /// revprop-generation counter, and revision 0 itself — a real,
    /// committed revision file holding an empty changed-paths record and
    /// an empty root directory (spec.md §3 "the initial empty revision",
    /// §6 "On-disk layout").
    pub fn create(root: impl Into<std::path::PathBuf>, max_files_per_dir: u64) -> Result<Repository> {
        let layout = Layout::new(root, max_files_per_dir);
        files::write_atomic(&crate::layout::to_os_string(&layout.format()), format!("{}\n", FORMAT_MAX_SUPPORTED).as_bytes())?;
        files::write_atomic(&crate::layout::to_os_string(&layout.current()), b"0\n")?;
        files::write_atomic(&crate::layout::to_os_string(&layout.min_unpacked_rev()), b"0\n")?;
        files::write_atomic(&crate::layout::to_os_string(&layout.uuid()), format!("{}\n", uuid::Uuid::new_v4()).as_bytes())?;
        files::write_atomic(&crate::layout::to_os_string(&layout.revprop_generation()), b"0")?;

        let generation = GenerationTracker::open(&layout)?;
        let repo = Repository {
            layout,
            format: FORMAT_MAX_SUPPORTED,
            generation,
            revprop_pack_size_threshold: 16 * 1024,
            revprop_compress: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            block_size: DEFAULT_BLOCK_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            entries_per_page: DEFAULT_ENTRIES_PER_PAGE,
        };
        repo.finalize_revision(0, &initial_revision_items()?)?;
        Ok(repo)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn format(&self) -> u32 {
        self.format
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Repository {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_revprop_options(mut self, pack_size_threshold: u64, compress: bool) -> Repository {
        self.revprop_pack_size_threshold = pack_size_threshold;
        self.revprop_compress = compress;
        self
    }

    pub fn with_commit_options(mut self, block_size: u64, page_size: u64, entries_per_page: u64) -> Repository {
        self.block_size = block_size;
        self.page_size = page_size;
        self.entries_per_page = entries_per_page;
        self
    }

    /// The youngest committed revision, re-read fresh on every call: a
    /// reader never caches this, since a concurrent pack or commit can
    /// advance it at any time (spec.md §4.9 "readers tolerate an
    /// ever-changing set of committed revisions").
    pub fn current_revision(&self) -> Result<Revision> {
        read_counter(&self.layout.current())
    }

    /// Lowest revision not yet folded into a pack file (spec.md §6
    /// `db/min-unpacked-rev`).
    pub fn min_unpacked_rev(&self) -> Result<Revision> {
        read_counter(&self.layout.min_unpacked_rev())
    }

    pub fn uuid(&self) -> Result<String> {
        let buf = files::read_file(&crate::layout::to_os_string(&self.layout.uuid()))?;
        let text = std::str::from_utf8(&buf).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        Ok(text.trim().to_string())
    }

    pub fn generation(&self) -> &GenerationTracker {
        &self.generation
    }

    fn revprop_store(&self) -> RevpropStore<'_> {
        RevpropStore::new(&self.layout, self.revprop_pack_size_threshold, self.revprop_compress)
    }

    pub fn read_revprops(&self, revision: Revision) -> Result<crate::item::PropertyList> {
        let min_unpacked_rev = self.min_unpacked_rev()?;
        self.revprop_store().read(revision, min_unpacked_rev)
    }

    /// Acquire the write lock, bump the generation to odd, write the new
    /// revprops, then bump it back to even (spec.md §4.8, §4.9). Any error
    /// in between leaves the generation odd; the next writer to take the
    /// lock will see [GenerationTracker::recover_if_stale] clear it once
    /// the recovery timeout elapses.
    pub fn write_revprops(&self, revision: Revision, props: &crate::item::PropertyList) -> Result<()> {
        let _write_lock = WriteLock::acquire(&self.layout, self.lock_timeout)?;
        self.generation.recover_if_stale()?;
        let guard = self.generation.begin_write()?;
        let min_unpacked_rev = self.min_unpacked_rev()?;
        self.revprop_store().write(revision, min_unpacked_rev, props)?;
        guard.commit()
    }

    /// Commit one new revision (spec.md §2 "Control flow", §4.5): assemble
    /// the given items into a revision file via [Repository::finalize_revision]
    /// and advance `db/current`, all under the write lock (spec.md §4.9
    /// "Scheduling model" — one committer at a time). `items` must include
    /// the changed-paths record (item 1) and the root node-revision
    /// (item 2); everything else a caller writes ahead of time is passed
    /// through unchanged.
    pub fn commit(&self, items: Vec<PlannedItem>) -> Result<Revision> {
        if !items.iter().any(|item| item.item_number == CHANGED_PATHS_ITEM) {
            return err_at!(InvalidInput, msg: "commit: items missing changed-paths record (item {})", CHANGED_PATHS_ITEM);
        }
        if !items.iter().any(|item| item.item_number == ROOT_NODE_ITEM) {
            return err_at!(InvalidInput, msg: "commit: items missing root node-revision (item {})", ROOT_NODE_ITEM);
        }

        let _write_lock = WriteLock::acquire(&self.layout, self.lock_timeout)?;
        let revision = self.current_revision()? + 1;
        self.finalize_revision(revision, &items)?;
        files::write_atomic(&crate::layout::to_os_string(&self.layout.current()), format!("{}\n", revision).as_bytes())?;
        Ok(revision)
    }

    /// Build one revision's on-disk file: append each item to a proto-rev
    /// body while recording its offset in a [ProtoL2p]/[ProtoP2l] accumulator
    /// (spec.md §4.5 "Proto-Index Writer"), finalize those into an [crate::l2p::L2pIndex]
    /// and [crate::p2l::P2lIndex], append them plus a [Footer], and rename
    /// the result atomically into place (spec.md §4.2 "Revision File").
    /// Shared by [Repository::create] (revision 0) and [Repository::commit]
    /// (every later revision); neither acquires the write lock here, since
    /// `create` runs before the repository is visible to anyone else and
    /// `commit` already holds it.
    fn finalize_revision(&self, revision: Revision, items: &[PlannedItem]) -> Result<()> {
        let mut proto_l2p = ProtoL2p::new();
        let mut proto_p2l = ProtoP2l::new(self.block_size);
        proto_l2p.new_revision(revision);

        let mut body = vec![];
        for item in items.iter() {
            let offset = body.len() as u64;
            body.extend_from_slice(&item.bytes);
            proto_l2p.record(item.item_number, offset);
            proto_p2l.record(P2lEntry {
                offset,
                size: item.bytes.len() as u64,
                item_type: item.item_type,
                revision,
                item_number: item.item_number,
                fnv1a: fnv::fnv1a32(&item.bytes),
            });
        }

        let l2p = proto_l2p.finalize(self.entries_per_page)?;
        let p2l = proto_p2l.finalize()?;

        let l2p_offset = body.len() as u64;
        body.extend_from_slice(&l2p.encode(self.page_size));
        let p2l_offset = body.len() as u64;
        body.extend_from_slice(&p2l.encode());
        body.extend_from_slice(&Footer::new(l2p_offset, p2l_offset).encode());

        let dest = self.layout.unpacked_rev(revision);
        files::write_atomic(&crate::layout::to_os_string(&dest), &body)
    }

    /// Shard-pack every unpacked revision in `shard` (spec.md §4.7): read
    /// each revision file's items via `read_shard_items`, hand them to the
    /// pack engine, install the result, advance `min-unpacked-rev` past the
    /// shard once the pack file is durably in place, pack the revprop
    /// shard identically, and delete every now-redundant unpacked
    /// revision/revprop file the pack replaces (spec.md §4.7 step 6).
    /// Revision 0's revprop file is preserved even when its shard is
    /// packed (spec.md §8 boundary behavior). Holds the write lock for the
    /// duration, matching the single-threaded writer model (spec.md §4.9
    /// "Scheduling model").
    pub fn pack_shard(
        &self,
        shard: Shard,
        shard_items: Vec<crate::pack::RevisionItems>,
        packer: &crate::pack::Packer,
    ) -> Result<()> {
        let _write_lock = WriteLock::acquire(&self.layout, self.lock_timeout)?;
        let packed = packer.pack(&shard_items)?;
        packer.install(&self.layout, shard, &packed)?;

        let first_rev = shard * self.layout.max_files_per_dir;
        let next_unpacked = (shard + 1) * self.layout.max_files_per_dir;
        let last_rev = shard_items
            .iter()
            .map(|item| item.revision)
            .max()
            .unwrap_or(next_unpacked - 1);
        files::write_atomic(
            &crate::layout::to_os_string(&self.layout.min_unpacked_rev()),
            format!("{}\n", next_unpacked).as_bytes(),
        )?;

        self.revprop_store().pack_shard(shard, first_rev, last_rev)?;

        for revision in first_rev..=last_rev {
            files::remove_if_exists(&crate::layout::to_os_string(&self.layout.unpacked_rev(revision)))?;
            if revision != 0 {
                files::remove_if_exists(&crate::layout::to_os_string(&self.layout.unpacked_revprops(revision)))?;
            }
        }
        Ok(())
    }
}

/// Item 1 (empty changed-paths) and item 2 (an empty root directory) for
/// revision 0 (spec.md §3 "the initial empty revision" — "only the root
/// node-revision plus an empty changed-paths record; the L2P index has
/// exactly 2 entries").
fn initial_revision_items() -> Result<Vec<PlannedItem>> {
    let mut changed_paths_bytes = vec![];
    crate::item::ChangedPaths::new().write_to(&mut changed_paths_bytes)?;

    let root = crate::item::NodeRevision {
        kind: crate::item::NodeKind::Dir,
        predecessor: None,
        predecessor_count: 0,
        data_rep: None,
        prop_rep: None,
        copyfrom: None,
        created_revision: 0,
        created_path: "/".to_string(),
        md5: EMPTY_MD5.to_string(),
        sha1: EMPTY_SHA1.to_string(),
    };
    let mut root_bytes = vec![];
    root.write_to(&mut root_bytes)?;

    Ok(vec![
        PlannedItem {
            item_number: CHANGED_PATHS_ITEM,
            item_type: crate::item::ItemKind::ChangedPaths,
            bytes: changed_paths_bytes,
        },
        PlannedItem {
            item_number: ROOT_NODE_ITEM,
            item_type: crate::item::ItemKind::NodeRev,
            bytes: root_bytes,
        },
    ])
}

fn read_format(layout: &Layout) -> Result<u32> {
    let buf = files::read_file(&crate::layout::to_os_string(&layout.format()))?;
    let text = std::str::from_utf8(&buf).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
    err_at!(FailConvert, text.trim().parse::<u32>())
}

fn read_counter(path: &std::path::Path) -> Result<u64> {
    let buf = files::read_file(&crate::layout::to_os_string(path))?;
    let text = std::str::from_utf8(&buf).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
    err_at!(FailConvert, text.trim().parse::<u64>())
}

#[cfg(test)]
#[path = "repo_test.rs"]
mod repo_test;
