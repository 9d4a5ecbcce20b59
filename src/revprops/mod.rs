//! Revprop Store: unpacked per-revision files plus packed manifest-guided
//! pack files (spec.md §4.6).
//!
//! Generation bumping (spec.md §4.8) is the caller's job — [RevpropStore]
//! only moves bytes on disk. [crate::generation::GenerationTracker] wraps
//! a write with the odd-before/even-after bump.

mod manifest;
mod pack;
mod unpacked;

pub use manifest::{Manifest, ManifestEntry};
pub use pack::PackFile;

use crate::{
    item::PropertyList,
    layout::{Layout, Revision, Shard},
    util::files,
    Result,
};

/// Reads and writes revprops for a repository, dispatching on whether a
/// revision's shard has been packed yet.
pub struct RevpropStore<'a> {
    layout: &'a Layout,
    /// Packed entries (concatenated, possibly compressed) larger than this
    /// are split out into their own pack file (spec.md §4.6 "Write").
    pub pack_size_threshold: u64,
    pub compress: bool,
}

impl<'a> RevpropStore<'a> {
    pub fn new(layout: &'a Layout, pack_size_threshold: u64, compress: bool) -> RevpropStore<'a> {
        RevpropStore {
            layout,
            pack_size_threshold,
            compress,
        }
    }

    fn shard(&self, revision: Revision) -> Shard {
        crate::layout::shard_of(revision, self.layout.max_files_per_dir)
    }

    pub fn read(&self, revision: Revision, min_unpacked_rev: Revision) -> Result<PropertyList> {
        if revision >= min_unpacked_rev {
            unpacked::read(self.layout, revision)
        } else {
            self.read_packed(revision)
        }
    }

    pub fn write(&self, revision: Revision, min_unpacked_rev: Revision, props: &PropertyList) -> Result<()> {
        if revision >= min_unpacked_rev {
            unpacked::write(self.layout, revision, props)
        } else {
            self.write_packed(revision, props)
        }
    }

    fn load_manifest(&self, shard: Shard) -> Result<Manifest> {
        let path = self.layout.revprops_manifest(shard);
        if !path.exists() {
            return Ok(Manifest::new());
        }
        let buf = files::read_file(&crate::layout::to_os_string(&path))?;
        Manifest::decode(&buf)
    }

    fn save_manifest(&self, shard: Shard, manifest: &Manifest) -> Result<()> {
        let path = self.layout.revprops_manifest(shard);
        files::write_atomic(&crate::layout::to_os_string(&path), &manifest.encode())
    }

    fn load_pack(&self, shard: Shard, entry: &ManifestEntry) -> Result<PackFile> {
        let path = self.layout.revprops_pack_file(shard, entry.first_revision, entry.seq);
        let buf = files::read_file(&crate::layout::to_os_string(&path))?;
        PackFile::decode(&buf)
    }

    fn save_pack(&self, shard: Shard, first_revision: Revision, seq: u32, pack: &PackFile) -> Result<()> {
        let path = self.layout.revprops_pack_file(shard, first_revision, seq);
        let buf = pack.encode(self.compress)?;
        files::write_atomic(&crate::layout::to_os_string(&path), &buf)
    }

    fn read_packed(&self, revision: Revision) -> Result<PropertyList> {
        let shard = self.shard(revision);
        let manifest = self.load_manifest(shard)?;
        let entry = manifest
            .find(revision)
            .ok_or_else(|| crate::Error::NoSuchRevision(format!("revprops: revision {} not in any pack", revision)))?;
        let pack = self.load_pack(shard, entry)?;
        let idx = (revision - entry.first_revision) as usize;
        pack.entries
            .get(idx)
            .cloned()
            .ok_or_else(|| crate::Error::CorruptRevFile(format!("revprops pack: missing entry for revision {}", revision)))
    }

    /// Rewrite the pack file covering `revision`, splitting the revision
    /// out into its own pack file when the rewritten size would exceed
    /// [RevpropStore::pack_size_threshold] (spec.md §4.6 "Write").
    fn write_packed(&self, revision: Revision, props: &PropertyList) -> Result<()> {
        let shard = self.shard(revision);
        let mut manifest = self.load_manifest(shard)?;
        let entry = *manifest
            .find(revision)
            .ok_or_else(|| crate::Error::NoSuchRevision(format!("revprops: revision {} not in any pack", revision)))?;

        let mut pack = self.load_pack(shard, &entry)?;
        let idx = (revision - entry.first_revision) as usize;
        if idx >= pack.entries.len() {
            return err_at!(CorruptRevFile, msg: "revprops pack: missing entry for revision {}", revision);
        }
        pack.entries[idx] = props.clone();

        let encoded = pack.encode(self.compress)?;
        if (encoded.len() as u64) <= self.pack_size_threshold {
            self.save_pack(shard, entry.first_revision, entry.seq, &pack)?;
            return Ok(());
        }

        // Split: before-revision, the revision alone, after-revision.
        let before: Vec<PropertyList> = pack.entries[..idx].to_vec();
        let updated = pack.entries[idx].clone();
        let after: Vec<PropertyList> = pack.entries[idx + 1..].to_vec();

        let mut new_entries = vec![];
        let mut next_seq = manifest.next_seq();

        if !before.is_empty() {
            let seq = next_seq;
            next_seq += 1;
            let first_revision = entry.first_revision;
            let count = before.len() as u64;
            self.save_pack(shard, first_revision, seq, &PackFile::new(first_revision, before))?;
            new_entries.push(ManifestEntry {
                first_revision,
                count,
                seq,
            });
        }

        {
            let seq = next_seq;
            next_seq += 1;
            self.save_pack(shard, revision, seq, &PackFile::new(revision, vec![updated]))?;
            new_entries.push(ManifestEntry {
                first_revision: revision,
                count: 1,
                seq,
            });
        }

        if !after.is_empty() {
            let seq = next_seq;
            let first_revision = revision + 1;
            let count = after.len() as u64;
            self.save_pack(shard, first_revision, seq, &PackFile::new(first_revision, after))?;
            new_entries.push(ManifestEntry {
                first_revision,
                count,
                seq,
            });
        }

        manifest.0.retain(|e| e.first_revision != entry.first_revision || e.seq != entry.seq);
        manifest.0.extend(new_entries);
        manifest.0.sort_by_key(|e| e.first_revision);
        self.save_manifest(shard, &manifest)
    }

    /// Build a shard's packed-revprops representation from scratch out of
    /// its existing unpacked revprop files (spec.md §4.7 step 6 "pack the
    /// revprop shard identically"), splitting into multiple pack files
    /// whenever a chunk's encoded size would exceed
    /// [RevpropStore::pack_size_threshold]. Does not delete the unpacked
    /// files it read; the caller does that once this returns successfully.
    pub fn pack_shard(&self, shard: Shard, first_rev: Revision, last_rev: Revision) -> Result<()> {
        let mut manifest = Manifest::new();
        let mut seq = 0u32;
        let mut chunk_first = first_rev;
        let mut chunk: Vec<PropertyList> = vec![];
        let mut chunk_bytes = 0u64;

        for revision in first_rev..=last_rev {
            let props = unpacked::read(self.layout, revision)?;
            if chunk.is_empty() {
                chunk_first = revision;
            }
            let mut encoded = vec![];
            props.encode(&mut encoded);
            chunk_bytes += encoded.len() as u64;
            chunk.push(props);

            if chunk_bytes > self.pack_size_threshold && chunk.len() > 1 {
                let overflow = chunk.pop().unwrap();
                let count = chunk.len() as u64;
                self.save_pack(shard, chunk_first, seq, &PackFile::new(chunk_first, chunk))?;
                manifest.0.push(ManifestEntry {
                    first_revision: chunk_first,
                    count,
                    seq,
                });
                seq += 1;

                let mut overflow_encoded = vec![];
                overflow.encode(&mut overflow_encoded);
                chunk_bytes = overflow_encoded.len() as u64;
                chunk = vec![overflow];
                chunk_first = revision;
            }
        }

        if !chunk.is_empty() {
            let count = chunk.len() as u64;
            self.save_pack(shard, chunk_first, seq, &PackFile::new(chunk_first, chunk))?;
            manifest.0.push(ManifestEntry {
                first_revision: chunk_first,
                count,
                seq,
            });
        }

        self.save_manifest(shard, &manifest)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
