//! Packed revprops manifest: `db/revprops/<S>.pack/manifest`, one line per
//! pack file in revision order (spec.md §4.6).

use crate::{layout::Revision, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub first_revision: Revision,
    pub count: u64,
    pub seq: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest(pub Vec<ManifestEntry>);

impl Manifest {
    pub fn new() -> Manifest {
        Manifest(vec![])
    }

    /// Entry containing `revision`, if any.
    pub fn find(&self, revision: Revision) -> Option<&ManifestEntry> {
        self.0
            .iter()
            .find(|e| revision >= e.first_revision && revision < e.first_revision + e.count)
    }

    pub fn next_seq(&self) -> u32 {
        self.0.iter().map(|e| e.seq).max().map(|s| s + 1).unwrap_or(0)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![];
        for entry in self.0.iter() {
            buf.extend_from_slice(format!("{} {} {}\n", entry.first_revision, entry.count, entry.seq).as_bytes());
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Manifest> {
        let text = std::str::from_utf8(buf).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        let mut entries = vec![];
        for line in text.lines() {
            let mut fields = line.split(' ');
            let first_revision = err_at!(
                MalformedIndex,
                fields.next().unwrap_or("").parse::<u64>(),
                "revprops manifest: first-revision"
            )?;
            let count = err_at!(
                MalformedIndex,
                fields.next().unwrap_or("").parse::<u64>(),
                "revprops manifest: count"
            )?;
            let seq = err_at!(
                MalformedIndex,
                fields.next().unwrap_or("").parse::<u32>(),
                "revprops manifest: seq"
            )?;
            entries.push(ManifestEntry {
                first_revision,
                count,
                seq,
            });
        }
        Ok(Manifest(entries))
    }
}

#[cfg(test)]
#[path = "manifest_test.rs"]
mod manifest_test;
