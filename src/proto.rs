//! Proto-Index Writer: the two append-only scratch files a commit (or a
//! pack section) accumulates before finalization (spec.md §4.5).
//!
//! * **Proto-L2P** — `(item-offset, item-number)` tuples plus an in-band
//!   `new-revision` marker; tuples for one revision may arrive in any
//!   order, sorted by finalization.
//! * **Proto-P2L** — full [P2lEntry] records in file-offset order.
//!
//! Both are append-only and are discarded wholesale on a failed commit
//! (spec.md §4.5 "Contract: Append operations are idempotent on crash").

use std::convert::TryInto;

use crate::{
    item::{ItemKind, ItemNumber},
    l2p::L2pIndex,
    layout::Revision,
    p2l::{P2lEntry, P2lIndex},
    util::vlq,
    Result,
};

enum L2pRecord {
    NewRevision(Revision),
    Entry { item_number: ItemNumber, offset: u64 },
}

/// Accumulates `(item-offset, item-number)` tuples across one or more
/// revisions, in whatever order the writer calls [ProtoL2p::new_revision]
/// and [ProtoL2p::record].
#[derive(Default)]
pub struct ProtoL2p {
    records: Vec<L2pRecord>,
}

impl ProtoL2p {
    pub fn new() -> ProtoL2p {
        ProtoL2p { records: vec![] }
    }

    pub fn new_revision(&mut self, revision: Revision) {
        self.records.push(L2pRecord::NewRevision(revision));
    }

    pub fn record(&mut self, item_number: ItemNumber, offset: u64) {
        self.records.push(L2pRecord::Entry { item_number, offset });
    }

    /// Serialize the accumulated tuples for crash-safe appending.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![];
        for record in self.records.iter() {
            match record {
                L2pRecord::NewRevision(rev) => {
                    buf.push(0);
                    vlq::encode_u64(*rev, &mut buf);
                }
                L2pRecord::Entry { item_number, offset } => {
                    buf.push(1);
                    vlq::encode_u64(*item_number, &mut buf);
                    vlq::encode_u64(*offset, &mut buf);
                }
            }
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<ProtoL2p> {
        let mut pos = 0;
        let mut records = vec![];
        while pos < buf.len() {
            let tag = buf[pos];
            pos += 1;
            match tag {
                0 => {
                    let (rev, n) = vlq::decode_u64(&buf[pos..])?;
                    pos += n;
                    records.push(L2pRecord::NewRevision(rev));
                }
                1 => {
                    let (item_number, n) = vlq::decode_u64(&buf[pos..])?;
                    pos += n;
                    let (offset, n) = vlq::decode_u64(&buf[pos..])?;
                    pos += n;
                    records.push(L2pRecord::Entry { item_number, offset });
                }
                _ => return err_at!(MalformedIndex, msg: "proto-l2p: unknown record tag {}", tag),
            }
        }
        Ok(ProtoL2p { records })
    }

    /// Finalize into a paged [L2pIndex], sorting each revision's tuples
    /// by item-number (spec.md §4.5 "finalization sorts them by
    /// item-number").
    pub fn finalize(&self, entries_per_page: u64) -> Result<L2pIndex> {
        let mut revisions: Vec<(Revision, Vec<(ItemNumber, u64)>)> = vec![];
        for record in self.records.iter() {
            match record {
                L2pRecord::NewRevision(rev) => revisions.push((*rev, vec![])),
                L2pRecord::Entry { item_number, offset } => {
                    let current = revisions
                        .last_mut()
                        .ok_or_else(|| crate::Error::MalformedIndex("proto-l2p: entry before first new-revision marker".into()))?;
                    current.1.push((*item_number, *offset));
                }
            }
        }
        let first_revision = revisions
            .first()
            .map(|(r, _)| *r)
            .ok_or_else(|| crate::Error::MalformedIndex("proto-l2p: empty".into()))?;

        let mut index = L2pIndex::new(first_revision, entries_per_page);
        for (_, mut tuples) in revisions {
            tuples.sort_by_key(|(item_number, _)| *item_number);
            let max_item = tuples.iter().map(|(n, _)| *n).max().unwrap_or(0);
            let mut offsets = vec![0u64; max_item as usize + 1];
            for (item_number, offset) in tuples {
                offsets[item_number as usize] = offset;
            }
            index.push_revision(offsets);
        }
        Ok(index)
    }
}

/// Accumulates full P2L entries in file-offset order as items are
/// written to the proto-rev file.
#[derive(Default)]
pub struct ProtoP2l {
    base_revision: Option<Revision>,
    block_size: u64,
    entries: Vec<P2lEntry>,
}

impl ProtoP2l {
    pub fn new(block_size: u64) -> ProtoP2l {
        ProtoP2l {
            base_revision: None,
            block_size,
            entries: vec![],
        }
    }

    pub fn record(&mut self, entry: P2lEntry) {
        if self.base_revision.is_none() {
            self.base_revision = Some(entry.revision);
        }
        self.entries.push(entry);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![];
        vlq::encode_u64(self.entries.len() as u64, &mut buf);
        for entry in self.entries.iter() {
            vlq::encode_u64(entry.offset, &mut buf);
            vlq::encode_u64(entry.size, &mut buf);
            buf.push(entry.item_type.to_u8());
            vlq::encode_u64(entry.revision, &mut buf);
            vlq::encode_u64(entry.item_number, &mut buf);
            buf.extend_from_slice(&entry.fnv1a.to_be_bytes());
        }
        buf
    }

    pub fn decode(buf: &[u8], block_size: u64) -> Result<ProtoP2l> {
        let mut pos = 0;
        let (count, n) = vlq::decode_u64(&buf[pos..])?;
        pos += n;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (offset, n) = vlq::decode_u64(&buf[pos..])?;
            pos += n;
            let (size, n) = vlq::decode_u64(&buf[pos..])?;
            pos += n;
            let item_type = ItemKind::from_u8(buf[pos])?;
            pos += 1;
            let (revision, n) = vlq::decode_u64(&buf[pos..])?;
            pos += n;
            let (item_number, n) = vlq::decode_u64(&buf[pos..])?;
            pos += n;
            let fnv_bytes: [u8; 4] = buf[pos..pos + 4].try_into().unwrap();
            pos += 4;
            entries.push(P2lEntry {
                offset,
                size,
                item_type,
                revision,
                item_number,
                fnv1a: u32::from_be_bytes(fnv_bytes),
            });
        }
        let base_revision = entries.first().map(|e| e.revision);
        Ok(ProtoP2l {
            base_revision,
            block_size,
            entries,
        })
    }

    /// Finalize into a blocked [P2lIndex] in file-offset order (already
    /// guaranteed by append order).
    pub fn finalize(&self) -> Result<P2lIndex> {
        let base_revision = self
            .base_revision
            .ok_or_else(|| crate::Error::MalformedIndex("proto-p2l: empty".into()))?;
        let mut index = P2lIndex::new(base_revision, self.block_size);
        for entry in self.entries.iter() {
            index.push(entry.clone());
        }
        Ok(index)
    }
}

#[cfg(test)]
#[path = "proto_test.rs"]
mod proto_test;
