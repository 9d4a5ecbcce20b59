//! P2L index: blocked byte-offset -> item-descriptor lookup (spec.md §4.4).
//!
//! ```text
//! block:  (base-offset, entry-count, [(size, type, revision-delta,
//!          item-number, fnv1a)]), all variable-length encoded
//! ```
//!
//! `revision-delta` is zig-zag encoded relative to the index's
//! `base_revision`, keeping the common case (most items belong to
//! revisions close to the shard's first revision) small even though a
//! packed shard's item offsets are not revision-monotonic.

use std::convert::TryInto;

use crate::{
    item::{ItemKind, ItemNumber},
    layout::Revision,
    util::{fnv, vlq},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct P2lEntry {
    pub offset: u64,
    pub size: u64,
    pub item_type: ItemKind,
    pub revision: Revision,
    pub item_number: ItemNumber,
    pub fnv1a: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct P2lIndex {
    pub base_revision: Revision,
    pub block_size: u64,
    blocks: Vec<Vec<P2lEntry>>,
}

impl P2lIndex {
    pub fn new(base_revision: Revision, block_size: u64) -> P2lIndex {
        P2lIndex {
            base_revision,
            block_size,
            blocks: vec![],
        }
    }

    /// Append an entry, placing it in the block containing its starting
    /// offset. Entries must be appended in increasing offset order.
    pub fn push(&mut self, entry: P2lEntry) {
        let block_size = self.block_size.max(1);
        let block_idx = (entry.offset / block_size) as usize;
        if self.blocks.len() <= block_idx {
            self.blocks.resize_with(block_idx + 1, Vec::new);
        }
        self.blocks[block_idx].push(entry);
    }

    pub fn entries_in_block(&self, block_idx: usize) -> &[P2lEntry] {
        self.blocks.get(block_idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Find the entry whose starting offset is exactly `offset`.
    pub fn entry_at(&self, offset: u64) -> Result<&P2lEntry> {
        let block_size = self.block_size.max(1);
        let block_idx = (offset / block_size) as usize;
        self.entries_in_block(block_idx)
            .iter()
            .find(|e| e.offset == offset)
            .ok_or_else(|| crate::Error::NoSuchItem(format!("p2l: no entry at offset {}", offset)))
    }

    /// All entries whose `[offset, offset+size)` overlaps
    /// `[offset, offset+len)`, scanning only the block containing the
    /// query offset (used by the verifier to cross-check L2P against
    /// P2L one block at a time).
    pub fn entries_overlapping(&self, offset: u64, len: u64) -> Vec<&P2lEntry> {
        let block_size = self.block_size.max(1);
        let block_idx = (offset / block_size) as usize;
        self.entries_in_block(block_idx)
            .iter()
            .filter(|e| e.offset < offset + len && offset < e.offset + e.size)
            .collect()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(format!("{} {}\n", self.base_revision, self.block_size).as_bytes());
        vlq::encode_u64(self.blocks.len() as u64, &mut buf);
        for block in self.blocks.iter() {
            encode_block(self.base_revision, block, &mut buf);
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<P2lIndex> {
        let line_end = buf
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| crate::Error::MalformedIndex("p2l: missing header line".into()))?;
        let header = std::str::from_utf8(&buf[..line_end]).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        let mut fields = header.split(' ');
        let base_revision = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u64>(), "p2l: base-revision")?;
        let block_size = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u64>(), "p2l: block-size")?;

        let mut pos = line_end + 1;
        let (block_count, n) = vlq::decode_u64(&buf[pos..])?;
        pos += n;
        let mut blocks = Vec::with_capacity(block_count as usize);
        for _ in 0..block_count {
            let (block, n) = decode_block(base_revision, &buf[pos..])?;
            pos += n;
            blocks.push(block);
        }

        Ok(P2lIndex {
            base_revision,
            block_size,
            blocks,
        })
    }
}

fn encode_block(base_revision: Revision, block: &[P2lEntry], buf: &mut Vec<u8>) {
    let base_offset = block.first().map(|e| e.offset).unwrap_or(0);
    vlq::encode_u64(base_offset, buf);
    vlq::encode_u64(block.len() as u64, buf);
    for entry in block.iter() {
        vlq::encode_u64(entry.size, buf);
        buf.push(entry.item_type.to_u8());
        let delta = entry.revision as i64 - base_revision as i64;
        vlq::encode_i64(delta, buf);
        vlq::encode_u64(entry.item_number, buf);
        buf.extend_from_slice(&entry.fnv1a.to_be_bytes());
    }
}

fn decode_block(base_revision: Revision, buf: &[u8]) -> Result<(Vec<P2lEntry>, usize)> {
    let mut pos = 0;
    let (base_offset, n) = vlq::decode_u64(&buf[pos..])?;
    pos += n;
    let (count, n) = vlq::decode_u64(&buf[pos..])?;
    pos += n;

    let mut entries = Vec::with_capacity(count as usize);
    let mut offset = base_offset;
    for _ in 0..count {
        let (size, n) = vlq::decode_u64(&buf[pos..])?;
        pos += n;
        let item_type = ItemKind::from_u8(
            *buf.get(pos)
                .ok_or_else(|| crate::Error::MalformedIndex("p2l: truncated entry type".into()))?,
        )?;
        pos += 1;
        let (delta, n) = vlq::decode_i64(&buf[pos..])?;
        pos += n;
        let revision = (base_revision as i64 + delta) as u64;
        let (item_number, n) = vlq::decode_u64(&buf[pos..])?;
        pos += n;
        let fnv_bytes: [u8; 4] = buf
            .get(pos..pos + 4)
            .ok_or_else(|| crate::Error::MalformedIndex("p2l: truncated checksum".into()))?
            .try_into()
            .unwrap();
        pos += 4;
        let fnv1a = u32::from_be_bytes(fnv_bytes);

        entries.push(P2lEntry {
            offset,
            size,
            item_type,
            revision,
            item_number,
            fnv1a,
        });
        offset += size;
    }
    Ok((entries, pos))
}

/// Verify an entry's stored checksum against freshly read bytes
/// (spec.md §4.10 invariant 3); unused regions carry checksum 0 and must
/// be all-zero bytes (invariant 4).
pub fn verify_entry(entry: &P2lEntry, bytes: &[u8]) -> Result<()> {
    if entry.item_type == ItemKind::Unused {
        if entry.fnv1a != 0 || bytes.iter().any(|&b| b != 0) {
            return err_at!(
                CorruptRevFile,
                msg: "p2l: unused region at {} is not zero-filled or checksum non-zero",
                entry.offset
            );
        }
        return Ok(());
    }
    let got = fnv::fnv1a32(bytes);
    if got != entry.fnv1a {
        return err_at!(
            CorruptRevFile,
            msg: "p2l: checksum mismatch at offset {}: got {:08x} want {:08x}",
            entry.offset,
            got,
            entry.fnv1a
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "p2l_test.rs"]
mod p2l_test;
