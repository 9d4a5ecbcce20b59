//! Pack Engine: coalesces a shard's unpacked revisions into one pack file,
//! re-ordering items for locality and rewriting the L2P/P2L indexes
//! (spec.md §4.7).
//!
//! Item identity, `(revision, item-number)`, never changes across a pack —
//! only the byte offset each item lives at. This engine never rewrites
//! item bytes; it only decides an emission order, copies bytes verbatim,
//! and records their new offsets.

mod order;

use std::fs;

use crate::{
    item::{ItemKind, ItemNumber, ItemRef},
    l2p::L2pIndex,
    layout::{Layout, Revision, Shard},
    p2l::{P2lEntry, P2lIndex},
    revfile::{self, Footer},
    util::{files, fnv},
    Result,
};

/// One item as read from an unpacked revision file, ready to be re-emitted
/// into a pack (spec.md §4.7 step 1 "Plan").
#[derive(Clone, Debug)]
pub struct PlannedItem {
    pub item_number: ItemNumber,
    pub item_type: ItemKind,
    pub bytes: Vec<u8>,
}

/// All items of one unpacked revision, as enumerated from its existing
/// P2L index (spec.md §4.7 step 1).
#[derive(Clone, Debug)]
pub struct RevisionItems {
    pub revision: Revision,
    pub items: Vec<PlannedItem>,
}

/// The pack file's body plus the fresh indexes describing it, ready to be
/// appended with a footer and installed (spec.md §4.7 steps 4-5).
pub struct PackedShard {
    pub body: Vec<u8>,
    pub l2p: L2pIndex,
    pub p2l: P2lIndex,
}

/// Reads an unpacked revision file's items back off disk via its own P2L
/// index (spec.md §4.7 step 1 "Plan"), so a shard can be handed to
/// [Packer::pack] without the caller re-deriving item boundaries itself.
pub fn read_revision_items(layout: &Layout, revision: Revision) -> Result<RevisionItems> {
    let path = layout.unpacked_rev(revision);
    let mut file = fs::File::open(&crate::layout::to_os_string(&path))?;
    let file_len = file.metadata()?.len();
    let reader = revfile::Reader::open(&mut file, file_len, crate::layout::FORMAT_LOGICAL_ADDRESSING)?;

    let p2l = match reader {
        revfile::Reader::Logical { p2l, .. } => p2l,
        revfile::Reader::Physical(_) => {
            return err_at!(InvalidInput, msg: "read_revision_items: revision {} predates logical addressing", revision)
        }
    };

    let mut items = vec![];
    for block_idx in 0..p2l.block_count() {
        for entry in p2l.entries_in_block(block_idx) {
            if entry.item_type == ItemKind::Unused {
                continue;
            }
            let bytes = revfile::read_item_bytes(&mut file, entry.offset, entry.size)?;
            items.push(PlannedItem {
                item_number: entry.item_number,
                item_type: entry.item_type,
                bytes,
            });
        }
    }
    items.sort_by_key(|item| item.item_number);

    Ok(RevisionItems { revision, items })
}

/// Minimum gap, as a fraction of `block_size`, worth padding rather than
/// letting an item straddle a block boundary (spec.md §4.4 "Boundary
/// policy").
fn padding_threshold(block_size: u64) -> u64 {
    (block_size / 50).max(512)
}

pub struct Packer {
    pub block_size: u64,
    pub page_size: u64,
    pub entries_per_page: u64,
}

impl Packer {
    pub fn new(block_size: u64, page_size: u64, entries_per_page: u64) -> Packer {
        Packer {
            block_size,
            page_size,
            entries_per_page,
        }
    }

    /// Run steps 2-5 of the pack engine: classify, order, emit, and build
    /// the fresh indexes. `shard` must be sorted ascending by revision and
    /// must not be empty.
    pub fn pack(&self, shard: &[RevisionItems]) -> Result<PackedShard> {
        if shard.is_empty() {
            return err_at!(InvalidInput, msg: "pack: empty shard");
        }
        let first_revision = shard.first().unwrap().revision;

        let map = order::ItemMap::build(shard);
        let classified = order::classify(shard);

        let mut emission_order = vec![];
        emission_order.extend(order::order_flat(classified.changes));
        emission_order.extend(order::order_flat(classified.file_props));
        emission_order.extend(order::order_flat(classified.dir_props));
        emission_order.extend(order::order_reps_and_noderevs(
            shard,
            &map,
            &classified.reps_and_noderevs,
        ));

        let mut body = vec![];
        let mut p2l = P2lIndex::new(first_revision, self.block_size);
        let mut new_offsets: std::collections::HashMap<ItemRef, u64> = std::collections::HashMap::new();

        for item_ref in emission_order.iter() {
            let item = map
                .get(*item_ref)
                .ok_or_else(|| crate::Error::Fatal(format!("pack: ordering produced unknown item {}", item_ref)))?;

            self.pad_to_boundary(&mut body, item.bytes.len() as u64, &mut p2l, first_revision);

            let offset = body.len() as u64;
            body.extend_from_slice(&item.bytes);
            new_offsets.insert(*item_ref, offset);

            p2l.push(P2lEntry {
                offset,
                size: item.bytes.len() as u64,
                item_type: item.item_type,
                revision: item_ref.revision,
                item_number: item_ref.item_number,
                fnv1a: fnv::fnv1a32(&item.bytes),
            });
        }

        // Build L2P ascending (revision, item-number), as spec.md §4.7
        // step 5 describes, independent of emission order.
        let mut l2p = L2pIndex::new(first_revision, self.entries_per_page);
        for rev in shard.iter() {
            let max_item = rev.items.iter().map(|i| i.item_number).max().unwrap_or(0);
            let mut offsets = vec![0u64; max_item as usize + 1];
            for item in rev.items.iter() {
                let item_ref = ItemRef::new(rev.revision, item.item_number);
                if let Some(offset) = new_offsets.get(&item_ref) {
                    offsets[item.item_number as usize] = *offset;
                }
            }
            l2p.push_revision(offsets);
        }

        Ok(PackedShard { body, l2p, p2l })
    }

    /// Step 5 ("Install", spec.md §4.7): assemble `body + L2P + P2L +
    /// footer`, the same trailing layout an unpacked revision file uses
    /// (spec.md §4.2), and install it atomically. A process that dies mid
    /// pack leaves only a temp file behind; [files::write_atomic] never
    /// lets a partial file reach the final path, so the next pack
    /// invocation simply finds no pack file and starts over.
    pub fn install(&self, layout: &Layout, shard: Shard, packed: &PackedShard) -> Result<()> {
        let mut buf = packed.body.clone();
        let l2p_offset = buf.len() as u64;
        buf.extend_from_slice(&packed.l2p.encode(self.page_size));
        let p2l_offset = buf.len() as u64;
        buf.extend_from_slice(&packed.p2l.encode());
        buf.extend_from_slice(&Footer::new(l2p_offset, p2l_offset).encode());

        let path = layout.pack_file(shard);
        files::write_atomic(&crate::layout::to_os_string(&path), &buf)
    }

    /// Boundary policy (spec.md §4.4): pad to the next block boundary when
    /// the wasted space is small; otherwise let the item straddle blocks.
    fn pad_to_boundary(&self, body: &mut Vec<u8>, item_len: u64, p2l: &mut P2lIndex, revision: Revision) {
        let block_size = self.block_size.max(1);
        let cur = body.len() as u64;
        let block_end = (cur / block_size + 1) * block_size;
        let remaining = block_end - cur;
        if item_len <= remaining {
            return;
        }
        if remaining < padding_threshold(block_size) {
            body.extend(std::iter::repeat(0u8).take(remaining as usize));
            p2l.push(P2lEntry {
                offset: cur,
                size: remaining,
                item_type: ItemKind::Unused,
                revision,
                item_number: 0,
                fnv1a: 0,
            });
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
