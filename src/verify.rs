//! Verifier: offline consistency check between L2P and P2L, optionally
//! re-checking item checksums (spec.md §4.10, §8 invariants 1-4).
//!
//! Findings accumulate rather than aborting on first mismatch (spec.md §7
//! "The verifier accumulates findings rather than aborting on first
//! mismatch"). Grounded on [crate::p2l::verify_entry] for the checksum
//! check and on `robt`'s scan-and-collect style (the `purger`/`purge_file`
//! loop logs and keeps going rather than bailing).

use crate::{
    item::{ItemKind, ItemNumber},
    l2p::L2pIndex,
    layout::Revision,
    p2l::{self, P2lEntry, P2lIndex},
    Result,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Finding {
    /// §8 invariant 1: `P2L(L2P(R, I).offset)` did not describe `(R, I)`.
    L2pTargetMismatch {
        revision: Revision,
        item_number: ItemNumber,
        offset: u64,
        detail: String,
    },
    /// §8 invariant 2: a non-unused P2L entry's `(revision, item_number)`
    /// does not map back to its own offset in the L2P.
    P2lBackreferenceMismatch {
        revision: Revision,
        item_number: ItemNumber,
        p2l_offset: u64,
        detail: String,
    },
    /// §8 invariant 3/4: checksum mismatch, or a non-zero unused region.
    ChecksumMismatch {
        revision: Revision,
        item_number: ItemNumber,
        offset: u64,
        detail: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub findings: Vec<Finding>,
    pub items_checked: u64,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn merge(&mut self, other: Report) {
        self.findings.extend(other.findings);
        self.items_checked += other.items_checked;
    }
}

/// Checks 1 and 2 of spec.md §4.10: cross-reference every L2P entry
/// against its P2L entry and vice versa. `cancel` is polled between items
/// and between blocks, matching spec.md §5's cancellation contract.
pub fn verify_cross_reference(l2p: &L2pIndex, p2l: &P2lIndex, cancel: &dyn Fn() -> bool) -> Report {
    let mut report = Report::default();

    'revs: for revision in l2p.first_revision..l2p.first_revision + l2p.revision_count() {
        let mut item_number = 1u64;
        loop {
            if cancel() {
                break 'revs;
            }
            let offset = match l2p.lookup(revision, item_number) {
                Ok(offset) => offset,
                Err(_) => break,
            };
            report.items_checked += 1;
            match p2l.entry_at(offset) {
                Ok(entry) if entry.revision == revision && entry.item_number == item_number => {}
                Ok(entry) => report.findings.push(Finding::L2pTargetMismatch {
                    revision,
                    item_number,
                    offset,
                    detail: format!("p2l entry at offset {} is ({}, {})", offset, entry.revision, entry.item_number),
                }),
                Err(err) => report.findings.push(Finding::L2pTargetMismatch {
                    revision,
                    item_number,
                    offset,
                    detail: err.to_string(),
                }),
            }
            item_number += 1;
        }
    }

    'blocks: for block_idx in 0..p2l.block_count() {
        if cancel() {
            break 'blocks;
        }
        for entry in p2l.entries_in_block(block_idx) {
            if entry.item_type == crate::item::ItemKind::Unused {
                continue;
            }
            match l2p.lookup(entry.revision, entry.item_number) {
                Ok(offset) if offset == entry.offset => {}
                Ok(offset) => report.findings.push(Finding::P2lBackreferenceMismatch {
                    revision: entry.revision,
                    item_number: entry.item_number,
                    p2l_offset: entry.offset,
                    detail: format!("l2p maps ({}, {}) to offset {}", entry.revision, entry.item_number, offset),
                }),
                Err(err) => report.findings.push(Finding::P2lBackreferenceMismatch {
                    revision: entry.revision,
                    item_number: entry.item_number,
                    p2l_offset: entry.offset,
                    detail: err.to_string(),
                }),
            }
        }
    }

    report
}

/// Check 3 of spec.md §4.10: re-read every P2L-described item's bytes and
/// confirm the checksum (or, for unused regions, confirm all-zero).
/// `read_bytes` fetches the raw bytes at `(offset, size)` within whichever
/// revision file backs `p2l`.
pub fn verify_checksums(
    p2l: &P2lIndex,
    read_bytes: &mut dyn FnMut(u64, u64) -> Result<Vec<u8>>,
    cancel: &dyn Fn() -> bool,
) -> Result<Report> {
    let mut report = Report::default();

    for block_idx in 0..p2l.block_count() {
        if cancel() {
            break;
        }
        for entry in p2l.entries_in_block(block_idx) {
            let bytes = read_bytes(entry.offset, entry.size)?;
            report.items_checked += 1;
            if let Err(err) = p2l::verify_entry(entry, &bytes) {
                report.findings.push(Finding::ChecksumMismatch {
                    revision: entry.revision,
                    item_number: entry.item_number,
                    offset: entry.offset,
                    detail: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

fn type_str(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Unused => "unused",
        ItemKind::FileRep => "file-rep",
        ItemKind::DirRep => "dir-rep",
        ItemKind::FileProps => "file-props",
        ItemKind::DirProps => "dir-props",
        ItemKind::NodeRev => "node-rev",
        ItemKind::ChangedPaths => "changed-paths",
        ItemKind::GenericRep => "generic-rep",
    }
}

fn parse_type(s: &str) -> Result<ItemKind> {
    Ok(match s {
        "unused" => ItemKind::Unused,
        "file-rep" => ItemKind::FileRep,
        "dir-rep" => ItemKind::DirRep,
        "file-props" => ItemKind::FileProps,
        "dir-props" => ItemKind::DirProps,
        "node-rev" => ItemKind::NodeRev,
        "changed-paths" => ItemKind::ChangedPaths,
        "generic-rep" => ItemKind::GenericRep,
        _ => err_at!(MalformedIndex, msg: "index dump: unknown item type {:?}", s)?,
    })
}

/// Render a revision file's L2P/P2L indexes as the human-editable text
/// dump spec.md §7/§8 Scenario E describes: a header line capturing the
/// block/page sizing needed to re-derive identical indexes, followed by
/// one line per P2L entry (including unused regions, which carry no L2P
/// entry of their own) in the form
/// `<offset-hex> <size-hex> <type-str> <revision-dec> <item-dec> <fnv1a-hex>`.
pub fn dump_index(l2p: &L2pIndex, p2l: &P2lIndex, page_size: u64) -> String {
    let mut out = format!(
        "# base_revision={} block_size={} page_size={} entries_per_page={}\n",
        p2l.base_revision, p2l.block_size, page_size, l2p.entries_per_page
    );
    for block_idx in 0..p2l.block_count() {
        for entry in p2l.entries_in_block(block_idx) {
            out.push_str(&format!(
                "{:x} {:x} {} {} {} {:08x}\n",
                entry.offset,
                entry.size,
                type_str(entry.item_type),
                entry.revision,
                entry.item_number,
                entry.fnv1a
            ));
        }
    }
    out
}

/// Fresh indexes reconstructed from a [dump_index] text dump, plus the
/// page size needed to re-encode the L2P index identically.
pub struct LoadedIndex {
    pub l2p: L2pIndex,
    pub p2l: P2lIndex,
    pub page_size: u64,
}

struct DumpHeader {
    base_revision: Revision,
    block_size: u64,
    page_size: u64,
    entries_per_page: u64,
}

fn parse_header(line: &str) -> Result<DumpHeader> {
    let line = line
        .strip_prefix("# ")
        .ok_or_else(|| crate::Error::MalformedIndex("index dump: missing header line".into()))?;
    let mut fields = std::collections::HashMap::new();
    for field in line.split(' ') {
        let (key, val) = field
            .split_once('=')
            .ok_or_else(|| crate::Error::MalformedIndex(format!("index dump: malformed header field {:?}", field)))?;
        fields.insert(key, val);
    }
    let get = |key: &str| -> Result<u64> {
        let val = fields
            .get(key)
            .ok_or_else(|| crate::Error::MalformedIndex(format!("index dump: missing header field {:?}", key)))?;
        err_at!(MalformedIndex, val.parse::<u64>(), "index dump: header field {:?}", key)
    };
    Ok(DumpHeader {
        base_revision: get("base_revision")?,
        block_size: get("block_size")?,
        page_size: get("page_size")?,
        entries_per_page: get("entries_per_page")?,
    })
}

/// Parse a [dump_index] text dump back into fresh L2P/P2L indexes
/// (spec.md §8 Scenario E step 2 "load-index reads the dump and emits new
/// L2P + P2L indexes plus a fresh footer").
pub fn load_index(text: &str) -> Result<LoadedIndex> {
    let mut lines = text.lines();
    let header = parse_header(
        lines
            .next()
            .ok_or_else(|| crate::Error::MalformedIndex("index dump: empty".into()))?,
    )?;

    let mut p2l = P2lIndex::new(header.base_revision, header.block_size);
    let mut per_revision: std::collections::BTreeMap<Revision, Vec<(ItemNumber, u64)>> = std::collections::BTreeMap::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.split(' ');
        let offset = err_at!(
            MalformedIndex,
            u64::from_str_radix(parts.next().unwrap_or(""), 16),
            "index dump: offset"
        )?;
        let size = err_at!(
            MalformedIndex,
            u64::from_str_radix(parts.next().unwrap_or(""), 16),
            "index dump: size"
        )?;
        let item_type = parse_type(parts.next().unwrap_or(""))?;
        let revision = err_at!(MalformedIndex, parts.next().unwrap_or("").parse::<u64>(), "index dump: revision")?;
        let item_number = err_at!(MalformedIndex, parts.next().unwrap_or("").parse::<u64>(), "index dump: item")?;
        let fnv1a = err_at!(
            MalformedIndex,
            u32::from_str_radix(parts.next().unwrap_or(""), 16),
            "index dump: fnv1a"
        )?;

        p2l.push(P2lEntry {
            offset,
            size,
            item_type,
            revision,
            item_number,
            fnv1a,
        });
        if item_type != ItemKind::Unused {
            per_revision.entry(revision).or_default().push((item_number, offset));
        }
    }

    let first_revision = *per_revision
        .keys()
        .next()
        .ok_or_else(|| crate::Error::MalformedIndex("index dump: no addressable entries".into()))?;
    let last_revision = *per_revision.keys().next_back().unwrap();

    let mut l2p = L2pIndex::new(first_revision, header.entries_per_page);
    for revision in first_revision..=last_revision {
        let tuples = per_revision.get(&revision).cloned().unwrap_or_default();
        let max_item = tuples.iter().map(|(n, _)| *n).max().unwrap_or(0);
        let mut offsets = vec![0u64; max_item as usize + 1];
        for (item_number, offset) in tuples {
            offsets[item_number as usize] = offset;
        }
        l2p.push_revision(offsets);
    }

    Ok(LoadedIndex {
        l2p,
        p2l,
        page_size: header.page_size,
    })
}

#[cfg(test)]
#[path = "verify_test.rs"]
mod verify_test;
