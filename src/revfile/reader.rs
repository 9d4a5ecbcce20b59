//! Item lookup within a revision file, dispatching on addressing mode
//! (spec.md §4.2 "Dual addressing mode").

use std::{
    convert::TryInto,
    fs,
    io::{Read, Seek, SeekFrom},
};

use crate::{l2p::L2pIndex, layout::FORMAT_LOGICAL_ADDRESSING, p2l::P2lIndex, Result};

use super::Footer;

/// Trailer of a physical-addressing (pre-logical-addressing) revision
/// file: just the two offsets a legacy reader needs, no indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalTrailer {
    pub changed_paths_offset: u64,
    pub root_noderev_offset: u64,
}

/// Opens a single revision file and locates items within it, using
/// whichever addressing mode the repository's format number implies.
pub enum Reader {
    Logical {
        l2p: L2pIndex,
        p2l: P2lIndex,
    },
    Physical(PhysicalTrailer),
}

impl Reader {
    /// Parse the trailer of an already-open revision file. `format`
    /// selects addressing mode; `file_len` is the file's total size.
    pub fn open(file: &mut fs::File, file_len: u64, format: u32) -> Result<Reader> {
        if format >= FORMAT_LOGICAL_ADDRESSING {
            let (footer, footer_offset_in_file) = Footer::locate_and_decode(file, file_len)?;

            let l2p_len = footer.p2l_offset - footer.l2p_offset;
            let p2l_len = footer_offset_in_file - footer.p2l_offset;

            let mut l2p_buf = vec![0u8; l2p_len as usize];
            file.seek(SeekFrom::Start(footer.l2p_offset))?;
            file.read_exact(&mut l2p_buf)?;
            let l2p = L2pIndex::decode(&l2p_buf)?;

            let mut p2l_buf = vec![0u8; p2l_len as usize];
            file.seek(SeekFrom::Start(footer.p2l_offset))?;
            file.read_exact(&mut p2l_buf)?;
            let p2l = P2lIndex::decode(&p2l_buf)?;

            Ok(Reader::Logical { l2p, p2l })
        } else {
            let tail_len = 64.min(file_len);
            let mut tail = vec![0u8; tail_len as usize];
            file.seek(SeekFrom::End(-(tail_len as i64)))?;
            file.read_exact(&mut tail)?;
            let text = std::str::from_utf8(&tail).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
            let mut lines = text.trim_end_matches('\n').rsplit('\n');
            let root_line = lines
                .next()
                .ok_or_else(|| crate::Error::MalformedIndex("revision file: missing physical trailer".into()))?;
            let changed_line = lines
                .next()
                .ok_or_else(|| crate::Error::MalformedIndex("revision file: missing physical trailer".into()))?;
            let root_noderev_offset = err_at!(
                MalformedIndex,
                root_line.trim().parse::<u64>(),
                "revision file: root-noderev offset"
            )?;
            let changed_paths_offset = err_at!(
                MalformedIndex,
                changed_line.trim().parse::<u64>(),
                "revision file: changed-paths offset"
            )?;
            Ok(Reader::Physical(PhysicalTrailer {
                changed_paths_offset,
                root_noderev_offset,
            }))
        }
    }

    /// Resolve the byte offset and size of an item, logical mode only;
    /// physical mode callers use the trailer offsets directly since
    /// there is no item-number indirection.
    pub fn locate(&self, revision: u64, item_number: u64) -> Result<(u64, u64)> {
        match self {
            Reader::Logical { l2p, p2l } => {
                let offset = l2p.lookup(revision, item_number)?;
                let entry = p2l.entry_at(offset)?;
                if entry.revision != revision || entry.item_number != item_number {
                    return err_at!(
                        CorruptRevFile,
                        msg: "revision file: l2p/p2l mismatch at offset {} for ({}, {})",
                        offset,
                        revision,
                        item_number
                    );
                }
                Ok((entry.offset, entry.size))
            }
            Reader::Physical(_) => err_at!(
                InvalidInput,
                msg: "revision file: physical addressing has no item-number index"
            ),
        }
    }
}

pub fn read_item_bytes(file: &mut fs::File, offset: u64, size: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; size.try_into().unwrap_or(usize::MAX)];
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod reader_test;
