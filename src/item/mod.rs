//! Item codec: serializes and parses the seven item kinds a revision file
//! holds, and the descriptors ([ItemRef], [ItemKind]) the indexes key on.
//!
//! Grounded on `db::Entry`/`dbs::Entry`'s key/value record shape and its
//! `read_file!`/`write_file!` macros (`util/mod.rs`); the wire format
//! itself (line-oriented `key: value` records, blank-line terminated) is
//! dictated by spec.md §4.1.

mod changed_paths;
mod dirent;
mod noderev;
mod props;
mod representation;

pub use changed_paths::{ChangeKind, ChangedPath, ChangedPaths};
pub use dirent::{DirEntries, DirEntry};
pub use noderev::{NodeKind, NodeRevision};
pub use props::PropertyList;
pub use representation::{reconstruct, DeltaWindow, Representation, RepresentationKind};

use crate::{layout::Revision, Result};

/// Dense item-number within a single revision. 0 is reserved "unused",
/// 1 is the changed-paths record, 2 is the root node-revision (spec.md §3).
pub type ItemNumber = u64;

pub const CHANGED_PATHS_ITEM: ItemNumber = 1;
pub const ROOT_NODE_ITEM: ItemNumber = 2;

/// (revision, item-number) pair, the logical address of any item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemRef {
    pub revision: Revision,
    pub item_number: ItemNumber,
}

impl ItemRef {
    pub fn new(revision: Revision, item_number: ItemNumber) -> ItemRef {
        ItemRef {
            revision,
            item_number,
        }
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.revision, self.item_number)
    }
}

/// Kind tag stored in each P2L entry (spec.md §3 "P2L entry").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Unused,
    FileRep,
    DirRep,
    FileProps,
    DirProps,
    NodeRev,
    ChangedPaths,
    GenericRep,
}

impl ItemKind {
    pub fn to_u8(self) -> u8 {
        match self {
            ItemKind::Unused => 0,
            ItemKind::FileRep => 1,
            ItemKind::DirRep => 2,
            ItemKind::FileProps => 3,
            ItemKind::DirProps => 4,
            ItemKind::NodeRev => 5,
            ItemKind::ChangedPaths => 6,
            ItemKind::GenericRep => 7,
        }
    }

    pub fn from_u8(val: u8) -> Result<ItemKind> {
        Ok(match val {
            0 => ItemKind::Unused,
            1 => ItemKind::FileRep,
            2 => ItemKind::DirRep,
            3 => ItemKind::FileProps,
            4 => ItemKind::DirProps,
            5 => ItemKind::NodeRev,
            6 => ItemKind::ChangedPaths,
            7 => ItemKind::GenericRep,
            _ => err_at!(MalformedIndex, msg: "unknown item kind {}", val)?,
        })
    }
}

/// Trait implemented by every item kind: write it to a proto-rev file and
/// read it back given its exact byte span.
///
/// Contract (spec.md §4.1): writing appends bytes and returns how many
/// were written, which the caller uses to build the paired P2L entry;
/// reading deserializes exactly the bytes described by that entry.
pub trait ItemCodec: Sized {
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()>;

    fn read_from(buf: &[u8]) -> Result<Self>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
