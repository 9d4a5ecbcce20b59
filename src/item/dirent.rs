//! Directory entries: the children of a directory node, serialized as a
//! sorted sequence of `name -> kind\0nodeid` tuples using the same
//! length-prefixed property-list framing as revprops and node-properties
//! (spec.md §4.1).
//!
//! Reuses [crate::item::PropertyList] as the wire codec: the entry name is
//! the property key, and `kind\0revision\0item-number` is the value. This
//! keeps a single binary-safe K/V framing across the item codec instead of
//! a bespoke one just for directories.

use crate::{
    item::{ItemCodec, ItemRef, NodeKind, PropertyList},
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: NodeKind,
    pub node: ItemRef,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirEntries(pub Vec<DirEntry>);

impl DirEntries {
    pub fn new() -> DirEntries {
        DirEntries(vec![])
    }

    /// Sort entries by byte-wise name order (spec.md §4.1), the tie-break
    /// the pack engine's directory walk relies on for deterministic
    /// traversal.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    }
}

fn kind_tag(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::File => "file",
        NodeKind::Dir => "dir",
    }
}

impl ItemCodec for DirEntries {
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mut sorted = self.clone();
        sorted.sort();

        let mut props = PropertyList::new();
        for entry in sorted.0.iter() {
            let value = format!(
                "{}\0{}\0{}",
                kind_tag(entry.kind),
                entry.node.revision,
                entry.node.item_number
            );
            props.set(entry.name.clone(), value.into_bytes());
        }
        props.encode(buf);
        Ok(())
    }

    fn read_from(buf: &[u8]) -> Result<DirEntries> {
        let props = PropertyList::decode(buf)?;
        let mut entries = Vec::with_capacity(props.len());
        for (name, value) in props.0.into_iter() {
            let value = std::str::from_utf8(&value).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
            let mut parts = value.splitn(3, '\0');
            let kind = NodeKind::parse(parts.next().unwrap_or(""))?;
            let revision = err_at!(
                CorruptRevFile,
                parts.next().unwrap_or("").parse::<u64>(),
                "dirent: {:?} revision", name
            )?;
            let item_number = err_at!(
                CorruptRevFile,
                parts.next().unwrap_or("").parse::<u64>(),
                "dirent: {:?} item", name
            )?;
            entries.push(DirEntry {
                name,
                kind,
                node: ItemRef::new(revision, item_number),
            });
        }
        let mut entries = DirEntries(entries);
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
#[path = "dirent_test.rs"]
mod dirent_test;
