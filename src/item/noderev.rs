//! Node-revision record: the versioned identity of a single path at a
//! single point in history (spec.md §4 "Node-revision").
//!
//! Same `key: value`, blank-line-terminated line format as
//! [crate::item::ChangedPaths].

use crate::{
    item::{ItemCodec, ItemRef},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Dir,
}

impl NodeKind {
    fn as_str(self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Dir => "dir",
        }
    }

    pub fn parse(s: &str) -> Result<NodeKind> {
        Ok(match s {
            "file" => NodeKind::File,
            "dir" => NodeKind::Dir,
            _ => err_at!(CorruptRevFile, msg: "node-revision: unknown kind {:?}", s)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRevision {
    pub kind: NodeKind,
    /// Node-revision this one was derived from, if any.
    pub predecessor: Option<ItemRef>,
    /// Count of predecessors back to the node's creation.
    pub predecessor_count: u32,
    /// Pointer to this node's content representation; absent for an
    /// empty directory or a zero-length file that has never been
    /// written.
    pub data_rep: Option<ItemRef>,
    /// Pointer to this node's property-list representation.
    pub prop_rep: Option<ItemRef>,
    pub copyfrom: Option<(u64, String)>,
    pub created_revision: u64,
    pub created_path: String,
    pub md5: String,
    pub sha1: String,
}

impl ItemCodec for NodeRevision {
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(format!("kind: {}\n", self.kind.as_str()).as_bytes());
        if let Some(pred) = self.predecessor {
            buf.extend_from_slice(format!("predecessor: {} {}\n", pred.revision, pred.item_number).as_bytes());
        }
        buf.extend_from_slice(format!("predecessor-count: {}\n", self.predecessor_count).as_bytes());
        if let Some(rep) = self.data_rep {
            buf.extend_from_slice(format!("data-rep: {} {}\n", rep.revision, rep.item_number).as_bytes());
        }
        if let Some(rep) = self.prop_rep {
            buf.extend_from_slice(format!("prop-rep: {} {}\n", rep.revision, rep.item_number).as_bytes());
        }
        if let Some((rev, path)) = &self.copyfrom {
            buf.extend_from_slice(format!("copyfrom: {} {}\n", rev, path).as_bytes());
        }
        buf.extend_from_slice(format!("created-revision: {}\n", self.created_revision).as_bytes());
        buf.extend_from_slice(format!("created-path: {}\n", self.created_path).as_bytes());
        buf.extend_from_slice(format!("md5: {}\n", self.md5).as_bytes());
        buf.extend_from_slice(format!("sha1: {}\n", self.sha1).as_bytes());
        buf.push(b'\n');
        Ok(())
    }

    fn read_from(buf: &[u8]) -> Result<NodeRevision> {
        let text = std::str::from_utf8(buf).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        let mut record: Vec<(&str, &str)> = vec![];
        for line in text.split('\n') {
            if line.is_empty() {
                break;
            }
            let (key, val) = line
                .split_once(": ")
                .ok_or_else(|| crate::Error::CorruptRevFile(format!("node-revision: malformed line {:?}", line)))?;
            record.push((key, val));
        }

        let get = |key: &str| -> Option<&str> {
            record.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
        };
        let require = |key: &str| -> Result<&str> {
            get(key).ok_or_else(|| crate::Error::CorruptRevFile(format!("node-revision: missing field {:?}", key)))
        };
        let parse_item_ref = |val: &str, field: &str| -> Result<ItemRef> {
            let (rev, item) = val
                .split_once(' ')
                .ok_or_else(|| crate::Error::CorruptRevFile(format!("node-revision: malformed {} field", field)))?;
            Ok(ItemRef::new(
                err_at!(CorruptRevFile, rev.parse::<u64>(), "node-revision: {} revision", field)?,
                err_at!(CorruptRevFile, item.parse::<u64>(), "node-revision: {} item", field)?,
            ))
        };

        let kind = NodeKind::parse(require("kind")?)?;
        let predecessor = match get("predecessor") {
            Some(v) => Some(parse_item_ref(v, "predecessor")?),
            None => None,
        };
        let predecessor_count = err_at!(
            CorruptRevFile,
            require("predecessor-count")?.parse::<u32>(),
            "node-revision: predecessor-count"
        )?;
        let data_rep = match get("data-rep") {
            Some(v) => Some(parse_item_ref(v, "data-rep")?),
            None => None,
        };
        let prop_rep = match get("prop-rep") {
            Some(v) => Some(parse_item_ref(v, "prop-rep")?),
            None => None,
        };
        let copyfrom = match get("copyfrom") {
            Some(v) => {
                let (rev, path) = v
                    .split_once(' ')
                    .ok_or_else(|| crate::Error::CorruptRevFile("node-revision: malformed copyfrom field".into()))?;
                let rev = err_at!(CorruptRevFile, rev.parse::<u64>(), "node-revision: copyfrom revision")?;
                Some((rev, path.to_string()))
            }
            None => None,
        };
        let created_revision = err_at!(
            CorruptRevFile,
            require("created-revision")?.parse::<u64>(),
            "node-revision: created-revision"
        )?;
        let created_path = require("created-path")?.to_string();
        let md5 = require("md5")?.to_string();
        let sha1 = require("sha1")?.to_string();

        Ok(NodeRevision {
            kind,
            predecessor,
            predecessor_count,
            data_rep,
            prop_rep,
            copyfrom,
            created_revision,
            created_path,
            md5,
            sha1,
        })
    }
}

#[cfg(test)]
#[path = "noderev_test.rs"]
mod noderev_test;
