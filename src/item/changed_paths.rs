//! Changed-paths record: the list of paths touched by a revision, stored
//! as item-number 1 of that revision (spec.md §3 "Item reference").
//!
//! Text-based, line-oriented `key: value` records terminated by a blank
//! line, the same shape as [crate::item::NodeRevision].

use crate::{
    item::{ItemCodec, ItemRef},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Delete,
    Modify,
    Replace,
}

impl ChangeKind {
    fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Delete => "delete",
            ChangeKind::Modify => "modify",
            ChangeKind::Replace => "replace",
        }
    }

    fn parse(s: &str) -> Result<ChangeKind> {
        Ok(match s {
            "add" => ChangeKind::Add,
            "delete" => ChangeKind::Delete,
            "modify" => ChangeKind::Modify,
            "replace" => ChangeKind::Replace,
            _ => err_at!(CorruptRevFile, msg: "changed-paths: unknown change kind {:?}", s)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedPath {
    pub path: String,
    pub kind: ChangeKind,
    pub node: ItemRef,
    pub text_modified: bool,
    pub props_modified: bool,
    pub copyfrom: Option<(u64, String)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangedPaths(pub Vec<ChangedPath>);

impl ChangedPaths {
    pub fn new() -> ChangedPaths {
        ChangedPaths(vec![])
    }
}

impl ItemCodec for ChangedPaths {
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        for change in self.0.iter() {
            buf.extend_from_slice(format!("path: {}\n", change.path).as_bytes());
            buf.extend_from_slice(format!("kind: {}\n", change.kind.as_str()).as_bytes());
            buf.extend_from_slice(
                format!("node: {} {}\n", change.node.revision, change.node.item_number).as_bytes(),
            );
            buf.extend_from_slice(format!("text-mod: {}\n", change.text_modified).as_bytes());
            buf.extend_from_slice(format!("props-mod: {}\n", change.props_modified).as_bytes());
            if let Some((rev, path)) = &change.copyfrom {
                buf.extend_from_slice(format!("copyfrom: {} {}\n", rev, path).as_bytes());
            }
            buf.push(b'\n');
        }
        Ok(())
    }

    fn read_from(buf: &[u8]) -> Result<ChangedPaths> {
        let text = std::str::from_utf8(buf).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        let mut changes = vec![];
        let mut record: Vec<(&str, &str)> = vec![];

        for line in text.split('\n') {
            if line.is_empty() {
                if record.is_empty() {
                    continue;
                }
                changes.push(parse_record(&record)?);
                record.clear();
                continue;
            }
            let (key, val) = line
                .split_once(": ")
                .ok_or_else(|| crate::Error::CorruptRevFile(format!("changed-paths: malformed line {:?}", line)))?;
            record.push((key, val));
        }
        if !record.is_empty() {
            changes.push(parse_record(&record)?);
        }
        Ok(ChangedPaths(changes))
    }
}

fn field<'a>(record: &[(&'a str, &'a str)], key: &str) -> Result<&'a str> {
    record
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| crate::Error::CorruptRevFile(format!("changed-paths: missing field {:?}", key)))
}

fn parse_record(record: &[(&str, &str)]) -> Result<ChangedPath> {
    let path = field(record, "path")?.to_string();
    let kind = ChangeKind::parse(field(record, "kind")?)?;
    let (rev, item) = field(record, "node")?
        .split_once(' ')
        .ok_or_else(|| crate::Error::CorruptRevFile("changed-paths: malformed node field".into()))?;
    let node = ItemRef::new(
        err_at!(CorruptRevFile, rev.parse::<u64>(), "changed-paths: node revision")?,
        err_at!(CorruptRevFile, item.parse::<u64>(), "changed-paths: node item")?,
    );
    let text_modified = err_at!(
        CorruptRevFile,
        field(record, "text-mod")?.parse::<bool>(),
        "changed-paths: text-mod"
    )?;
    let props_modified = err_at!(
        CorruptRevFile,
        field(record, "props-mod")?.parse::<bool>(),
        "changed-paths: props-mod"
    )?;
    let copyfrom = match record.iter().find(|(k, _)| *k == "copyfrom") {
        Some((_, v)) => {
            let (rev, path) = v
                .split_once(' ')
                .ok_or_else(|| crate::Error::CorruptRevFile("changed-paths: malformed copyfrom field".into()))?;
            let rev = err_at!(CorruptRevFile, rev.parse::<u64>(), "changed-paths: copyfrom revision")?;
            Some((rev, path.to_string()))
        }
        None => None,
    };

    Ok(ChangedPath {
        path,
        kind,
        node,
        text_modified,
        props_modified,
        copyfrom,
    })
}

#[cfg(test)]
#[path = "changed_paths_test.rs"]
mod changed_paths_test;
