//! Unpacked revprops: one file per revision, `db/revprops/<shard>/<rev>`,
//! holding a serialized [PropertyList] (spec.md §4.6).

use crate::{
    item::PropertyList,
    layout::{Layout, Revision},
    util::files,
    Result,
};

pub fn read(layout: &Layout, revision: Revision) -> Result<PropertyList> {
    let path = layout.unpacked_revprops(revision);
    let buf = files::read_file(&crate::layout::to_os_string(&path))?;
    PropertyList::decode(&buf)
}

pub fn write(layout: &Layout, revision: Revision, props: &PropertyList) -> Result<()> {
    let path = layout.unpacked_revprops(revision);
    let mut buf = vec![];
    props.encode(&mut buf);
    files::write_atomic(&crate::layout::to_os_string(&path), &buf)
}

#[cfg(test)]
#[path = "unpacked_test.rs"]
mod unpacked_test;
