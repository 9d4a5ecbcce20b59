//! L2P index: paged (revision, item-number) -> byte-offset lookup
//! (spec.md §4.3).
//!
//! ```text
//! header: first-revision, revision-count, page-size, entries-per-page
//! directory: per revision, [page-start, page-count)
//! pages: up to entries-per-page VLQ-encoded offsets, relative to the
//!        page's base offset (zig-zag, since per-item offsets are not
//!        necessarily increasing once a shard has been packed)
//! ```

use crate::{layout::Revision, util::vlq, Result};

/// Offsets for one revision, indexed by item-number (0 is the reserved
/// "unused" slot and is never looked up).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevisionEntries(pub Vec<u64>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct L2pIndex {
    pub first_revision: Revision,
    pub entries_per_page: u64,
    revisions: Vec<RevisionEntries>,
}

impl L2pIndex {
    pub fn new(first_revision: Revision, entries_per_page: u64) -> L2pIndex {
        L2pIndex {
            first_revision,
            entries_per_page,
            revisions: vec![],
        }
    }

    /// Append the next revision's dense offset array (index = item-number).
    pub fn push_revision(&mut self, offsets: Vec<u64>) {
        self.revisions.push(RevisionEntries(offsets));
    }

    pub fn revision_count(&self) -> u64 {
        self.revisions.len() as u64
    }

    pub fn lookup(&self, revision: Revision, item_number: u64) -> Result<u64> {
        if revision < self.first_revision || revision >= self.first_revision + self.revision_count() {
            return err_at!(NoSuchRevision, msg: "l2p: revision {} out of range", revision);
        }
        let entries = &self.revisions[(revision - self.first_revision) as usize];
        match entries.0.get(item_number as usize) {
            Some(offset) => Ok(*offset),
            None => err_at!(NoSuchItem, msg: "l2p: no item {} in revision {}", item_number, revision),
        }
    }

    pub fn encode(&self, page_size: u64) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(
            format!(
                "{} {} {} {}\n",
                self.first_revision,
                self.revision_count(),
                page_size,
                self.entries_per_page
            )
            .as_bytes(),
        );

        // directory: (page_start, page_count) per revision.
        let mut page_start = 0u64;
        let mut directory = vec![];
        for rev in self.revisions.iter() {
            let page_count = pages_for(rev.0.len() as u64, self.entries_per_page);
            directory.push((page_start, page_count));
            page_start += page_count;
        }
        vlq::encode_u64(directory.len() as u64, &mut buf);
        for (start, count) in directory.iter() {
            vlq::encode_u64(*start, &mut buf);
            vlq::encode_u64(*count, &mut buf);
        }

        for rev in self.revisions.iter() {
            for page in rev.0.chunks(self.entries_per_page.max(1) as usize) {
                encode_page(page, &mut buf);
            }
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<L2pIndex> {
        let line_end = buf
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| crate::Error::MalformedIndex("l2p: missing header line".into()))?;
        let header = std::str::from_utf8(&buf[..line_end]).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        let mut fields = header.split(' ');
        let first_revision = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u64>(), "l2p: first-revision")?;
        let revision_count = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u64>(), "l2p: revision-count")?;
        let _page_size = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u64>(), "l2p: page-size")?;
        let entries_per_page = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u64>(), "l2p: entries-per-page")?;

        let mut pos = line_end + 1;
        let (dir_len, n) = vlq::decode_u64(&buf[pos..])?;
        pos += n;
        let mut directory = Vec::with_capacity(dir_len as usize);
        for _ in 0..dir_len {
            let (start, n) = vlq::decode_u64(&buf[pos..])?;
            pos += n;
            let (count, n) = vlq::decode_u64(&buf[pos..])?;
            pos += n;
            directory.push((start, count));
        }
        if directory.len() as u64 != revision_count {
            return err_at!(MalformedIndex, msg: "l2p: directory length {} != revision-count {}", directory.len(), revision_count);
        }

        let mut pages = vec![];
        while pos < buf.len() {
            let (page, n) = decode_page(&buf[pos..])?;
            pos += n;
            pages.push(page);
        }

        let mut revisions = Vec::with_capacity(directory.len());
        for (start, count) in directory.iter() {
            let mut offsets = vec![];
            for page in pages
                .get(*start as usize..(*start + *count) as usize)
                .ok_or_else(|| crate::Error::MalformedIndex("l2p: directory page range out of bounds".into()))?
            {
                offsets.extend_from_slice(page);
            }
            revisions.push(RevisionEntries(offsets));
        }

        Ok(L2pIndex {
            first_revision,
            entries_per_page,
            revisions,
        })
    }
}

fn pages_for(entry_count: u64, entries_per_page: u64) -> u64 {
    if entry_count == 0 {
        return 0;
    }
    let entries_per_page = entries_per_page.max(1);
    (entry_count + entries_per_page - 1) / entries_per_page
}

fn encode_page(page: &[u64], buf: &mut Vec<u8>) {
    vlq::encode_u64(page.len() as u64, buf);
    if page.is_empty() {
        return;
    }
    let base = page[0];
    vlq::encode_u64(base, buf);
    for &offset in &page[1..] {
        let delta = offset as i64 - base as i64;
        vlq::encode_i64(delta, buf);
    }
}

fn decode_page(buf: &[u8]) -> Result<(Vec<u64>, usize)> {
    let mut pos = 0;
    let (count, n) = vlq::decode_u64(&buf[pos..])?;
    pos += n;
    if count == 0 {
        return Ok((vec![], pos));
    }
    let (base, n) = vlq::decode_u64(&buf[pos..])?;
    pos += n;
    let mut offsets = Vec::with_capacity(count as usize);
    offsets.push(base);
    for _ in 1..count {
        let (delta, n) = vlq::decode_i64(&buf[pos..])?;
        pos += n;
        offsets.push((base as i64 + delta) as u64);
    }
    Ok((offsets, pos))
}

#[cfg(test)]
#[path = "l2p_test.rs"]
mod l2p_test;
