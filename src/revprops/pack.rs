//! A single packed revprops file: `db/revprops/<S>.pack/<first-rev>.<seq>`
//! (spec.md §4.6). Header of `(first-revision, count, per-entry sizes)`
//! followed by concatenated serialized property lists, optionally
//! `zstd`-compressed as one block.

use crate::{item::PropertyList, layout::Revision, util::vlq, Result};

const COMPRESSION_NONE: u8 = 0;
const COMPRESSION_ZSTD: u8 = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct PackFile {
    pub first_revision: Revision,
    pub entries: Vec<PropertyList>,
}

impl PackFile {
    pub fn new(first_revision: Revision, entries: Vec<PropertyList>) -> PackFile {
        PackFile {
            first_revision,
            entries,
        }
    }

    pub fn count(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn encode(&self, compress: bool) -> Result<Vec<u8>> {
        let mut payload = vec![];
        let mut sizes = vec![];
        for entry in self.entries.iter() {
            let before = payload.len();
            entry.encode(&mut payload);
            sizes.push((payload.len() - before) as u64);
        }

        let (flag, payload) = if compress {
            let compressed = err_at!(IOError, zstd::encode_all(payload.as_slice(), 0))?;
            (COMPRESSION_ZSTD, compressed)
        } else {
            (COMPRESSION_NONE, payload)
        };

        let mut buf = vec![];
        buf.extend_from_slice(format!("{} {} {}\n", self.first_revision, self.entries.len(), flag).as_bytes());
        vlq::encode_u64(sizes.len() as u64, &mut buf);
        for size in sizes.iter() {
            vlq::encode_u64(*size, &mut buf);
        }
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<PackFile> {
        let line_end = buf
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| crate::Error::MalformedIndex("revprops pack: missing header line".into()))?;
        let header = std::str::from_utf8(&buf[..line_end]).map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        let mut fields = header.split(' ');
        let first_revision = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u64>(), "revprops pack: first-revision")?;
        let count = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u64>(), "revprops pack: count")?;
        let flag = err_at!(MalformedIndex, fields.next().unwrap_or("").parse::<u8>(), "revprops pack: compression flag")?;

        let mut pos = line_end + 1;
        let (size_count, n) = vlq::decode_u64(&buf[pos..])?;
        pos += n;
        if size_count != count {
            return err_at!(MalformedIndex, msg: "revprops pack: size table length {} != count {}", size_count, count);
        }
        let mut sizes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (size, n) = vlq::decode_u64(&buf[pos..])?;
            pos += n;
            sizes.push(size as usize);
        }

        let payload = match flag {
            COMPRESSION_NONE => buf[pos..].to_vec(),
            COMPRESSION_ZSTD => err_at!(IOError, zstd::decode_all(&buf[pos..]))?,
            _ => return err_at!(MalformedIndex, msg: "revprops pack: unknown compression flag {}", flag),
        };

        let mut entries = Vec::with_capacity(count as usize);
        let mut payload_pos = 0;
        for size in sizes {
            let slice = payload
                .get(payload_pos..payload_pos + size)
                .ok_or_else(|| crate::Error::MalformedIndex("revprops pack: truncated entry".into()))?;
            entries.push(PropertyList::decode(slice)?);
            payload_pos += size;
        }

        Ok(PackFile {
            first_revision,
            entries,
        })
    }
}

#[cfg(test)]
#[path = "pack_test.rs"]
mod pack_test;
