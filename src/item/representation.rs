//! Representation header and the window-based delta codec (spec.md §4.1,
//! §4 "Delta compression"): the bytes-of-a-file or directory-entries-list
//! unit, either `plain` or a `delta` against another representation.
//!
//! Delta bodies use `svndiff`-style framing: a stream of windows, each a
//! triple (source-view-offset, source-view-length, ops), where an op
//! either copies from the source view, copies from the materialized
//! target so far, or inserts new literal bytes. Reconstruction follows
//! the delta-base chain back to a plain representation; the chain length
//! is capped to bound reconstruction cost.

use crate::{
    item::{ItemCodec, ItemRef},
    util::vlq,
    Result,
};

/// Upper bound on delta-base chain length a reader will follow before
/// giving up (spec.md §4: "typically ≤ 1024").
pub const MAX_DELTA_CHAIN_LENGTH: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepresentationKind {
    Plain,
    Delta,
}

impl RepresentationKind {
    fn as_str(self) -> &'static str {
        match self {
            RepresentationKind::Plain => "plain",
            RepresentationKind::Delta => "delta",
        }
    }

    fn parse(s: &str) -> Result<RepresentationKind> {
        Ok(match s {
            "plain" => RepresentationKind::Plain,
            "delta" => RepresentationKind::Delta,
            _ => err_at!(CorruptRevFile, msg: "representation: unknown kind {:?}", s)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaOp {
    /// Copy `len` bytes from the source view starting at `offset`.
    CopyFromSource { offset: u64, len: u64 },
    /// Copy `len` bytes from the target materialized so far, starting at
    /// `offset`. Allows runs and repeated patterns to reference output
    /// already produced by earlier ops in this or a prior window.
    CopyFromTarget { offset: u64, len: u64 },
    /// Insert literal bytes not present in either view.
    NewData(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeltaWindow {
    pub source_view_offset: u64,
    pub source_view_length: u64,
    pub ops: Vec<DeltaOp>,
}

impl DeltaWindow {
    fn encode(&self, buf: &mut Vec<u8>) {
        vlq::encode_u64(self.source_view_offset, buf);
        vlq::encode_u64(self.source_view_length, buf);
        vlq::encode_u64(self.ops.len() as u64, buf);
        for op in self.ops.iter() {
            match op {
                DeltaOp::CopyFromSource { offset, len } => {
                    buf.push(0);
                    vlq::encode_u64(*offset, buf);
                    vlq::encode_u64(*len, buf);
                }
                DeltaOp::CopyFromTarget { offset, len } => {
                    buf.push(1);
                    vlq::encode_u64(*offset, buf);
                    vlq::encode_u64(*len, buf);
                }
                DeltaOp::NewData(data) => {
                    buf.push(2);
                    vlq::encode_u64(data.len() as u64, buf);
                    buf.extend_from_slice(data);
                }
            }
        }
    }

    fn decode(buf: &[u8], pos: &mut usize) -> Result<DeltaWindow> {
        let (source_view_offset, n) = vlq::decode_u64(&buf[*pos..])?;
        *pos += n;
        let (source_view_length, n) = vlq::decode_u64(&buf[*pos..])?;
        *pos += n;
        let (op_count, n) = vlq::decode_u64(&buf[*pos..])?;
        *pos += n;
        let mut ops = Vec::with_capacity(op_count as usize);
        for _ in 0..op_count {
            let tag = *buf
                .get(*pos)
                .ok_or_else(|| crate::Error::CorruptRevFile("delta window: truncated op tag".into()))?;
            *pos += 1;
            let op = match tag {
                0 => {
                    let (offset, n) = vlq::decode_u64(&buf[*pos..])?;
                    *pos += n;
                    let (len, n) = vlq::decode_u64(&buf[*pos..])?;
                    *pos += n;
                    DeltaOp::CopyFromSource { offset, len }
                }
                1 => {
                    let (offset, n) = vlq::decode_u64(&buf[*pos..])?;
                    *pos += n;
                    let (len, n) = vlq::decode_u64(&buf[*pos..])?;
                    *pos += n;
                    DeltaOp::CopyFromTarget { offset, len }
                }
                2 => {
                    let (len, n) = vlq::decode_u64(&buf[*pos..])?;
                    *pos += n;
                    let len = len as usize;
                    let end = *pos + len;
                    let data = buf
                        .get(*pos..end)
                        .ok_or_else(|| crate::Error::CorruptRevFile("delta window: truncated new-data".into()))?
                        .to_vec();
                    *pos = end;
                    DeltaOp::NewData(data)
                }
                _ => err_at!(CorruptRevFile, msg: "delta window: unknown op tag {}", tag)?,
            };
            ops.push(op);
        }
        Ok(DeltaWindow {
            source_view_offset,
            source_view_length,
            ops,
        })
    }

    /// Materialize this window's output, appending to `out`. `out` already
    /// holds every byte produced by earlier windows; `CopyFromTarget` ops
    /// may reference that prefix or bytes this same window has already
    /// appended, so it doubles as the "target so far" view.
    pub fn apply(&self, source: &[u8], out: &mut Vec<u8>) -> Result<()> {
        for op in self.ops.iter() {
            match op {
                DeltaOp::CopyFromSource { offset, len } => {
                    let start = *offset as usize;
                    let end = start + *len as usize;
                    let slice = source
                        .get(start..end)
                        .ok_or_else(|| crate::Error::CorruptRevFile("delta op: source range out of bounds".into()))?;
                    out.extend_from_slice(slice);
                }
                DeltaOp::CopyFromTarget { offset, len } => {
                    let mut cursor = *offset as usize;
                    let mut remaining = *len as usize;
                    while remaining > 0 {
                        let byte = *out
                            .get(cursor)
                            .ok_or_else(|| crate::Error::CorruptRevFile("delta op: target range out of bounds".into()))?;
                        out.push(byte);
                        cursor += 1;
                        remaining -= 1;
                    }
                }
                DeltaOp::NewData(data) => out.extend_from_slice(data),
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Representation {
    pub kind: RepresentationKind,
    /// Delta base pointer; `Some` iff `kind == Delta` (spec.md §4.1).
    pub base: Option<ItemRef>,
    pub uncompressed_size: u64,
    pub expanded_size: u64,
    pub hash: String,
    /// Raw bytes for `Plain`, empty for `Delta`.
    pub data: Vec<u8>,
    /// Delta windows for `Delta`, empty for `Plain`.
    pub windows: Vec<DeltaWindow>,
}

impl Representation {
    pub fn plain(data: Vec<u8>, hash: String) -> Representation {
        let size = data.len() as u64;
        Representation {
            kind: RepresentationKind::Plain,
            base: None,
            uncompressed_size: size,
            expanded_size: size,
            hash,
            data,
            windows: vec![],
        }
    }

    pub fn delta(
        base: ItemRef,
        windows: Vec<DeltaWindow>,
        uncompressed_size: u64,
        expanded_size: u64,
        hash: String,
    ) -> Representation {
        Representation {
            kind: RepresentationKind::Delta,
            base: Some(base),
            uncompressed_size,
            expanded_size,
            hash,
            data: vec![],
            windows,
        }
    }
}

impl ItemCodec for Representation {
    fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self.kind {
            RepresentationKind::Plain => {
                buf.extend_from_slice(
                    format!(
                        "plain {} {} {}\n",
                        self.uncompressed_size, self.expanded_size, self.hash
                    )
                    .as_bytes(),
                );
                buf.extend_from_slice(&self.data);
            }
            RepresentationKind::Delta => {
                let base = self
                    .base
                    .ok_or_else(|| crate::Error::InvalidInput("delta representation missing base".into()))?;
                buf.extend_from_slice(
                    format!(
                        "delta {} {} {} {} {}\n",
                        self.uncompressed_size, self.expanded_size, self.hash, base.revision, base.item_number
                    )
                    .as_bytes(),
                );
                vlq::encode_u64(self.windows.len() as u64, buf);
                for window in self.windows.iter() {
                    window.encode(buf);
                }
            }
        }
        Ok(())
    }

    fn read_from(buf: &[u8]) -> Result<Representation> {
        let line_end = buf
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| crate::Error::CorruptRevFile("representation: missing header line".into()))?;
        let header = std::str::from_utf8(&buf[..line_end])
            .map_err(|e| crate::Error::FailConvert(e.to_string()))?;
        let mut fields = header.split(' ');
        let kind = RepresentationKind::parse(fields.next().unwrap_or(""))?;
        let uncompressed_size = err_at!(
            CorruptRevFile,
            fields.next().unwrap_or("").parse::<u64>(),
            "representation: uncompressed-size"
        )?;
        let expanded_size = err_at!(
            CorruptRevFile,
            fields.next().unwrap_or("").parse::<u64>(),
            "representation: expanded-size"
        )?;
        let hash = fields.next().unwrap_or("").to_string();

        let body = &buf[line_end + 1..];
        match kind {
            RepresentationKind::Plain => Ok(Representation {
                kind,
                base: None,
                uncompressed_size,
                expanded_size,
                hash,
                data: body.to_vec(),
                windows: vec![],
            }),
            RepresentationKind::Delta => {
                let base_rev = err_at!(
                    CorruptRevFile,
                    fields.next().unwrap_or("").parse::<u64>(),
                    "representation: base revision"
                )?;
                let base_item = err_at!(
                    CorruptRevFile,
                    fields.next().unwrap_or("").parse::<u64>(),
                    "representation: base item"
                )?;
                let mut pos = 0usize;
                let (count, n) = vlq::decode_u64(&body[pos..])?;
                pos += n;
                let mut windows = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    windows.push(DeltaWindow::decode(body, &mut pos)?);
                }
                Ok(Representation {
                    kind,
                    base: Some(ItemRef::new(base_rev, base_item)),
                    uncompressed_size,
                    expanded_size,
                    hash,
                    data: vec![],
                    windows,
                })
            }
        }
    }
}

/// Reconstruct the fully materialized bytes of a representation by
/// following its delta-base chain back to a plain representation.
/// `resolve` fetches the `Representation` stored at a given item ref.
/// Bounded by [MAX_DELTA_CHAIN_LENGTH]; a longer chain is reported as
/// corruption rather than followed indefinitely.
pub fn reconstruct(
    rep: &Representation,
    resolve: &mut dyn FnMut(ItemRef) -> Result<Representation>,
) -> Result<Vec<u8>> {
    let mut chain = vec![rep.clone()];
    while let RepresentationKind::Delta = chain.last().unwrap().kind {
        if chain.len() > MAX_DELTA_CHAIN_LENGTH {
            return err_at!(CorruptRevFile, msg: "delta chain exceeds {} links", MAX_DELTA_CHAIN_LENGTH);
        }
        let base_ref = chain.last().unwrap().base.unwrap();
        chain.push(resolve(base_ref)?);
    }

    let mut materialized = chain.pop().unwrap().data;
    while let Some(rep) = chain.pop() {
        let source = materialized;
        let mut target = Vec::with_capacity(rep.expanded_size as usize);
        for window in rep.windows.iter() {
            let start = window.source_view_offset as usize;
            let end = start + window.source_view_length as usize;
            let view = source.get(start..end).ok_or_else(|| {
                crate::Error::CorruptRevFile("delta window: source view out of bounds".into())
            })?;
            let view = view.to_vec();
            window.apply(&view, &mut target)?;
        }
        materialized = target;
    }
    Ok(materialized)
}

#[cfg(test)]
#[path = "representation_test.rs"]
mod representation_test;
